//! Loop scheduling for live event dispatch.
//!
//! The scheduler is a single-shot timer that re-arms itself each time it
//! fires. It does not own a thread: the host calls [`LoopScheduler::poll`]
//! from its main loop, so firing never interleaves with sheet edits.

use crate::sheet::Selection;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Whether a selection is being looped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing is scheduled.
    Idle,
    /// The loop selection is re-sent every loop period.
    Looping,
}

/// Timer state for looping a selection of events.
#[derive(Debug, Clone)]
pub struct LoopScheduler {
    /// Cells being looped; also the highlighted cells.
    loop_selection: Selection,

    /// When the armed timer fires next. None when disarmed.
    deadline: Option<Instant>,

    state: DispatchState,
}

impl LoopScheduler {
    pub fn new() -> Self {
        Self {
            loop_selection: Selection::new(),
            deadline: None,
            state: DispatchState::Idle,
        }
    }

    /// Computes the loop period for a loop length in beats at a tempo.
    ///
    /// Returns None if the result is not a finite, non-negative duration
    /// (zero or negative tempo, negative loop length).
    pub fn period(loop_length: f64, tempo: f64) -> Option<Duration> {
        Duration::try_from_secs_f64(loop_length * 60.0 / tempo).ok()
    }

    /// Starts looping `selection`, replacing any previous loop.
    ///
    /// The caller sends the selection once immediately; the first timer
    /// fires one period after `now`.
    pub fn start(&mut self, selection: Selection, now: Instant, period: Option<Duration>) {
        self.loop_selection = selection;
        self.state = DispatchState::Looping;
        self.arm(now, period);
    }

    /// Disarms the timer and forgets the loop selection.
    ///
    /// # Returns
    ///
    /// The selection that was being looped
    pub fn stop(&mut self) -> Selection {
        self.state = DispatchState::Idle;
        self.deadline = None;
        std::mem::take(&mut self.loop_selection)
    }

    /// Checks the timer.
    ///
    /// If the deadline has passed the timer is re-armed one period after
    /// `now`, using the period current at the time of firing.
    ///
    /// # Returns
    ///
    /// true if the loop selection should be sent now
    pub fn poll(&mut self, now: Instant, period: Option<Duration>) -> bool {
        match self.deadline {
            Some(deadline) if self.state == DispatchState::Looping && now >= deadline => {
                self.arm(now, period);
                true
            }
            _ => false,
        }
    }

    fn arm(&mut self, now: Instant, period: Option<Duration>) {
        match period {
            Some(period) => {
                debug!("loop timer armed for {} ms", period.as_millis());
                self.deadline = Some(now + period);
            }
            None => {
                warn!("invalid loop period, timer not armed");
                self.deadline = None;
            }
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_looping(&self) -> bool {
        self.state == DispatchState::Looping
    }

    /// Returns the cells being looped.
    pub fn loop_selection(&self) -> &Selection {
        &self.loop_selection
    }

    /// Returns when the timer fires next, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Default for LoopScheduler {
    fn default() -> Self {
        Self::new()
    }
}
