//! Live event dispatch.
//!
//! This module provides the outbound event sink the performance engine
//! consumes, the bookkeeping of instruments left sounding by dispatched
//! events, and the loop scheduler that re-sends a selection on a timer.

pub mod scheduler;

pub use scheduler::{DispatchState, LoopScheduler};

use crate::sheet::format_number;
use std::sync::mpsc::Sender;
use tracing::warn;

/// Receiver of dispatched score lines.
///
/// The sink is called once per dispatched row, on the thread that drives
/// the sheet. Implementations that hand events to a separately threaded
/// performance engine should do so by message passing.
pub trait EventSink: Send {
    fn send_event(&mut self, event: &str);
}

impl EventSink for Sender<String> {
    fn send_event(&mut self, event: &str) {
        if self.send(event.to_string()).is_err() {
            warn!("event receiver disconnected, dropping: {}", event);
        }
    }
}

/// Instruments started by dispatched `i` statements, in order of first use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveInstruments {
    numbers: Vec<f64>,
}

impl ActiveInstruments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an instrument number unless it is already present.
    ///
    /// # Returns
    ///
    /// true if the number was newly added
    pub fn record(&mut self, number: f64) -> bool {
        if self.numbers.contains(&number) {
            return false;
        }
        self.numbers.push(number);
        true
    }

    pub fn contains(&self, number: f64) -> bool {
        self.numbers.contains(&number)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn numbers(&self) -> &[f64] {
        &self.numbers
    }

    /// Removes and returns the oldest recorded instrument.
    pub fn take_first(&mut self) -> Option<f64> {
        if self.numbers.is_empty() {
            None
        } else {
            Some(self.numbers.remove(0))
        }
    }
}

/// Builds the score line that turns off every held note of an instrument.
///
/// A negative instrument number with zero start releases held instances.
pub fn note_off_line(instrument: f64) -> String {
    format!("i -{} 0 1", format_number(instrument))
}
