use tracing::debug;

/// Manages undo/redo history as a linear list of full-sheet snapshots.
///
/// Each snapshot is the plain-text serialization of the whole grid. A
/// cursor points at the snapshot that is currently materialized; undo and
/// redo move the cursor, and recording a new snapshot after an undo drops
/// everything past the cursor (branching creates a new timeline).
///
/// No two adjacent snapshots are ever equal.
#[derive(Debug, Default)]
pub struct HistoryManager {
    /// Recorded snapshots, oldest first.
    snapshots: Vec<String>,

    /// Index of the currently materialized snapshot.
    index: usize,

    /// Maximum number of snapshots to keep. None keeps everything.
    limit: Option<usize>,
}

impl HistoryManager {
    /// Creates a new empty history manager with no size limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history manager that keeps at most `limit` snapshots,
    /// discarding the oldest ones first.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit: limit.map(|l| l.max(1)),
            ..Self::default()
        }
    }

    /// Records the current sheet text.
    ///
    /// The first call seeds the history with an empty entry. If `text`
    /// matches the snapshot under the cursor nothing happens. Otherwise the
    /// cursor advances (unless it still sits on an empty entry, which is
    /// reused), later snapshots are dropped and `text` is stored.
    ///
    /// # Returns
    ///
    /// true if a snapshot was recorded
    pub fn mark(&mut self, text: String) -> bool {
        if self.snapshots.is_empty() {
            self.snapshots.push(String::new());
            self.index = 0;
        }
        if self.snapshots[self.index] == text {
            return false;
        }
        if !self.snapshots[self.index].is_empty() {
            self.index += 1;
        }
        self.snapshots.truncate(self.index);
        self.snapshots.push(text);

        if let Some(limit) = self.limit {
            while self.snapshots.len() > limit {
                self.snapshots.remove(0);
                self.index -= 1;
            }
        }
        debug!(index = self.index, len = self.snapshots.len(), "history marked");
        true
    }

    /// Moves the cursor back one snapshot.
    ///
    /// # Returns
    ///
    /// The snapshot to restore, or None if already at the oldest entry
    pub fn undo(&mut self) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        debug!(index = self.index, "undo");
        Some(&self.snapshots[self.index])
    }

    /// Moves the cursor forward one snapshot.
    ///
    /// # Returns
    ///
    /// The snapshot to restore, or None if already at the newest entry
    pub fn redo(&mut self) -> Option<&str> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        debug!(index = self.index, "redo");
        Some(&self.snapshots[self.index])
    }

    /// Clears all history.
    ///
    /// Called when a document is loaded, discarding the previous undo trail.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.index = 0;
    }

    /// Returns the snapshot under the cursor.
    pub fn current(&self) -> Option<&str> {
        self.snapshots.get(self.index).map(String::as_str)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Returns true if there are snapshots available to undo to.
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Returns true if there are snapshots available to redo to.
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }
}
