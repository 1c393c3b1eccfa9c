//! The event sheet.
//!
//! `EventSheet` ties the cell store, the line codec, the batch transforms,
//! the undo history and the loop scheduler together behind the operations a
//! user performs: editing cells, transforming a selection, copying and
//! pasting, undoing, and sending rows to the performance engine.
//!
//! The sheet is single-threaded. The host drives it from one loop: user
//! actions call the editing methods and [`EventSheet::poll_timer`] is called
//! regularly to fire the loop timer. Dispatched events leave through an
//! [`EventSink`], which may hand them to another thread.

use crate::config::SheetConfig;
use crate::dispatch::{note_off_line, ActiveInstruments, EventSink, LoopScheduler};
use crate::error::SheetError;
use crate::history::HistoryManager;
use crate::sheet::script::{parse_script_output, script_data_text};
use crate::sheet::transform::{self, ArithmeticOp, RandomMode};
use crate::sheet::{
    codec, get_plain_text, parse_line, parse_number, Cell, Extent, Grid, LineOptions, Selection,
    SheetDocument, DEFAULT_COLUMN_NAMES,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Text storage used by copy, cut and paste.
pub trait Clipboard: Send {
    fn set_text(&mut self, text: String);
    fn text(&self) -> String;
}

/// A clipboard private to one sheet.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    text: String,
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: String) {
        self.text = text;
    }

    fn text(&self) -> String {
        self.text.clone()
    }
}

/// Seconds elapsed since the last midnight (UTC), used as an RNG seed.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() % 86_400)
        .unwrap_or(0)
}

/// A spreadsheet of score events with undo history and live dispatch.
pub struct EventSheet {
    /// Sheet name shown on its tab.
    name: String,

    /// The cells.
    grid: Grid,

    /// Currently selected cells.
    selection: Selection,

    /// Undo/redo snapshots of the whole sheet.
    history: HistoryManager,

    /// Loop timer and loop selection.
    scheduler: LoopScheduler,

    /// Instruments started by dispatched events, turned off on stop.
    active_instruments: ActiveInstruments,

    /// Tempo in beats per minute.
    tempo: f64,

    /// Loop length in beats.
    loop_length: f64,

    /// Random source for randomize and shuffle.
    rng: StdRng,

    clipboard: Box<dyn Clipboard>,

    /// Receiver of dispatched score lines. Events are dropped if unset.
    event_sink: Option<Box<dyn EventSink>>,

    /// Called after every change to the sheet contents.
    on_modified: Option<Box<dyn FnMut() + Send>>,

    /// Number of upcoming cell-change notifications that must not mark
    /// history. Armed before each write while restoring a snapshot.
    suppressed_notifications: usize,
}

impl EventSheet {
    /// Creates a sheet with the default shape and settings.
    pub fn new() -> Self {
        Self::from_config(&SheetConfig::default())
    }

    /// Creates a sheet shaped and tuned by a configuration.
    pub fn from_config(config: &SheetConfig) -> Self {
        Self {
            name: config.name.clone(),
            grid: Grid::new(config.rows, config.columns),
            selection: Selection::new(),
            history: HistoryManager::with_limit(config.history_limit),
            scheduler: LoopScheduler::new(),
            active_instruments: ActiveInstruments::new(),
            tempo: config.tempo,
            loop_length: config.loop_length,
            rng: StdRng::seed_from_u64(clock_seed()),
            clipboard: Box::new(MemoryClipboard::default()),
            event_sink: None,
            on_modified: None,
            suppressed_notifications: 0,
        }
    }

    // ==================== Accessors and hooks ====================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn active_instruments(&self) -> &ActiveInstruments {
        &self.active_instruments
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    pub fn set_tempo(&mut self, tempo: f64) {
        self.tempo = tempo;
    }

    pub fn loop_length(&self) -> f64 {
        self.loop_length
    }

    pub fn set_loop_length(&mut self, loop_length: f64) {
        self.loop_length = loop_length;
    }

    /// Sets where dispatched events are delivered.
    pub fn set_event_sink(&mut self, sink: impl EventSink + 'static) {
        self.event_sink = Some(Box::new(sink));
    }

    /// Replaces the clipboard used by copy, cut and paste.
    pub fn set_clipboard(&mut self, clipboard: impl Clipboard + 'static) {
        self.clipboard = Box::new(clipboard);
    }

    /// Registers a callback invoked after every change to the contents.
    pub fn set_on_modified(&mut self, hook: impl FnMut() + Send + 'static) {
        self.on_modified = Some(Box::new(hook));
    }

    /// Reseeds the random source, for reproducible randomize and shuffle.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Reseeds the random source from the wall clock.
    pub fn reseed_from_clock(&mut self) {
        self.reseed(clock_seed());
    }

    // ==================== Selection ====================

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replaces the selection. Coordinates outside the grid are dropped.
    pub fn set_selection(&mut self, mut selection: Selection) {
        selection.retain_within(self.grid.row_count(), self.grid.column_count());
        self.selection = selection;
    }

    /// Selects the rectangle spanning two corners, inclusive.
    pub fn select_rect(&mut self, row_a: usize, column_a: usize, row_b: usize, column_b: usize) {
        self.set_selection(Selection::rect(row_a, column_a, row_b, column_b));
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Returns the cells highlighted as the active loop.
    pub fn highlighted(&self) -> &Selection {
        self.scheduler.loop_selection()
    }

    // ==================== Text conversion ====================

    /// Serializes one row.
    ///
    /// With [`LineOptions::store_number`] set, the instrument number of an
    /// `i` statement is added to the active instruments.
    pub fn get_line(&mut self, row: usize, options: &LineOptions) -> String {
        let line = codec::get_line(&self.grid, row, options);
        if let Some(instrument) = line.instrument {
            self.active_instruments.record(instrument);
        }
        line.text
    }

    /// Serializes the whole sheet without tempo scaling.
    pub fn get_plain_text(&self) -> String {
        get_plain_text(&self.grid)
    }

    /// Writes score text into the grid.
    ///
    /// Each line is trimmed and parsed; field `j` of line `i` lands at
    /// `(row_offset + i, column_offset + j)`. Positions inside the covered
    /// block that the data does not reach are cleared to empty cells. The
    /// grid grows to fit but never shrinks.
    ///
    /// # Arguments
    ///
    /// * `text` - Newline-separated score lines
    /// * `row_offset` - First destination row
    /// * `column_offset` - First destination column
    /// * `rows` - How many rows to cover
    /// * `columns` - How many columns to cover on each row
    /// * `mark_history` - Record one history snapshot afterwards
    pub fn set_from_text(
        &mut self,
        text: &str,
        row_offset: usize,
        column_offset: usize,
        rows: Extent,
        columns: Extent,
        mark_history: bool,
    ) {
        let lines: Vec<&str> = text.split('\n').collect();
        let row_count = rows.resolve(lines.len(), self.grid.row_count());
        self.grid.ensure_size(row_offset + row_count, 0);

        for i in 0..row_count {
            let line = lines.get(i).map_or("", |l| l.trim());
            let fields = parse_line(line);
            let column_count = columns.resolve(fields.len(), self.grid.column_count());
            self.grid.ensure_size(0, column_offset + column_count);

            let mut fields = fields.into_iter();
            for j in 0..column_count {
                let cell = fields.next().map(Cell::from).unwrap_or_default();
                self.suppressed_notifications += 1;
                self.grid
                    .set_cell(row_offset + i, column_offset + j, Some(cell));
                self.cell_changed();
            }
        }

        if self.grid.row_count() == 0 {
            self.grid.set_row_count(1);
        }
        if mark_history {
            self.mark_history();
        }
    }

    // ==================== Change notification and history ====================

    fn notify_modified(&mut self) {
        if let Some(hook) = self.on_modified.as_mut() {
            hook();
        }
    }

    /// Handles a change to a single cell.
    ///
    /// Marks history unless a suppressed notification is pending, in which
    /// case one pending suppression is consumed instead.
    fn cell_changed(&mut self) {
        self.notify_modified();
        if self.suppressed_notifications > 0 {
            self.suppressed_notifications -= 1;
        } else {
            self.mark_history();
        }
    }

    /// Records the current contents as a history snapshot if they changed.
    pub fn mark_history(&mut self) {
        let text = self.get_plain_text();
        self.history.mark(text);
    }

    /// Discards the undo trail.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Restores the previous snapshot.
    ///
    /// # Returns
    ///
    /// true if there was a snapshot to go back to
    pub fn undo(&mut self) -> bool {
        match self.history.undo().map(str::to_string) {
            Some(snapshot) => {
                self.restore(&snapshot);
                true
            }
            None => false,
        }
    }

    /// Restores the next snapshot after an undo.
    ///
    /// # Returns
    ///
    /// true if there was a snapshot to go forward to
    pub fn redo(&mut self) -> bool {
        match self.history.redo().map(str::to_string) {
            Some(snapshot) => {
                self.restore(&snapshot);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, snapshot: &str) {
        self.set_from_text(
            snapshot,
            0,
            0,
            Extent::AtLeastCurrent,
            Extent::AtLeastCurrent,
            false,
        );
        self.selection
            .retain_within(self.grid.row_count(), self.grid.column_count());
    }

    // ==================== Cell editing ====================

    /// Commits a manual edit of one cell.
    ///
    /// Non-empty text slides left over absent or empty cells, so a row never
    /// has gaps before its data. The edit is recorded in history.
    ///
    /// # Returns
    ///
    /// true if the position is inside the grid
    pub fn commit_cell_edit(&mut self, row: usize, column: usize, text: &str) -> bool {
        if !self.grid.set_text(row, column, text) {
            return false;
        }
        if !text.is_empty() {
            let mut column = column;
            while column > 0 && self.grid.text(row, column - 1).map_or(true, str::is_empty) {
                let cell = self.grid.take_cell(row, column);
                self.grid.set_cell(row, column - 1, cell);
                column -= 1;
            }
        }
        self.cell_changed();
        true
    }

    fn finish_edit(&mut self) {
        self.notify_modified();
        self.mark_history();
    }

    /// Builds clipboard text from the selected rows and columns.
    fn selection_text(&self) -> String {
        let rows = self.selection.rows();
        let columns = self.selection.columns();
        rows.iter()
            .map(|&row| {
                columns
                    .iter()
                    .filter_map(|&column| self.grid.cell(row, column))
                    .map(|cell| format!("{}{}", cell.text, cell.separator_or_default()))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Copies the selected rows and columns to the clipboard.
    ///
    /// # Returns
    ///
    /// The copied text
    pub fn copy(&mut self) -> String {
        let text = self.selection_text();
        self.clipboard.set_text(text.clone());
        text
    }

    /// Copies the selection to the clipboard, then removes the copied cells.
    pub fn cut(&mut self) -> String {
        let text = self.copy();
        let rows = self.selection.rows();
        let columns = self.selection.columns();
        for &row in &rows {
            for &column in &columns {
                self.grid.take_cell(row, column);
            }
        }
        self.finish_edit();
        text
    }

    /// Pastes the clipboard at the selection.
    pub fn paste(&mut self) {
        let text = self.clipboard.text();
        self.paste_text(&text);
    }

    /// Pastes score text at the top-left of the selection.
    ///
    /// A selection of at most one cell pastes everything in the text; a
    /// larger selection pastes exactly into its row and column count.
    pub fn paste_text(&mut self, text: &str) {
        let rows = self.selection.rows();
        let columns = self.selection.columns();
        let row = rows.iter().copied().min().unwrap_or(0);
        let column = columns.iter().copied().min().unwrap_or(0);
        let (row_extent, column_extent) = if rows.len() <= 1 && columns.len() <= 1 {
            (Extent::FromData, Extent::FromData)
        } else {
            (Extent::Exact(rows.len()), Extent::Exact(columns.len()))
        };
        debug!(row, column, "paste");
        self.set_from_text(text, row, column, row_extent, column_extent, true);
    }

    /// Removes every selected cell.
    pub fn del(&mut self) {
        for (row, column) in self.selection.iter() {
            self.grid.take_cell(row, column);
        }
        self.finish_edit();
    }

    // ==================== Structure ====================

    /// Appends an empty row.
    pub fn append_row(&mut self) {
        self.grid.append_row();
        self.finish_edit();
    }

    /// Appends an empty column named after its p-field.
    pub fn append_column(&mut self) {
        self.grid.append_column();
        self.finish_edit();
    }

    /// Removes the last column.
    pub fn delete_last_column(&mut self) {
        if self.grid.delete_last_column() {
            self.selection
                .retain_within(self.grid.row_count(), self.grid.column_count());
            self.finish_edit();
        }
    }

    /// Removes every row that has a selected cell.
    pub fn delete_rows(&mut self) {
        let mut rows = self.selection.rows();
        if rows.is_empty() {
            return;
        }
        rows.sort_unstable();
        for &row in rows.iter().rev() {
            self.grid.remove_row(row);
        }
        self.selection
            .retain_within(self.grid.row_count(), self.grid.column_count());
        self.finish_edit();
    }

    // ==================== Batch transforms ====================

    fn arithmetic(&mut self, op: ArithmeticOp, value: f64) {
        transform::arithmetic(&mut self.grid, &self.selection, op, value);
        self.finish_edit();
    }

    /// Adds `value` to every numeric selected cell.
    pub fn add(&mut self, value: f64) {
        self.arithmetic(ArithmeticOp::Add, value);
    }

    /// Subtracts `value` from every numeric selected cell.
    pub fn subtract(&mut self, value: f64) {
        self.arithmetic(ArithmeticOp::Subtract, value);
    }

    /// Multiplies every numeric selected cell by `value`.
    pub fn multiply(&mut self, value: f64) {
        self.arithmetic(ArithmeticOp::Multiply, value);
    }

    /// Divides every numeric selected cell by `value`.
    pub fn divide(&mut self, value: f64) {
        self.arithmetic(ArithmeticOp::Divide, value);
    }

    /// Fills the selection with random values between `min` and `max`.
    pub fn randomize(&mut self, min: f64, max: f64, mode: RandomMode) {
        transform::randomize(&mut self.grid, &self.selection, min, max, mode, &mut self.rng);
        self.finish_edit();
    }

    /// Swaps random pairs of selected values `iterations` times.
    /// Does nothing with fewer than three selected cells.
    pub fn shuffle(&mut self, iterations: usize) {
        if transform::shuffle(&mut self.grid, &self.selection, iterations, &mut self.rng) {
            self.finish_edit();
        }
    }

    /// Rotates the selected values by `amount` positions.
    pub fn rotate(&mut self, amount: i64) {
        transform::rotate(&mut self.grid, &self.selection, amount);
        self.finish_edit();
    }

    /// Reverses the selected values within each column.
    pub fn reverse(&mut self) {
        if transform::reverse(&mut self.grid, &self.selection) {
            self.finish_edit();
        }
    }

    /// Fills the selection with a ramp from `start` to `end`.
    ///
    /// A slope of 1 is linear. Other slopes curve exponentially; slopes at
    /// or below zero produce NaN values.
    pub fn fill(&mut self, start: f64, end: f64, slope: f64) {
        transform::fill(&mut self.grid, &self.selection, start, end, slope);
        self.finish_edit();
    }

    // ==================== Dispatch ====================

    fn emit(&mut self, event: String) {
        match self.event_sink.as_mut() {
            Some(sink) => sink.send_event(&event),
            None => debug!("no event sink, dropping: {}", event),
        }
    }

    /// Sends the given rows with tempo scaling and carry resolution.
    fn dispatch_rows(&mut self, rows: &[usize], start_offset: f64) {
        let options = LineOptions::dispatch(self.tempo).with_start_offset(start_offset);
        for &row in rows {
            let line = self.get_line(row, &options);
            self.emit(line);
        }
    }

    /// Sends one event per selected row.
    pub fn send_events(&mut self) {
        let rows = self.selection.rows();
        self.dispatch_rows(&rows, 0.0);
    }

    /// Sends one event per selected row, shifted so the earliest start time
    /// among them becomes zero.
    pub fn send_events_offset(&mut self) {
        let rows = self.selection.rows();
        let earliest = rows
            .iter()
            .filter_map(|&row| self.grid.text(row, 2).and_then(parse_number))
            .fold(None, |min: Option<f64>, n| Some(min.map_or(n, |m| m.min(n))));
        self.dispatch_rows(&rows, -earliest.unwrap_or(0.0));
    }

    /// Returns the loop period at the current tempo and loop length.
    pub fn loop_period(&self) -> Option<Duration> {
        LoopScheduler::period(self.loop_length, self.tempo)
    }

    /// Starts looping the current selection.
    pub fn loop_events(&mut self) {
        self.loop_events_at(Instant::now());
    }

    /// Starts looping the current selection as of `now`.
    ///
    /// The selection becomes the highlighted loop set and is sent once
    /// immediately; the timer then re-sends it every loop period.
    pub fn loop_events_at(&mut self, now: Instant) {
        let period = self.loop_period();
        self.scheduler.start(self.selection.clone(), now, period);
        let rows = self.scheduler.loop_selection().rows();
        self.dispatch_rows(&rows, 0.0);
    }

    /// Fires the loop timer if it is due.
    ///
    /// # Returns
    ///
    /// true if the loop selection was sent
    pub fn poll_timer(&mut self, now: Instant) -> bool {
        if !self.scheduler.poll(now, self.loop_period()) {
            return false;
        }
        let rows = self.scheduler.loop_selection().rows();
        self.dispatch_rows(&rows, 0.0);
        true
    }

    /// Returns when the loop timer fires next, if armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn is_looping(&self) -> bool {
        self.scheduler.is_looping()
    }

    /// Stops looping and turns off every instrument started by a sent event.
    ///
    /// Returns only after the timer is disarmed and every note-off has been
    /// handed to the sink.
    pub fn stop_all_events(&mut self) {
        self.scheduler.stop();
        while let Some(instrument) = self.active_instruments.take_first() {
            self.emit(note_off_line(instrument));
        }
    }

    // ==================== Scripts ====================

    /// Builds the data file for an external script from the selection.
    pub fn script_data_text(&self) -> Option<String> {
        script_data_text(&self.grid, &self.selection)
    }

    /// Pastes the output of an external script.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::ScriptOutput`] if the output has no valid
    /// position header; the sheet is left unchanged
    pub fn apply_script_output(&mut self, output: &str) -> Result<(), SheetError> {
        let patch = parse_script_output(output).inspect_err(|e| warn!("{}", e))?;
        self.set_from_text(
            &patch.text,
            patch.row,
            patch.column,
            patch.rows,
            patch.columns,
            true,
        );
        Ok(())
    }

    // ==================== Documents ====================

    /// Captures the sheet as a document.
    pub fn to_document(&self) -> SheetDocument {
        SheetDocument {
            name: self.name.clone(),
            tempo: self.tempo,
            loop_length: self.loop_length,
            column_names: self.grid.column_names().to_vec(),
            text: self.get_plain_text(),
        }
    }

    /// Replaces the sheet with a document's contents.
    ///
    /// Playback is stopped, the selection cleared and the undo trail
    /// restarted from the loaded contents.
    pub fn load_document(&mut self, document: SheetDocument) {
        self.name = document.name;
        self.tempo = document.tempo;
        self.loop_length = document.loop_length;
        let grid = if document.column_names.is_empty() {
            Grid::new(0, DEFAULT_COLUMN_NAMES.len())
        } else {
            Grid::with_column_names(0, document.column_names)
        };
        self.replace_contents(grid, &document.text);
    }

    /// Replaces the sheet with plain score text, keeping its settings.
    pub fn load_text(&mut self, text: &str) {
        self.replace_contents(Grid::new(0, DEFAULT_COLUMN_NAMES.len()), text);
    }

    fn replace_contents(&mut self, grid: Grid, text: &str) {
        self.stop_all_events();
        self.selection.clear();
        self.grid = grid;
        self.set_from_text(text, 0, 0, Extent::FromData, Extent::AtLeastCurrent, false);
        self.clear_history();
        self.mark_history();
        info!(
            rows = self.grid.row_count(),
            columns = self.grid.column_count(),
            "loaded sheet {}",
            self.name
        );
    }
}

impl Default for EventSheet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};

    fn sheet_with_sink() -> (EventSheet, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        let mut sheet = EventSheet::new();
        sheet.set_event_sink(tx);
        (sheet, rx)
    }

    fn sent(rx: &mpsc::Receiver<String>) -> Vec<String> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_history_undo_redo() {
        let mut sheet = EventSheet::new();
        sheet.commit_cell_edit(0, 0, "i");
        let after_first = sheet.get_plain_text();
        sheet.commit_cell_edit(0, 1, "1");
        let after_second = sheet.get_plain_text();
        sheet.commit_cell_edit(0, 2, "0");
        assert_eq!(sheet.history().len(), 3);

        assert!(sheet.undo());
        assert!(sheet.undo());
        assert_eq!(sheet.get_plain_text(), after_first);
        assert!(!sheet.undo());

        assert!(sheet.redo());
        assert_eq!(sheet.get_plain_text(), after_second);
        assert_eq!(sheet.history().len(), 3);
    }

    #[test]
    fn test_restore_does_not_leak_suppression() {
        let mut sheet = EventSheet::new();
        sheet.commit_cell_edit(0, 0, "a");
        sheet.commit_cell_edit(1, 0, "b");
        sheet.undo();
        assert_eq!(sheet.history().index(), 0);

        // The next real edit must be recorded and must drop the redo branch.
        sheet.commit_cell_edit(2, 0, "c");
        assert_eq!(sheet.history().len(), 2);
        assert_eq!(sheet.history().index(), 1);
        assert!(!sheet.redo());
    }

    #[test]
    fn test_set_from_text_extents() {
        let mut sheet = EventSheet::new();
        sheet.set_from_text("i 1 0 1 440 0.5 7", 12, 0, Extent::FromData, Extent::FromData, false);
        assert_eq!(sheet.grid().row_count(), 13);
        assert_eq!(sheet.grid().column_count(), 7);
        assert_eq!(sheet.grid().column_names()[6], "p6");
        assert_eq!(sheet.grid().text(12, 6), Some("7"));

        sheet.set_from_text("i 2", 12, 0, Extent::Exact(1), Extent::AtLeastCurrent, false);
        assert_eq!(sheet.grid().text(12, 1), Some("2"));
        assert_eq!(sheet.grid().text(12, 4), Some(""));
        assert_eq!(sheet.grid().text(12, 6), Some(""));
        assert!(sheet.history().is_empty());
    }

    #[test]
    fn test_set_from_text_with_mark_records_once() {
        let mut sheet = EventSheet::new();
        sheet.set_from_text("i 1 0 1\ni 2 0 1", 0, 0, Extent::FromData, Extent::FromData, true);
        assert_eq!(sheet.history().len(), 1);
        assert_eq!(sheet.history().current(), Some(sheet.get_plain_text().as_str()));
    }

    #[test]
    fn test_cell_edit_slides_left() {
        let mut sheet = EventSheet::new();
        assert!(sheet.commit_cell_edit(0, 3, "x"));
        assert_eq!(sheet.grid().text(0, 0), Some("x"));
        assert!(sheet.grid().cell(0, 3).is_none());
        assert!(!sheet.commit_cell_edit(99, 0, "x"));
    }

    #[test]
    fn test_edit_after_load_keeps_fields_apart() {
        let (mut sheet, rx) = sheet_with_sink();
        let options = LineOptions::default();

        sheet.load_text("i 1");
        sheet.commit_cell_edit(0, 2, "0");
        assert_eq!(sheet.get_line(0, &options), "i 1 0");

        sheet.load_text("i 1 0 1");
        sheet.commit_cell_edit(0, 4, "440");
        assert_eq!(sheet.get_line(0, &options), "i 1 0 1 440");

        sheet.select_rect(0, 0, 0, 0);
        sheet.send_events();
        assert_eq!(sent(&rx), ["i 1 0.00000000 1.00000000 440"]);
    }

    #[test]
    fn test_paste_after_load_keeps_fields_apart() {
        let mut sheet = EventSheet::new();
        sheet.load_text("i 1 0 1");
        sheet.select_rect(0, 4, 0, 4);
        sheet.paste_text("440");
        assert_eq!(sheet.get_line(0, &LineOptions::default()), "i 1 0 1 440");
    }

    #[test]
    fn test_edit_after_undo_keeps_fields_apart() {
        let mut sheet = EventSheet::new();
        sheet.load_text("i 1 0 1");
        sheet.commit_cell_edit(0, 4, "440");
        assert!(sheet.undo());
        assert_eq!(sheet.get_plain_text(), "i 1 0 1");

        sheet.commit_cell_edit(0, 4, "880");
        assert_eq!(sheet.get_line(0, &LineOptions::default()), "i 1 0 1 880");
    }

    #[test]
    fn test_copy_cut_paste() {
        let mut sheet = EventSheet::new();
        sheet.load_text("i 1 0 1\ni 2 0 1\n\n");
        sheet.select_rect(0, 1, 1, 2);
        assert_eq!(sheet.copy(), "1 0 \n2 0 ");

        sheet.select_rect(2, 1, 3, 2);
        sheet.paste();
        assert_eq!(sheet.grid().text(2, 1), Some("1"));
        assert_eq!(sheet.grid().text(3, 2), Some("0"));

        sheet.select_rect(0, 1, 1, 2);
        sheet.cut();
        assert!(sheet.grid().cell(0, 1).is_none());
        assert!(sheet.grid().cell(1, 2).is_none());
        assert!(sheet.undo());
        assert_eq!(sheet.grid().text(0, 1), Some("1"));
    }

    #[test]
    fn test_paste_single_cell_takes_all_data() {
        let mut sheet = EventSheet::new();
        sheet.select_rect(3, 0, 3, 0);
        sheet.paste_text("i 1 0 1\ni 2 0 1");
        let options = LineOptions::default();
        assert_eq!(sheet.get_line(3, &options), "i 1 0 1");
        assert_eq!(sheet.get_line(4, &options), "i 2 0 1");
        assert_eq!(sheet.history().len(), 1);
    }

    #[test]
    fn test_del() {
        let mut sheet = EventSheet::new();
        sheet.load_text("i 1 0 1");
        sheet.select_rect(0, 2, 0, 3);
        sheet.del();
        assert!(sheet.grid().cell(0, 2).is_none());
        assert_eq!(sheet.history().len(), 2);
    }

    #[test]
    fn test_delete_rows() {
        let mut sheet = EventSheet::new();
        sheet.load_text("a\nb\nc");
        sheet.set_selection(Selection::from_cells([(2, 0), (0, 1)]));
        sheet.delete_rows();
        assert_eq!(sheet.grid().row_count(), 1);
        assert_eq!(sheet.grid().text(0, 0), Some("b"));
        assert!(sheet.selection().is_empty());
    }

    #[test]
    fn test_transform_marks_history_once() {
        let mut sheet = EventSheet::new();
        sheet.load_text("i 1 0 1\ni 1 1 1\ni 1 2 1\ni 1 3 1\ni 1 4 1");
        let before = sheet.history().len();
        sheet.select_rect(0, 4, 4, 4);
        sheet.fill(1.0, 5.0, 1.0);
        assert_eq!(sheet.history().len(), before + 1);
        let values: Vec<_> = (0..5).map(|r| sheet.grid().text(r, 4).unwrap()).collect();
        assert_eq!(values, ["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_rotate_and_reverse() {
        let mut sheet = EventSheet::new();
        sheet.load_text("1\n2\n3\n4");
        sheet.select_rect(0, 0, 3, 0);
        sheet.rotate(1);
        let column = |s: &EventSheet| -> Vec<String> {
            (0..4).map(|r| s.grid().text(r, 0).unwrap().to_string()).collect()
        };
        assert_eq!(column(&sheet), ["4", "1", "2", "3"]);

        sheet.reverse();
        assert_eq!(column(&sheet), ["3", "2", "1", "4"]);

        // One row per column: nothing to reverse, nothing recorded.
        let before = sheet.history().len();
        sheet.select_rect(0, 0, 0, 3);
        sheet.reverse();
        assert_eq!(sheet.history().len(), before);
    }

    #[test]
    fn test_randomize_integers() {
        let mut sheet = EventSheet::new();
        sheet.reseed(3);
        sheet.select_rect(0, 0, 9, 5);
        for _ in 0..10 {
            sheet.randomize(0.0, 5.0, RandomMode::Integer);
            for (row, column) in sheet.selection().iter() {
                let n: f64 = sheet.grid().text(row, column).unwrap().parse().unwrap();
                assert!(n.fract() == 0.0 && (0.0..=5.0).contains(&n));
            }
        }
    }

    #[test]
    fn test_modified_hook() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let mut sheet = EventSheet::new();
        sheet.set_on_modified(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sheet.select_rect(0, 0, 3, 0);
        sheet.add(1.0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_send_events_scales_tempo() {
        let (mut sheet, rx) = sheet_with_sink();
        sheet.load_text("i 1 2.0 1.0\nf 1 0 8 10");
        sheet.set_tempo(120.0);
        sheet.select_rect(0, 0, 1, 3);
        sheet.send_events();
        assert_eq!(
            sent(&rx),
            ["i 1 1.00000000 0.50000000", "f 1 0 8 10"]
        );
        assert_eq!(sheet.active_instruments().numbers(), &[1.0]);
    }

    #[test]
    fn test_send_events_offset() {
        let (mut sheet, rx) = sheet_with_sink();
        sheet.load_text("i 1 4 1\ni 1 6 1");
        sheet.select_rect(0, 0, 1, 0);
        sheet.send_events_offset();
        assert_eq!(
            sent(&rx),
            ["i 1 0.00000000 1.00000000", "i 1 2.00000000 1.00000000"]
        );
    }

    #[test]
    fn test_empty_selection_sends_nothing() {
        let (mut sheet, rx) = sheet_with_sink();
        sheet.load_text("i 1 0 1");
        sheet.send_events();
        sheet.send_events_offset();
        assert!(sent(&rx).is_empty());
    }

    #[test]
    fn test_stop_sends_note_off() {
        let (mut sheet, rx) = sheet_with_sink();
        sheet.load_text("i 3 0 1");
        sheet.select_rect(0, 0, 0, 0);
        sheet.send_events();
        sent(&rx);

        sheet.stop_all_events();
        assert_eq!(sent(&rx), ["i -3 0 1"]);
        assert!(sheet.active_instruments().is_empty());

        sheet.stop_all_events();
        assert!(sent(&rx).is_empty());
    }

    #[test]
    fn test_loop_resends_until_stopped() {
        let (mut sheet, rx) = sheet_with_sink();
        sheet.load_text("i 2 0 1\ni 2 1 1");
        sheet.set_tempo(120.0);
        sheet.set_loop_length(2.0);
        sheet.select_rect(0, 0, 1, 0);

        let t0 = Instant::now();
        sheet.loop_events_at(t0);
        assert!(sheet.is_looping());
        assert_eq!(sheet.highlighted().len(), 2);
        assert_eq!(sent(&rx).len(), 2);
        assert_eq!(sheet.next_deadline(), Some(t0 + Duration::from_secs(1)));

        assert!(!sheet.poll_timer(t0 + Duration::from_millis(900)));
        assert!(sheet.poll_timer(t0 + Duration::from_secs(1)));
        assert_eq!(sent(&rx).len(), 2);

        sheet.stop_all_events();
        assert!(!sheet.is_looping());
        assert!(sheet.highlighted().is_empty());
        assert_eq!(sent(&rx), ["i -2 0 1"]);
        assert!(!sheet.poll_timer(t0 + Duration::from_secs(5)));
        assert!(sent(&rx).is_empty());
    }

    #[test]
    fn test_script_output() {
        let mut sheet = EventSheet::new();
        sheet
            .apply_script_output("__@ 1 0 0 0\ni 9 0 1\n")
            .unwrap();
        assert_eq!(sheet.grid().text(1, 1), Some("9"));
        assert_eq!(sheet.history().len(), 1);

        let before = sheet.get_plain_text();
        assert!(sheet.apply_script_output("garbage").is_err());
        assert_eq!(sheet.get_plain_text(), before);
    }

    #[test]
    fn test_script_output_with_huge_extent_is_rejected() {
        let mut sheet = EventSheet::new();
        sheet.load_text("i 1 0 1");
        let result = sheet.apply_script_output("__@ 0 0 9223372036854775807 1\ni 2");
        assert!(matches!(result, Err(SheetError::ScriptOutput(_))));
        assert_eq!(sheet.grid().row_count(), 1);
        assert_eq!(sheet.get_plain_text(), "i 1 0 1");
    }

    #[test]
    fn test_stop_turns_off_carried_instrument() {
        let (mut sheet, rx) = sheet_with_sink();
        sheet.load_text("i 7 0 1\ni . 1 1");
        sheet.select_rect(1, 0, 1, 0);
        sheet.send_events();
        assert_eq!(sent(&rx), ["i 7 1.00000000 1.00000000"]);

        sheet.stop_all_events();
        assert_eq!(sent(&rx), ["i -7 0 1"]);
    }

    #[test]
    fn test_document_load_resets_history() {
        let mut source = EventSheet::new();
        source.load_text("i 1 0 1 ; first\ni 1 1 1");
        source.set_tempo(90.0);
        let document = source.to_document();

        let mut sheet = EventSheet::new();
        sheet.commit_cell_edit(0, 0, "x");
        sheet.commit_cell_edit(0, 1, "y");
        sheet.load_document(document);
        assert_eq!(sheet.tempo(), 90.0);
        assert_eq!(sheet.get_plain_text(), source.get_plain_text());
        assert_eq!(sheet.history().len(), 1);
        assert!(!sheet.undo());
    }
}
