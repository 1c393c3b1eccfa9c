//! Event sheet data structures and editing algorithms.
//!
//! This module provides the cell store, the score-line codec, selections,
//! the batch transforms that operate over a selection, and the persisted
//! document form of a sheet.

pub mod cell;
pub mod codec;
pub mod document;
pub mod grid;
pub mod script;
pub mod selection;
pub mod transform;

pub use cell::{Cell, Field};
pub use codec::{get_line, get_plain_text, parse_line, Line, LineOptions};
pub use document::SheetDocument;
pub use grid::{Extent, Grid};
pub use selection::Selection;
pub use transform::{ArithmeticOp, RandomMode};

/// Default tempo in beats per minute. At 60 BPM one beat lasts one second,
/// so tempo scaling leaves times unchanged.
pub const DEFAULT_TEMPO: f64 = 60.0;

/// Default loop length in beats.
pub const DEFAULT_LOOP_LENGTH: f64 = 1.0;

/// Number of rows in a freshly created sheet.
pub const DEFAULT_ROWS: usize = 10;

/// Header labels of a freshly created sheet.
pub const DEFAULT_COLUMN_NAMES: [&str; 6] =
    ["Event", "p1 (instr)", "p2 (start)", "p3 (dur)", "p4", "p5"];

/// Score shorthand for "same value as the row above".
pub const CARRY_MARKER: &str = ".";

/// Separator emitted between cells that have no stored separator.
pub const DEFAULT_SEPARATOR: &str = " ";

/// Returns the header label for a column appended at `index`.
///
/// Column 0 holds the event type, so column `n` carries p-field `n`.
pub fn column_name(index: usize) -> String {
    format!("p{}", index)
}

/// Parses the text of a cell as a number.
///
/// Leading and trailing whitespace is ignored. Returns None for empty or
/// non-numeric text, which callers treat as "pass the text through".
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Formats a computed cell value.
///
/// Uses the shortest representation that round-trips, so whole numbers
/// are written without a fractional part (`3`, not `3.0`).
pub fn format_number(value: f64) -> String {
    value.to_string()
}

/// Converts a time in beats to seconds at the given tempo.
///
/// # Arguments
///
/// * `beats` - Time value expressed in beats
/// * `tempo` - Tempo in beats per minute
pub fn beats_to_seconds(beats: f64, tempo: f64) -> f64 {
    beats * (60.0 / tempo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(6), "p6");
        assert_eq!(column_name(12), "p12");
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("440"), Some(440.0));
        assert_eq!(parse_number(" -1.5 "), Some(-1.5));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("\"sample.wav\""), None);
        assert_eq!(parse_number("[1+2]"), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-2.0), "-2");
    }

    #[test]
    fn test_beats_to_seconds() {
        assert!((beats_to_seconds(2.0, 120.0) - 1.0).abs() < 1e-12);
        assert!((beats_to_seconds(1.0, 60.0) - 1.0).abs() < 1e-12);
    }
}
