//! Score-line codec.
//!
//! Converts between one grid row and one line of Csound score text. The
//! parser records the whitespace after every token so that serializing a
//! parsed line reproduces it byte for byte.
//!
//! # Line format
//!
//! - A leading `i` or `f` is the statement type and needs no space after it
//! - Tokens are separated by whitespace, kept verbatim as separators
//! - `"..."` strings and `[...]` formulas may contain whitespace
//! - `;` starts a comment; further `;` split the comment into fragments

use super::cell::Field;
use super::grid::Grid;
use super::{beats_to_seconds, parse_number, CARRY_MARKER, DEFAULT_SEPARATOR, DEFAULT_TEMPO};
use std::mem;

/// Options controlling how a row is serialized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineOptions {
    /// Convert p2 (start) and p3 (duration) of `i` statements from beats to
    /// seconds using `tempo`.
    pub scale_tempo: bool,

    /// Report the instrument number (p1) of `i` statements.
    pub store_number: bool,

    /// Resolve `.` carry markers from the rows above.
    pub preprocess: bool,

    /// Added to p2 before tempo scaling.
    pub start_offset: f64,

    /// Tempo in beats per minute used for scaling.
    pub tempo: f64,
}

impl LineOptions {
    /// Options used when sending a row to the performance engine.
    pub fn dispatch(tempo: f64) -> Self {
        Self {
            scale_tempo: true,
            store_number: true,
            preprocess: true,
            start_offset: 0.0,
            tempo,
        }
    }

    pub fn with_start_offset(mut self, start_offset: f64) -> Self {
        self.start_offset = start_offset;
        self
    }
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            scale_tempo: false,
            store_number: false,
            preprocess: false,
            start_offset: 0.0,
            tempo: DEFAULT_TEMPO,
        }
    }
}

/// A serialized row.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// The score line text.
    pub text: String,

    /// Instrument number of an `i` statement, when requested through
    /// [`LineOptions::store_number`] and p1 is numeric.
    pub instrument: Option<f64>,
}

/// Splits one line of score text into fields.
///
/// Whitespace between tokens becomes the separator of the token before it.
/// A line that begins with whitespace yields an empty first field carrying
/// that whitespace. Everything after the first unquoted `;` is comment text.
pub fn parse_line(line: &str) -> Vec<Field> {
    let mut fields = Vec::new();
    let mut value = String::new();
    let mut separator = String::new();
    let mut in_field = true;
    let mut in_string = false;
    let mut in_formula = false;
    let mut start = 0;

    if line.starts_with(['i', 'f']) {
        value.push_str(&line[..1]);
        in_field = false;
        start = 1;
    }

    for (offset, c) in line[start..].char_indices() {
        let pos = start + offset;
        if in_field || in_string || in_formula {
            if c == ';' && !in_string && !in_formula {
                if pos > 0 {
                    fields.push(Field::new(mem::take(&mut value), mem::take(&mut separator)));
                }
                push_comment(&mut fields, &line[pos + 1..]);
                return fields;
            }
            match c {
                '"' => in_string = !in_string,
                '[' if !in_string => in_formula = true,
                ']' if !in_string => in_formula = false,
                _ => {}
            }
            if c.is_whitespace() && !in_string && !in_formula {
                in_field = false;
                separator.push(c);
            } else {
                value.push(c);
            }
        } else if c == ';' {
            fields.push(Field::new(mem::take(&mut value), mem::take(&mut separator)));
            push_comment(&mut fields, &line[pos + 1..]);
            return fields;
        } else if c.is_whitespace() {
            separator.push(c);
        } else {
            fields.push(Field::new(mem::take(&mut value), mem::take(&mut separator)));
            value.push(c);
            in_field = true;
            match c {
                '"' => in_string = true,
                '[' => in_formula = true,
                _ => {}
            }
        }
    }

    if separator.is_empty() {
        fields.push(Field::line_end(value));
    } else {
        fields.push(Field::new(value, separator));
    }
    fields
}

/// Appends the comment fragments following a `;`.
///
/// Only the first fragment keeps the visible `;`; the serializer restores
/// the others. Fragments are adjacent, so all but the last carry an empty
/// separator.
fn push_comment(fields: &mut Vec<Field>, comment: &str) {
    let mut parts = comment.split(';').peekable();
    let mut first = true;
    while let Some(part) = parts.next() {
        let value = if first {
            format!(";{}", part)
        } else {
            part.to_string()
        };
        first = false;
        if parts.peek().is_some() {
            fields.push(Field::new(value, ""));
        } else {
            fields.push(Field::line_end(value));
        }
    }
}

/// Finds the value a `.` carry marker stands for.
///
/// Scans upward from the row above. Stops at the first absent cell (giving
/// an empty value) or the first text that is not itself a carry marker.
fn carry_value(grid: &Grid, row: usize, column: usize) -> String {
    for r in (0..row).rev() {
        match grid.text(r, column) {
            None => return String::new(),
            Some(CARRY_MARKER) => continue,
            Some(text) => return text.to_string(),
        }
    }
    String::new()
}

/// Returns true if any cell right of `column` holds text.
fn data_remaining(grid: &Grid, row: usize, column: usize) -> bool {
    (column + 1..grid.column_count()).any(|c| grid.text(row, c).is_some_and(|t| !t.is_empty()))
}

/// Serializes one row to a score line.
///
/// Absent cells are skipped. Each emitted cell is followed by its stored
/// separator, or by a single space when none is stored and a later cell
/// holds text. Once a cell starting with `;` is reached, the rest of the row is
/// comment text: later cells are prefixed with `;`, and empty cells with no
/// text after them are dropped.
///
/// # Arguments
///
/// * `grid` - The cell store
/// * `row` - Row index
/// * `options` - Tempo scaling, carry resolution and instrument reporting
pub fn get_line(grid: &Grid, row: usize, options: &LineOptions) -> Line {
    let mut pieces: Vec<(String, Option<&str>)> = Vec::new();
    let mut instrument = None;
    let mut instr_event = false;
    let mut comment = false;

    for column in 0..grid.column_count() {
        let Some(cell) = grid.cell(row, column) else {
            continue;
        };
        if column == 0 && cell.text == "i" {
            instr_event = true;
        }

        let text = if options.preprocess && cell.text == CARRY_MARKER {
            carry_value(grid, row, column)
        } else {
            cell.text.clone()
        };

        if options.store_number && instr_event && column == 1 {
            instrument = parse_number(&text);
        }

        let separator = cell.separator.as_deref();
        if options.scale_tempo && instr_event && (column == 2 || column == 3) {
            let rendered = match parse_number(&text) {
                Some(mut value) => {
                    if column == 2 {
                        value += options.start_offset;
                    }
                    format!("{:.8}", beats_to_seconds(value, options.tempo))
                }
                None => text,
            };
            pieces.push((rendered, separator));
        } else if comment {
            if !text.is_empty() || data_remaining(grid, row, column) {
                pieces.push((format!(";{}", text), separator));
            }
        } else {
            if text.starts_with(';') {
                comment = true;
            }
            pieces.push((text, separator));
        }
    }

    // Unrecorded separators only go between pieces of text.
    let last_text = pieces.iter().rposition(|(value, _)| !value.is_empty());
    let mut text = String::new();
    for (i, (value, separator)) in pieces.iter().enumerate() {
        text.push_str(value);
        match separator {
            Some(separator) => text.push_str(separator),
            None if last_text.is_some_and(|last| i < last) => text.push_str(DEFAULT_SEPARATOR),
            None => {}
        }
    }

    Line { text, instrument }
}

/// Serializes the whole grid, one line per row, without tempo scaling.
pub fn get_plain_text(grid: &Grid) -> String {
    let options = LineOptions::default();
    (0..grid.row_count())
        .map(|row| get_line(grid, row, &options).text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::cell::Cell;

    /// Loads parsed fields into row 0 of a fresh grid.
    fn grid_from_line(line: &str) -> Grid {
        let fields = parse_line(line);
        let mut grid = Grid::new(1, fields.len());
        for (column, field) in fields.into_iter().enumerate() {
            grid.set_cell(0, column, Some(field.into()));
        }
        grid
    }

    fn values(line: &str) -> Vec<String> {
        parse_line(line).into_iter().map(|f| f.value).collect()
    }

    #[test]
    fn test_parse_simple_statement() {
        let fields = parse_line("i 1 0 1");
        assert_eq!(
            fields,
            vec![
                Field::new("i", " "),
                Field::new("1", " "),
                Field::new("0", " "),
                Field::line_end("1"),
            ]
        );
    }

    #[test]
    fn test_parse_statement_without_space() {
        assert_eq!(values("i1 0 1"), vec!["i", "1", "0", "1"]);
        assert_eq!(parse_line("f1 0")[0], Field::new("f", ""));
    }

    #[test]
    fn test_parse_keeps_spacing_verbatim() {
        let fields = parse_line("i 1\t\t0   2");
        assert_eq!(fields[1].separator.as_deref(), Some("\t\t"));
        assert_eq!(fields[2].separator.as_deref(), Some("   "));
        assert_eq!(fields[3].separator, None);
    }

    #[test]
    fn test_parse_strings_and_formulas() {
        assert_eq!(
            values("i 1 0 1 \"my file.wav\" [1 + 2]"),
            vec!["i", "1", "0", "1", "\"my file.wav\"", "[1 + 2]"]
        );
        assert_eq!(values("i 1 \"a;b\""), vec!["i", "1", "\"a;b\""]);
    }

    #[test]
    fn test_parse_comment() {
        assert_eq!(values("i 1 0 1 ; note"), vec!["i", "1", "0", "1", "; note"]);
        assert_eq!(values("i 1 ;a;;b"), vec!["i", "1", ";a", "", "b"]);
        assert_eq!(values("; only a comment"), vec!["; only a comment"]);
        assert_eq!(values("i1;x"), vec!["i", "1", ";x"]);
    }

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(parse_line(""), vec![Field::line_end("")]);
    }

    #[test]
    fn test_round_trip() {
        let lines = [
            "i 1 0 1",
            "i1 0.5   2 440 ; tail",
            "f 1 0 1024 10 1",
            "i 1 0 1 \"my file.wav\" [1 + 2]",
            "; only a comment",
            "i 2 0 1 ;a;;b",
            "i1;x",
            "  i 1",
            "i 1 2 ",
            "",
        ];
        for line in lines {
            let grid = grid_from_line(line);
            let text = get_line(&grid, 0, &LineOptions::default()).text;
            assert_eq!(text, line, "round trip failed for {:?}", line);
        }
    }

    #[test]
    fn test_tempo_scaling() {
        let grid = grid_from_line("i 1 2.0 1.0 440");
        let options = LineOptions {
            scale_tempo: true,
            tempo: 120.0,
            ..LineOptions::default()
        };
        let line = get_line(&grid, 0, &options);
        assert_eq!(line.text, "i 1 1.00000000 0.50000000 440");
    }

    #[test]
    fn test_tempo_scaling_only_for_instrument_events() {
        let grid = grid_from_line("f 1 2 8 10");
        let line = get_line(&grid, 0, &LineOptions::dispatch(120.0));
        assert_eq!(line.text, "f 1 2 8 10");
        assert_eq!(line.instrument, None);
    }

    #[test]
    fn test_start_offset_applies_to_p2_only() {
        let grid = grid_from_line("i 1 3 2");
        let options = LineOptions::dispatch(60.0).with_start_offset(-3.0);
        assert_eq!(get_line(&grid, 0, &options).text, "i 1 0.00000000 2.00000000");
    }

    #[test]
    fn test_unparseable_time_passes_through() {
        let grid = grid_from_line("i 1 [1+1] 1");
        let line = get_line(&grid, 0, &LineOptions::dispatch(120.0));
        assert_eq!(line.text, "i 1 [1+1] 0.50000000");
        assert_eq!(line.instrument, Some(1.0));
    }

    #[test]
    fn test_carry_forward() {
        let mut grid = Grid::new(3, 5);
        for (row, line) in ["i 1 0 1 440", "i 1 1 1 .", "i 1 2 1 ."].iter().enumerate() {
            for (column, field) in parse_line(line).into_iter().enumerate() {
                grid.set_cell(row, column, Some(field.into()));
            }
        }
        let options = LineOptions {
            preprocess: true,
            ..LineOptions::default()
        };
        assert_eq!(get_line(&grid, 1, &options).text, "i 1 1 1 440");
        assert_eq!(get_line(&grid, 2, &options).text, "i 1 2 1 440");
        assert_eq!(get_line(&grid, 2, &LineOptions::default()).text, "i 1 2 1 .");
    }

    #[test]
    fn test_carry_stops_at_absent_cell() {
        let mut grid = Grid::new(3, 2);
        grid.set_cell(0, 1, Some(Cell::new("440")));
        grid.set_cell(2, 0, Some(Cell::new("x")));
        grid.set_cell(2, 1, Some(Cell::new(".")));
        let options = LineOptions {
            preprocess: true,
            ..LineOptions::default()
        };
        assert_eq!(get_line(&grid, 2, &options).text, "x");
    }

    #[test]
    fn test_comment_tail_drops_trailing_empty_cells() {
        let mut grid = grid_from_line("i 1 ;a;;b");
        grid.append_column();
        grid.set_text(0, 5, "");
        grid.set_text(0, 4, "");
        let text = get_line(&grid, 0, &LineOptions::default()).text;
        assert_eq!(text, "i 1 ;a");
    }

    #[test]
    fn test_text_after_line_end_gets_a_space() {
        let mut grid = grid_from_line("i 1 0 1");
        grid.append_column();
        grid.set_text(0, 4, "440");
        assert_eq!(get_line(&grid, 0, &LineOptions::default()).text, "i 1 0 1 440");

        let mut grid = grid_from_line("i1");
        grid.append_column();
        grid.set_text(0, 2, "0");
        assert_eq!(get_line(&grid, 0, &LineOptions::default()).text, "i1 0");
    }

    #[test]
    fn test_carried_instrument_is_reported() {
        let mut grid = Grid::new(2, 4);
        for (row, line) in ["i 7 0 1", "i . 1 1"].iter().enumerate() {
            for (column, field) in parse_line(line).into_iter().enumerate() {
                grid.set_cell(row, column, Some(field.into()));
            }
        }
        let line = get_line(&grid, 1, &LineOptions::dispatch(60.0));
        assert_eq!(line.text, "i 7 1.00000000 1.00000000");
        assert_eq!(line.instrument, Some(7.0));

        let raw = LineOptions {
            store_number: true,
            ..LineOptions::default()
        };
        assert_eq!(get_line(&grid, 1, &raw).instrument, None);
    }

    #[test]
    fn test_default_separator_between_cells() {
        let mut grid = Grid::new(1, 4);
        grid.set_text(0, 0, "i");
        grid.set_text(0, 1, "1");
        grid.set_text(0, 3, "2");
        assert_eq!(get_line(&grid, 0, &LineOptions::default()).text, "i 1 2");
    }

    #[test]
    fn test_plain_text() {
        let mut grid = Grid::new(3, 2);
        grid.set_text(0, 0, "i");
        grid.set_text(0, 1, "1");
        grid.set_text(2, 0, "e");
        assert_eq!(get_plain_text(&grid), "i 1\n\ne");
    }
}
