//! Cell and field representation.
//!
//! A cell is the content of one grid position: its display text plus the
//! whitespace that followed it in the score line it was parsed from. A field
//! is one lexical token produced by the line parser.

use super::{parse_number, DEFAULT_SEPARATOR};
use serde::{Deserialize, Serialize};

/// Content of a single grid position.
///
/// The separator is optional: `None` means no spacing was recorded for this
/// cell (it ended its line, or was typed in) and a single space is used when
/// text follows it. `Some` is written verbatim; `Some("")` means the cell was
/// directly adjacent to the next token, as in `i1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Display text of the cell.
    pub text: String,

    /// Whitespace written after the text when the row is serialized.
    pub separator: Option<String>,
}

impl Cell {
    /// Creates a cell with the given text and no recorded separator.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            separator: None,
        }
    }

    /// Creates a cell with an explicit separator.
    pub fn with_separator(text: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            separator: Some(separator.into()),
        }
    }

    /// Returns the separator to emit between this cell and the next one.
    pub fn separator_or_default(&self) -> &str {
        self.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR)
    }

    /// Returns the numeric value of the cell, if its text is a number.
    pub fn number(&self) -> Option<f64> {
        parse_number(&self.text)
    }

    /// Returns true if the cell holds no text.
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// One token of a parsed score line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    /// The token text: a p-field, a comment fragment, or the statement type.
    pub value: String,

    /// Whitespace that followed the token, recorded verbatim. None for the
    /// token that ends its line.
    pub separator: Option<String>,
}

impl Field {
    pub fn new(value: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            separator: Some(separator.into()),
        }
    }

    /// Creates the last token of a line, with nothing recorded after it.
    pub fn line_end(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            separator: None,
        }
    }
}

impl From<Field> for Cell {
    fn from(field: Field) -> Self {
        Self {
            text: field.value,
            separator: field.separator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_separator() {
        assert_eq!(Cell::new("1").separator_or_default(), " ");
        assert_eq!(Cell::with_separator("1", "").separator_or_default(), "");
        assert_eq!(Cell::with_separator("1", "\t ").separator_or_default(), "\t ");
    }

    #[test]
    fn test_cell_number() {
        assert_eq!(Cell::new("0.5").number(), Some(0.5));
        assert_eq!(Cell::new(".").number(), None);
        assert!(Cell::new("").is_blank());
    }

    #[test]
    fn test_field_into_cell() {
        let cell: Cell = Field::new("440", "  ").into();
        assert_eq!(cell.text, "440");
        assert_eq!(cell.separator.as_deref(), Some("  "));

        let cell: Cell = Field::line_end("1").into();
        assert_eq!(cell.separator, None);
    }
}
