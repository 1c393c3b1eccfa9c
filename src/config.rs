//! Sheet configuration.
//!
//! Settings are read from an optional JSON file; missing keys fall back to
//! the defaults of a new sheet. Command-line flags override file values.

use crate::error::SheetError;
use crate::sheet::{DEFAULT_COLUMN_NAMES, DEFAULT_LOOP_LENGTH, DEFAULT_ROWS, DEFAULT_TEMPO};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Sheet name.
    pub name: String,

    /// Tempo in beats per minute.
    pub tempo: f64,

    /// Loop length in beats.
    pub loop_length: f64,

    /// Rows in a new sheet.
    pub rows: usize,

    /// Columns in a new sheet.
    pub columns: usize,

    /// Maximum number of undo snapshots. None keeps all of them.
    pub history_limit: Option<usize>,

    /// Where the binary autosave is written on exit, if anywhere.
    pub autosave_path: Option<PathBuf>,
}

impl SheetConfig {
    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not valid JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SheetError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            name: "Events".to_string(),
            tempo: DEFAULT_TEMPO,
            loop_length: DEFAULT_LOOP_LENGTH,
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMN_NAMES.len(),
            history_limit: None,
            autosave_path: None,
        }
    }
}
