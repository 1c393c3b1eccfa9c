//! Persisted form of an event sheet.
//!
//! A document stores the sheet as score text plus the settings that shape
//! how it is played. The text uses the same line format as the clipboard,
//! so a document can also be written out as a plain score.

use super::{DEFAULT_LOOP_LENGTH, DEFAULT_TEMPO};
use crate::error::SheetError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A saved event sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetDocument {
    /// Sheet name shown on its tab.
    pub name: String,

    /// Tempo in beats per minute.
    #[serde(default = "default_tempo")]
    pub tempo: f64,

    /// Loop length in beats.
    #[serde(default = "default_loop_length")]
    pub loop_length: f64,

    /// Column header labels.
    #[serde(default)]
    pub column_names: Vec<String>,

    /// Newline-separated score lines, one per row.
    pub text: String,
}

fn default_tempo() -> f64 {
    DEFAULT_TEMPO
}

fn default_loop_length() -> f64 {
    DEFAULT_LOOP_LENGTH
}

impl SheetDocument {
    /// Serializes the document to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SheetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, SheetError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Saves the document to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file writing fails
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SheetError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Loads a document from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if file reading or parsing fails
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SheetError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Saves the document in the compact binary autosave format.
    pub fn save_to_binary<P: AsRef<Path>>(&self, path: P) -> Result<(), SheetError> {
        let data = bincode::serialize(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Loads a document from the binary autosave format.
    pub fn load_from_binary<P: AsRef<Path>>(path: P) -> Result<Self, SheetError> {
        let data = fs::read(path)?;
        Ok(bincode::deserialize(&data)?)
    }

    /// Writes only the score text.
    pub fn export_score<P: AsRef<Path>>(&self, path: P) -> Result<(), SheetError> {
        fs::write(path, &self.text)?;
        Ok(())
    }
}
