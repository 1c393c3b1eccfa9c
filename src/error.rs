//! Error types for sheet persistence, configuration and command input.
//!
//! Editing operations never fail; only operations that touch files or
//! parse external text return these errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetError {
    /// File could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON document or config could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary autosave could not be encoded or decoded.
    #[error("binary format error: {0}")]
    Binary(#[from] bincode::Error),

    /// Script output did not start with a valid `__@` position header.
    #[error("invalid script output: {0}")]
    ScriptOutput(String),

    /// A command line typed by the user could not be understood.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
