//! qutesheet - A score event sheet for live coding.
//!
//! This library provides the event sheet: a grid of score statements that
//! can be edited, transformed in batches, undone, and sent or looped to a
//! performance engine as individual events.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event_sheet;
pub mod history;
pub mod sheet;

// Re-export commonly used types
pub use command::Command;
pub use config::SheetConfig;
pub use dispatch::{EventSink, LoopScheduler};
pub use error::SheetError;
pub use event_sheet::{Clipboard, EventSheet, MemoryClipboard};
pub use history::HistoryManager;
pub use sheet::{Extent, Grid, LineOptions, Selection, SheetDocument};
