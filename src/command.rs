//! Text commands for driving a sheet from a line-oriented front end.
//!
//! Each command is one line: a keyword followed by whitespace-separated
//! arguments, e.g. `select 0 0 3 0` or `fill 1 10 2`.

use crate::error::SheetError;
use crate::event_sheet::EventSheet;
use crate::sheet::{ArithmeticOp, RandomMode};
use std::path::PathBuf;
use std::str::FromStr;

/// A parsed user command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select {
        row_a: usize,
        column_a: usize,
        row_b: usize,
        column_b: usize,
    },
    Edit {
        row: usize,
        column: usize,
        text: String,
    },
    Arithmetic(ArithmeticOp, f64),
    Random {
        min: f64,
        max: f64,
        mode: RandomMode,
    },
    Shuffle(usize),
    Rotate(i64),
    Reverse,
    Fill {
        start: f64,
        end: f64,
        slope: f64,
    },
    Undo,
    Redo,
    Copy,
    Cut,
    Paste,
    Delete,
    Send,
    SendOffset,
    Loop,
    Stop,
    Tempo(f64),
    LoopLength(f64),
    AppendRow,
    AppendColumn,
    DeleteColumn,
    DeleteRows,
    /// Print the sheet as score text.
    Print,
    /// Print the script data file for the selection.
    Data,
    Save(PathBuf),
    Quit,
}

fn invalid(message: impl Into<String>) -> SheetError {
    SheetError::InvalidCommand(message.into())
}

/// Parses the argument at `index`.
fn arg<T: FromStr>(args: &[&str], index: usize, name: &str) -> Result<T, SheetError> {
    let value = args
        .get(index)
        .ok_or_else(|| invalid(format!("missing argument <{}>", name)))?;
    value
        .parse()
        .map_err(|_| invalid(format!("bad value for <{}>: {}", name, value)))
}

impl Command {
    /// Parses one command line.
    ///
    /// # Errors
    ///
    /// Returns [`SheetError::InvalidCommand`] for unknown keywords and
    /// missing or malformed arguments
    pub fn parse(line: &str) -> Result<Self, SheetError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = tokens.split_first() else {
            return Err(invalid("empty command"));
        };

        let command = match keyword {
            "select" => Command::Select {
                row_a: arg(args, 0, "row")?,
                column_a: arg(args, 1, "column")?,
                row_b: arg(args, 2, "row")?,
                column_b: arg(args, 3, "column")?,
            },
            "edit" => Command::Edit {
                row: arg(args, 0, "row")?,
                column: arg(args, 1, "column")?,
                text: args.get(2..).unwrap_or_default().join(" "),
            },
            "add" => Command::Arithmetic(ArithmeticOp::Add, arg(args, 0, "value")?),
            "sub" => Command::Arithmetic(ArithmeticOp::Subtract, arg(args, 0, "value")?),
            "mul" => Command::Arithmetic(ArithmeticOp::Multiply, arg(args, 0, "value")?),
            "div" => Command::Arithmetic(ArithmeticOp::Divide, arg(args, 0, "value")?),
            "random" => Command::Random {
                min: arg(args, 0, "min")?,
                max: arg(args, 1, "max")?,
                mode: RandomMode::from_code(arg(args, 2, "mode")?),
            },
            "shuffle" => Command::Shuffle(arg(args, 0, "iterations")?),
            "rotate" => Command::Rotate(arg(args, 0, "amount")?),
            "reverse" => Command::Reverse,
            "fill" => Command::Fill {
                start: arg(args, 0, "start")?,
                end: arg(args, 1, "end")?,
                slope: arg(args, 2, "slope")?,
            },
            "undo" => Command::Undo,
            "redo" => Command::Redo,
            "copy" => Command::Copy,
            "cut" => Command::Cut,
            "paste" => Command::Paste,
            "del" => Command::Delete,
            "send" => Command::Send,
            "send0" => Command::SendOffset,
            "loop" => Command::Loop,
            "stop" => Command::Stop,
            "tempo" => Command::Tempo(arg(args, 0, "bpm")?),
            "looplen" => Command::LoopLength(arg(args, 0, "beats")?),
            "appendrow" => Command::AppendRow,
            "appendcol" => Command::AppendColumn,
            "delcol" => Command::DeleteColumn,
            "delrows" => Command::DeleteRows,
            "print" => Command::Print,
            "data" => Command::Data,
            "save" => Command::Save(PathBuf::from(arg::<String>(args, 0, "path")?)),
            "quit" | "exit" => Command::Quit,
            other => return Err(invalid(format!("unknown command: {}", other))),
        };
        Ok(command)
    }

    /// Runs the command against a sheet.
    ///
    /// # Returns
    ///
    /// Text to show the user, if the command produces any
    ///
    /// # Errors
    ///
    /// Returns error if saving fails
    pub fn apply(self, sheet: &mut EventSheet) -> Result<Option<String>, SheetError> {
        match self {
            Command::Select {
                row_a,
                column_a,
                row_b,
                column_b,
            } => sheet.select_rect(row_a, column_a, row_b, column_b),
            Command::Edit { row, column, text } => {
                if !sheet.commit_cell_edit(row, column, &text) {
                    return Err(invalid(format!("cell {} {} is outside the sheet", row, column)));
                }
            }
            Command::Arithmetic(ArithmeticOp::Add, value) => sheet.add(value),
            Command::Arithmetic(ArithmeticOp::Subtract, value) => sheet.subtract(value),
            Command::Arithmetic(ArithmeticOp::Multiply, value) => sheet.multiply(value),
            Command::Arithmetic(ArithmeticOp::Divide, value) => sheet.divide(value),
            Command::Random { min, max, mode } => sheet.randomize(min, max, mode),
            Command::Shuffle(iterations) => sheet.shuffle(iterations),
            Command::Rotate(amount) => sheet.rotate(amount),
            Command::Reverse => sheet.reverse(),
            Command::Fill { start, end, slope } => sheet.fill(start, end, slope),
            Command::Undo => {
                sheet.undo();
            }
            Command::Redo => {
                sheet.redo();
            }
            Command::Copy => return Ok(Some(sheet.copy())),
            Command::Cut => return Ok(Some(sheet.cut())),
            Command::Paste => sheet.paste(),
            Command::Delete => sheet.del(),
            Command::Send => sheet.send_events(),
            Command::SendOffset => sheet.send_events_offset(),
            Command::Loop => sheet.loop_events(),
            Command::Stop => sheet.stop_all_events(),
            Command::Tempo(tempo) => sheet.set_tempo(tempo),
            Command::LoopLength(beats) => sheet.set_loop_length(beats),
            Command::AppendRow => sheet.append_row(),
            Command::AppendColumn => sheet.append_column(),
            Command::DeleteColumn => sheet.delete_last_column(),
            Command::DeleteRows => sheet.delete_rows(),
            Command::Print => return Ok(Some(sheet.get_plain_text())),
            Command::Data => return Ok(sheet.script_data_text()),
            Command::Save(path) => {
                let document = sheet.to_document();
                match path.extension().and_then(|e| e.to_str()) {
                    Some("json") => document.save_to_file(&path)?,
                    Some("qsh") => document.save_to_binary(&path)?,
                    _ => document.export_score(&path)?,
                }
                return Ok(Some(format!("saved {}", path.display())));
            }
            Command::Quit => {}
        }
        Ok(None)
    }
}
