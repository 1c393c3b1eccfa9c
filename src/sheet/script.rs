//! Data exchange with external sheet scripts.
//!
//! A script receives the selected block and the whole sheet as a small
//! Python-literal data file, and answers with a position header followed by
//! score lines to paste back.
//!
//! # Output format
//!
//! ```text
//! __@ <row> <column> <rows> <columns>
//! i 1 0 1
//! i 1 1 1
//! ```
//!
//! `rows`/`columns` use the paste convention: `0` pastes as much as the data
//! holds, a negative value covers at least the current sheet size.

use super::grid::{Extent, Grid};
use super::parse_number;
use super::selection::Selection;
use crate::error::SheetError;

/// Header prefix of script output.
pub const OUTPUT_MARKER: &str = "__@ ";

/// Largest paste position or size a script may request.
pub const MAX_PATCH_EXTENT: i64 = 65_536;

/// Score text returned by a script, with where to paste it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptPatch {
    pub row: usize,
    pub column: usize,
    pub rows: Extent,
    pub columns: Extent,
    pub text: String,
}

/// Renders one cell as a literal: numbers bare, other text single-quoted,
/// absent cells as `''`.
fn literal(grid: &Grid, row: usize, column: usize) -> String {
    match grid.text(row, column) {
        None => "''".to_string(),
        Some(text) if parse_number(text).is_some() => text.to_string(),
        Some(text) => format!("'{}'", text),
    }
}

/// Renders a block of rows as a list of tuples.
fn block(grid: &Grid, rows: impl Iterator<Item = usize>, columns: &[usize]) -> String {
    let lines: Vec<String> = rows
        .map(|row| {
            let cells: Vec<String> = columns.iter().map(|&c| literal(grid, row, c)).collect();
            format!("( {} )", cells.join(", "))
        })
        .collect();
    format!("[ {} ]", lines.join(",\n"))
}

/// Builds the data file handed to a script.
///
/// `data` covers the bounding box of the selection; `data_all` covers the
/// whole sheet.
///
/// # Returns
///
/// The data text, or None if nothing is selected
pub fn script_data_text(grid: &Grid, selection: &Selection) -> Option<String> {
    let (min_row, min_column, max_row, max_column) = selection.bounds()?;
    let selected_columns: Vec<usize> = (min_column..=max_column).collect();
    let all_columns: Vec<usize> = (0..grid.column_count()).collect();

    let mut text = String::new();
    text.push_str(&format!("row = {}\n", min_row));
    text.push_str(&format!("col = {}\n", min_column));
    text.push_str(&format!("num_rows = {}\n", max_row - min_row + 1));
    text.push_str(&format!("num_cols = {}\n", max_column - min_column + 1));
    text.push_str(&format!("total_rows = {}\n", grid.row_count()));
    text.push_str(&format!("total_cols = {}\n", grid.column_count()));
    text.push_str(&format!(
        "data = {}\n",
        block(grid, min_row..=max_row, &selected_columns)
    ));
    text.push_str(&format!(
        "data_all = {}\n",
        block(grid, 0..grid.row_count(), &all_columns)
    ));
    Some(text)
}

/// Parses the output a script wrote back.
///
/// # Errors
///
/// Returns [`SheetError::ScriptOutput`] if the header is missing, its
/// position values are not integers, or they exceed [`MAX_PATCH_EXTENT`]
pub fn parse_script_output(output: &str) -> Result<ScriptPatch, SheetError> {
    let (header, body) = output.split_once('\n').unwrap_or((output, ""));
    let position = header
        .strip_prefix(OUTPUT_MARKER)
        .ok_or_else(|| SheetError::ScriptOutput("missing position header".into()))?;

    let values = position
        .split_whitespace()
        .map(|v| v.parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SheetError::ScriptOutput(format!("bad position header: {}", e)))?;
    let &[row, column, rows, columns] = values.as_slice() else {
        return Err(SheetError::ScriptOutput(format!(
            "expected 4 position values, got {}",
            values.len()
        )));
    };
    if row < 0 || column < 0 {
        return Err(SheetError::ScriptOutput("negative paste position".into()));
    }
    if [row, column, rows, columns].iter().any(|v| *v > MAX_PATCH_EXTENT) {
        return Err(SheetError::ScriptOutput(format!(
            "paste position or size exceeds {}",
            MAX_PATCH_EXTENT
        )));
    }

    Ok(ScriptPatch {
        row: row as usize,
        column: column as usize,
        rows: Extent::from_code(rows),
        columns: Extent::from_code(columns),
        text: body.strip_suffix('\n').unwrap_or(body).to_string(),
    })
}
