//! Batch transforms over a cell selection.
//!
//! Every transform reads the selection once and writes cell text only;
//! separators stay with their grid position. Cells whose text is not a
//! number are left alone by the arithmetic operations. None of these
//! functions fail: degenerate selections are a no-op and numeric domain
//! errors produce IEEE infinities or NaN.

use super::grid::Grid;
use super::selection::Selection;
use super::{format_number, parse_number};
use rand::Rng;

/// Arithmetic applied to every numeric cell of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub fn apply(self, n: f64, value: f64) -> f64 {
        match self {
            ArithmeticOp::Add => n + value,
            ArithmeticOp::Subtract => n - value,
            ArithmeticOp::Multiply => n * value,
            ArithmeticOp::Divide => n / value,
        }
    }
}

/// Distribution used by [`randomize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomMode {
    /// Uniform real values in `[min, max]`.
    Decimal,
    /// Uniform whole numbers in `[min, max]`.
    Integer,
}

impl RandomMode {
    /// Decodes the numeric mode: `0` is decimal, anything else integer.
    pub fn from_code(code: i64) -> Self {
        if code == 0 {
            RandomMode::Decimal
        } else {
            RandomMode::Integer
        }
    }
}

/// Applies `op` with `value` to every selected cell holding a number.
///
/// Division by zero is not special-cased.
pub fn arithmetic(grid: &mut Grid, selection: &Selection, op: ArithmeticOp, value: f64) {
    for (row, column) in selection.iter() {
        if let Some(cell) = grid.cell_mut(row, column) {
            if let Some(n) = parse_number(&cell.text) {
                cell.text = format_number(op.apply(n, value));
            }
        }
    }
}

/// Writes a random value into every selected position, creating cells.
///
/// In integer mode the value is `min + k` with `k` drawn from
/// `0..trunc(max - min + 1)`; if that range is empty every value is `min`.
pub fn randomize<R: Rng + ?Sized>(
    grid: &mut Grid,
    selection: &Selection,
    min: f64,
    max: f64,
    mode: RandomMode,
    rng: &mut R,
) {
    for (row, column) in selection.iter() {
        let value = match mode {
            RandomMode::Decimal => min + rng.gen_range(0.0..=1.0) * (max - min),
            RandomMode::Integer => {
                let span = (max - min + 1.0) as i64;
                if span >= 1 {
                    min + rng.gen_range(0..span) as f64
                } else {
                    min
                }
            }
        };
        grid.set_text(row, column, format_number(value));
    }
}

/// Performs `iterations` swaps between two distinct random positions.
///
/// Only text moves; each position keeps its own separator. Needs at least
/// three selected cells.
///
/// # Returns
///
/// true if the selection was large enough to shuffle
pub fn shuffle<R: Rng + ?Sized>(
    grid: &mut Grid,
    selection: &Selection,
    iterations: usize,
    rng: &mut R,
) -> bool {
    let cells = selection.cells();
    if cells.len() < 3 {
        return false;
    }
    for _ in 0..iterations {
        let a = rng.gen_range(0..cells.len());
        let mut b = rng.gen_range(0..cells.len());
        while b == a {
            b = rng.gen_range(0..cells.len());
        }
        let (row_a, column_a) = cells[a];
        let (row_b, column_b) = cells[b];
        let text_a = grid.text(row_a, column_a).map(str::to_string);
        let text_b = grid.text(row_b, column_b).map(str::to_string);
        if text_a.is_none() && text_b.is_none() {
            continue;
        }
        grid.set_text(row_a, column_a, text_b.unwrap_or_default());
        grid.set_text(row_b, column_b, text_a.unwrap_or_default());
    }
    true
}

/// Shifts the selected values `amount` positions forward in enumeration
/// order, wrapping around. Negative amounts shift backward.
pub fn rotate(grid: &mut Grid, selection: &Selection, amount: i64) {
    let cells = selection.cells();
    let n = cells.len();
    if n == 0 {
        return;
    }
    let old: Vec<String> = cells
        .iter()
        .map(|&(r, c)| grid.text(r, c).unwrap_or_default().to_string())
        .collect();
    for (i, &(row, column)) in cells.iter().enumerate() {
        let index = (i as i64 - amount).rem_euclid(n as i64) as usize;
        grid.set_text(row, column, old[index].clone());
    }
}

/// Reverses the order of values within each selected column.
///
/// The selection is read column by column in `column_count` chunks of
/// `len / column_count` cells; cells past the last chunk are left alone. Needs at least two selected cells and at
/// least two rows per column.
///
/// # Returns
///
/// true if the values were reversed
pub fn reverse(grid: &mut Grid, selection: &Selection) -> bool {
    let cells = selection.cells();
    if cells.len() < 2 {
        return false;
    }
    let column_count = selection.columns().len();
    let rows_per_column = cells.len() / column_count;
    if rows_per_column < 2 {
        return false;
    }
    for chunk in cells.chunks_exact(rows_per_column).take(column_count) {
        let values: Vec<String> = chunk
            .iter()
            .map(|&(r, c)| grid.text(r, c).unwrap_or_default().to_string())
            .collect();
        for (&(row, column), value) in chunk.iter().zip(values.into_iter().rev()) {
            grid.set_text(row, column, value);
        }
    }
    true
}

/// Computes the `i`-th of `n` values ramping from `start` to `end`.
///
/// A slope of exactly 1 gives a linear ramp; any other slope gives an
/// exponential curve. A non-positive slope has no logarithm and yields NaN
/// (or a jump straight to `end` when the slope is zero).
pub fn ramp_value(start: f64, end: f64, slope: f64, i: usize, n: usize) -> f64 {
    if i == 0 {
        return start;
    }
    let steps = n as f64 - 1.0;
    if slope == 1.0 {
        start + i as f64 * ((end - start) / steps)
    } else {
        let curve = ((i as f64 / steps) * slope.ln()).exp() - 1.0;
        start + (end - start) * curve / (slope - 1.0)
    }
}

/// Fills the selection with a ramp from `start` to `end`, creating cells.
pub fn fill(grid: &mut Grid, selection: &Selection, start: f64, end: f64, slope: f64) {
    let n = selection.len();
    for (i, (row, column)) in selection.iter().enumerate() {
        grid.set_text(row, column, format_number(ramp_value(start, end, slope, i, n)));
    }
}
