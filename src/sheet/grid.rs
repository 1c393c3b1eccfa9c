//! The cell store.
//!
//! A grid is an ordered set of rows, each holding one optional cell per
//! column. An absent cell is different from a cell with empty text: absent
//! cells are skipped entirely when a row is serialized, while empty cells
//! still contribute their separator.

use super::cell::Cell;
use super::{column_name, DEFAULT_COLUMN_NAMES, DEFAULT_ROWS};

/// How many rows or columns a bulk write should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// Exactly as many as the incoming data provides.
    FromData,
    /// At least the current grid size, more if the data needs it.
    AtLeastCurrent,
    /// Exactly this many, clearing positions the data does not reach.
    Exact(usize),
}

impl Extent {
    /// Decodes the numeric convention used in script output headers:
    /// `0` is [`Extent::FromData`], negative is [`Extent::AtLeastCurrent`].
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Extent::FromData,
            n if n < 0 => Extent::AtLeastCurrent,
            n => Extent::Exact(n as usize),
        }
    }

    /// Resolves the extent against the amount of data and the current size.
    pub fn resolve(self, available: usize, current: usize) -> usize {
        match self {
            Extent::FromData => available,
            Extent::AtLeastCurrent => available.max(current),
            Extent::Exact(n) => n,
        }
    }
}

/// A resizable two-dimensional store of optional cells.
///
/// Every row always has exactly `column_count` slots, and the column header
/// list is kept the same length as the column count.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Option<Cell>>>,
    column_names: Vec<String>,
}

impl Grid {
    /// Creates an empty grid with the given number of rows and columns.
    ///
    /// The first columns get the standard event sheet headers; any further
    /// columns are named after their p-field.
    pub fn new(row_count: usize, column_count: usize) -> Self {
        let column_names = (0..column_count)
            .map(|i| match DEFAULT_COLUMN_NAMES.get(i) {
                Some(name) => name.to_string(),
                None => column_name(i),
            })
            .collect();
        Self::with_column_names(row_count, column_names)
    }

    /// Creates an empty grid using the given header labels.
    pub fn with_column_names(row_count: usize, column_names: Vec<String>) -> Self {
        let width = column_names.len();
        Self {
            rows: (0..row_count).map(|_| vec![None; width]).collect(),
            column_names,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Returns the column header labels.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Returns true if `(row, column)` lies inside the grid.
    pub fn contains(&self, row: usize, column: usize) -> bool {
        row < self.row_count() && column < self.column_count()
    }

    /// Returns the cell at a position, if one is present.
    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    /// Returns a mutable reference to the cell at a position, if present.
    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row)?.get_mut(column)?.as_mut()
    }

    /// Returns the text of the cell at a position, if one is present.
    pub fn text(&self, row: usize, column: usize) -> Option<&str> {
        self.cell(row, column).map(|c| c.text.as_str())
    }

    /// Returns the cell at a position, creating an empty one if absent.
    ///
    /// Returns None only if the position is outside the grid.
    pub fn cell_or_insert(&mut self, row: usize, column: usize) -> Option<&mut Cell> {
        let slot = self.rows.get_mut(row)?.get_mut(column)?;
        Some(slot.get_or_insert_with(Cell::default))
    }

    /// Replaces the text of a cell, creating the cell if needed.
    ///
    /// The cell's separator is left untouched.
    pub fn set_text(&mut self, row: usize, column: usize, text: impl Into<String>) -> bool {
        match self.cell_or_insert(row, column) {
            Some(cell) => {
                cell.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Stores a cell at a position, replacing any previous cell.
    pub fn set_cell(&mut self, row: usize, column: usize, cell: Option<Cell>) -> bool {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Removes and returns the cell at a position.
    pub fn take_cell(&mut self, row: usize, column: usize) -> Option<Cell> {
        self.rows.get_mut(row)?.get_mut(column)?.take()
    }

    /// Sets the number of rows, adding empty rows or dropping trailing ones.
    pub fn set_row_count(&mut self, count: usize) {
        let width = self.column_count();
        self.rows.resize_with(count, || vec![None; width]);
    }

    /// Sets the number of columns on every row, keeping headers in sync.
    pub fn set_column_count(&mut self, count: usize) {
        while self.column_names.len() < count {
            let index = self.column_names.len();
            self.column_names.push(column_name(index));
        }
        self.column_names.truncate(count);
        for row in &mut self.rows {
            row.resize(count, None);
        }
    }

    /// Grows the grid so it holds at least the given rows and columns.
    /// Never shrinks.
    pub fn ensure_size(&mut self, row_count: usize, column_count: usize) {
        if self.row_count() < row_count {
            self.set_row_count(row_count);
        }
        if self.column_count() < column_count {
            self.set_column_count(column_count);
        }
    }

    /// Appends an empty row at the bottom.
    pub fn append_row(&mut self) {
        self.set_row_count(self.row_count() + 1);
    }

    /// Appends an empty column named after its p-field.
    pub fn append_column(&mut self) {
        self.set_column_count(self.column_count() + 1);
    }

    /// Removes the last column and its header.
    ///
    /// # Returns
    ///
    /// true if a column was removed
    pub fn delete_last_column(&mut self) -> bool {
        match self.column_count() {
            0 => false,
            n => {
                self.set_column_count(n - 1);
                true
            }
        }
    }

    /// Removes a row, shifting the rows below it up.
    pub fn remove_row(&mut self, row: usize) -> bool {
        if row < self.rows.len() {
            self.rows.remove(row);
            true
        } else {
            false
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLUMN_NAMES.len())
    }
}
