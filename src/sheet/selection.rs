//! Cell selections.
//!
//! A selection is an ordered set of grid coordinates. It need not be
//! rectangular. The enumeration order matters: rotate, shuffle, fill and
//! reverse all walk the selection in this order.

/// An ordered, duplicate-free list of `(row, column)` coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    cells: Vec<(usize, usize)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a selection from coordinates, dropping repeats.
    pub fn from_cells(cells: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut selection = Self::new();
        for (row, column) in cells {
            selection.push(row, column);
        }
        selection
    }

    /// Selects the rectangle spanning two corners, inclusive.
    ///
    /// Cells are enumerated column by column: all of the first column top to
    /// bottom, then the next column.
    pub fn rect(row_a: usize, column_a: usize, row_b: usize, column_b: usize) -> Self {
        let (top, bottom) = (row_a.min(row_b), row_a.max(row_b));
        let (left, right) = (column_a.min(column_b), column_a.max(column_b));
        Self::from_cells((left..=right).flat_map(|c| (top..=bottom).map(move |r| (r, c))))
    }

    /// Selects a single cell.
    pub fn single(row: usize, column: usize) -> Self {
        Self {
            cells: vec![(row, column)],
        }
    }

    /// Adds a coordinate if it is not already selected.
    pub fn push(&mut self, row: usize, column: usize) {
        if !self.contains(row, column) {
            self.cells.push((row, column));
        }
    }

    pub fn contains(&self, row: usize, column: usize) -> bool {
        self.cells.contains(&(row, column))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Returns the coordinates in enumeration order.
    pub fn cells(&self) -> &[(usize, usize)] {
        &self.cells
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().copied()
    }

    /// Returns the distinct selected rows, in order of first appearance.
    pub fn rows(&self) -> Vec<usize> {
        let mut rows = Vec::new();
        for &(row, _) in &self.cells {
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
        rows
    }

    /// Returns the distinct selected columns, in order of first appearance.
    pub fn columns(&self) -> Vec<usize> {
        let mut columns = Vec::new();
        for &(_, column) in &self.cells {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    /// Returns the bounding box as `(min_row, min_column, max_row, max_column)`.
    pub fn bounds(&self) -> Option<(usize, usize, usize, usize)> {
        let first = self.cells.first()?;
        let init = (first.0, first.1, first.0, first.1);
        Some(self.cells.iter().fold(init, |(r0, c0, r1, c1), &(r, c)| {
            (r0.min(r), c0.min(c), r1.max(r), c1.max(c))
        }))
    }

    /// Drops coordinates that fall outside a grid of the given size.
    pub fn retain_within(&mut self, row_count: usize, column_count: usize) {
        self.cells
            .retain(|&(row, column)| row < row_count && column < column_count);
    }
}

impl FromIterator<(usize, usize)> for Selection {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self::from_cells(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_is_column_major() {
        let selection = Selection::rect(1, 2, 0, 1);
        assert_eq!(selection.cells(), &[(0, 1), (1, 1), (0, 2), (1, 2)]);
        assert_eq!(selection.rows(), vec![0, 1]);
        assert_eq!(selection.columns(), vec![1, 2]);
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let selection: Selection = [(0, 0), (1, 0), (0, 0)].into_iter().collect();
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_bounds_of_scattered_selection() {
        let selection = Selection::from_cells([(4, 1), (2, 3), (7, 0)]);
        assert_eq!(selection.bounds(), Some((2, 0, 7, 3)));
        assert_eq!(Selection::new().bounds(), None);
    }

    #[test]
    fn test_retain_within() {
        let mut selection = Selection::rect(0, 0, 3, 1);
        selection.retain_within(2, 1);
        assert_eq!(selection.cells(), &[(0, 0), (1, 0)]);
    }
}
