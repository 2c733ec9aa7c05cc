use crate::spreadsheet::cell::Cell;
use std::collections::HashMap;
use std::ops::Range;

/// A worksheet held as a sparse grid of cells with 0-based coordinates.
#[derive(Debug)]
pub struct Sheet {
    /// Sheet name
    pub name: String,
    /// All cells in the sheet, row-major
    pub cells: Vec<Cell>,
    /// Index mapping from (row, col) to cell vector position
    indexes: HashMap<(usize, usize), usize>,
    /// Last populated row and column
    pub row_upper_bound: Option<usize>,
    pub col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            indexes: HashMap::new(),
            row_upper_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet contains no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Adds a cell, replacing any earlier cell at the same position.
    pub(crate) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        match self.indexes.get(&(cell.row, cell.col)) {
            Some(index) => self.cells[*index] = cell,
            None => {
                self.indexes.insert((cell.row, cell.col), self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_upper_bound.map(|row_upper_bound| row_upper_bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Row indexes from the first row of the sheet up to the last populated one.
    pub fn rows(&self) -> Range<usize> {
        0..self.row_upper_bound.map(|row| row + 1).unwrap_or(0)
    }

    /// Gets the cell at (row, col), if one was stored.
    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.indexes.get(&(row, col)).and_then(|index| self.cells.get(*index))
    }

    /// Formatted text of a cell, empty when absent.
    pub fn text(&self, row: usize, col: usize) -> String {
        self.get(row, col).map(Cell::text).unwrap_or_default()
    }

    /// Formatted texts of a row from column A to the last populated column.
    pub fn row_texts(&self, row: usize) -> Vec<String> {
        let width = self.col_upper_bound.map(|col| col + 1).unwrap_or(0);
        (0..width).map(|col| self.text(row, col)).collect()
    }

    /// True when no cell of the row holds a visible value.
    pub fn is_blank_row(&self, row: usize) -> bool {
        let width = self.col_upper_bound.map(|col| col + 1).unwrap_or(0);
        (0..width).all(|col| self.get(row, col).map(Cell::is_blank).unwrap_or(true))
    }
}
