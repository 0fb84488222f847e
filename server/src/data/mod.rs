use std::ops::{Index, IndexMut};

use minesweeper_common::models::{CellValue, Pos};

/// Row-major rows×cols grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

pub type Field = Grid<CellValue>;
pub type Mask = Grid<bool>;

impl<T: Clone> Grid<T> {
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            rows,
            cols,
            cells: vec![value; rows * cols],
        }
    }

    /// Nested rows, the shape the browser expects.
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        if self.cols == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.cols).map(<[T]>::to_vec).collect()
    }
}

impl<T> Grid<T> {
    pub fn from_cells(rows: usize, cols: usize, cells: Vec<T>) -> Self {
        debug_assert_eq!(cells.len(), rows * cols);
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    pub fn get(&self, pos: Pos) -> Option<&T> {
        if self.contains(pos) {
            self.cells.get(pos.row * self.cols + pos.col)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pos, &T)> {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (Pos::new(i / cols, i % cols), cell))
    }

    pub fn count(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        self.cells.iter().filter(|cell| predicate(*cell)).count()
    }
}

impl<T> Index<Pos> for Grid<T> {
    type Output = T;

    fn index(&self, pos: Pos) -> &T {
        assert!(self.contains(pos), "({}, {}) outside grid", pos.row, pos.col);
        &self.cells[pos.row * self.cols + pos.col]
    }
}

impl<T> IndexMut<Pos> for Grid<T> {
    fn index_mut(&mut self, pos: Pos) -> &mut T {
        assert!(self.contains(pos), "({}, {}) outside grid", pos.row, pos.col);
        &mut self.cells[pos.row * self.cols + pos.col]
    }
}

/// The up-to-8 cells around `pos`, clamped to the grid, in row-major order.
pub fn neighbors(pos: Pos, rows: usize, cols: usize) -> impl Iterator<Item = Pos> {
    let row_end = (pos.row + 2).min(rows);
    let col_start = pos.col.saturating_sub(1);
    let col_end = (pos.col + 2).min(cols);

    (pos.row.saturating_sub(1)..row_end)
        .flat_map(move |row| (col_start..col_end).map(move |col| Pos::new(row, col)))
        .filter(move |other| *other != pos)
}
