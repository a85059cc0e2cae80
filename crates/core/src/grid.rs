//! Grid module - the fixed-size matrix of locked cells
//!
//! The grid is a 10x20 matrix where each cell is empty or holds the kind of the
//! piece that locked there. Uses a flat array for cache locality and zero
//! allocation. Coordinates: (x, y) where x ranges 0..9 (left to right), y
//! ranges 0..19 (top to bottom). Dimensions never change after creation.

use arrayvec::ArrayVec;

use crate::types::{GridRows, PieceKind, BOARD_COLS, BOARD_HEIGHT, BOARD_ROWS, BOARD_WIDTH};

/// A cell: `None` is empty, `Some(kind)` is a locked mino.
pub type Cell = Option<PieceKind>;

/// Total number of cells on the grid
const GRID_SIZE: usize = BOARD_COLS * BOARD_ROWS;

/// Rows removed by one clear, sorted bottom to top
pub type ClearedRows = ArrayVec<usize, BOARD_ROWS>;

/// The playfield - 10 columns x 20 rows using flat array storage
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; GRID_SIZE],
}

impl Grid {
    /// Create a new empty grid
    pub fn new() -> Self {
        Self {
            cells: [None; GRID_SIZE],
        }
    }

    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * BOARD_COLS + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// In bounds and empty
    pub fn is_free(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(None))
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= BOARD_ROWS {
            return false;
        }
        let start = y * BOARD_COLS;
        self.cells[start..start + BOARD_COLS]
            .iter()
            .all(|cell| cell.is_some())
    }

    /// Remove every full row and return their indices (sorted bottom to top).
    ///
    /// Surviving rows keep their relative order and slide down; one empty row
    /// enters at the top for each removed row, so the height is unchanged.
    pub fn clear_full_rows(&mut self) -> ClearedRows {
        let mut cleared_rows = ClearedRows::new();
        let mut write_y = BOARD_ROWS;

        for read_y in (0..BOARD_ROWS).rev() {
            if self.is_row_full(read_y) {
                cleared_rows.push(read_y);
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src_start = read_y * BOARD_COLS;
                    self.cells
                        .copy_within(src_start..src_start + BOARD_COLS, write_y * BOARD_COLS);
                }
            }
        }

        for cell in &mut self.cells[..write_y * BOARD_COLS] {
            *cell = None;
        }

        cleared_rows
    }

    /// Write the given minos into the grid.
    ///
    /// Returns false without writing anything if any mino is out of bounds or
    /// lands on an occupied cell.
    pub fn lock_cells(&mut self, minos: &[(i8, i8)], kind: PieceKind) -> bool {
        if !minos.iter().all(|&(x, y)| self.is_free(x, y)) {
            return false;
        }
        for &(x, y) in minos {
            self.set(x, y, Some(kind));
        }
        true
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Clear the entire grid
    pub fn clear(&mut self) {
        self.cells = [None; GRID_SIZE];
    }

    /// Serialize as `u8` rows (`0` empty, `1..=7` piece ids).
    pub fn write_rows(&self, out: &mut GridRows) {
        for (y, row) in out.iter_mut().enumerate() {
            let start = y * BOARD_COLS;
            for (x, value) in row.iter_mut().enumerate() {
                *value = self.cells[start + x].map_or(0, |kind| kind.id());
            }
        }
    }

    pub fn rows(&self) -> GridRows {
        let mut out = [[0u8; BOARD_COLS]; BOARD_ROWS];
        self.write_rows(&mut out);
        out
    }

    /// Build a grid from `u8` rows; unknown ids are read as empty.
    pub fn from_rows(rows: &GridRows) -> Self {
        let mut grid = Self::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                grid.cells[y * BOARD_COLS + x] = PieceKind::from_id(value);
            }
        }
        grid
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_index_calculation() {
        assert_eq!(Grid::index(0, 0), Some(0));
        assert_eq!(Grid::index(9, 0), Some(9));
        assert_eq!(Grid::index(0, 1), Some(10));
        assert_eq!(Grid::index(9, 19), Some(199));
        assert_eq!(Grid::index(-1, 0), None);
        assert_eq!(Grid::index(10, 0), None);
        assert_eq!(Grid::index(0, 20), None);
    }

    #[test]
    fn test_clear_keeps_relative_order_of_survivors() {
        let mut grid = Grid::new();
        for x in 0..10 {
            grid.set(x, 19, Some(PieceKind::I));
            grid.set(x, 17, Some(PieceKind::J));
        }
        grid.set(0, 18, Some(PieceKind::T));
        grid.set(4, 16, Some(PieceKind::S));

        let cleared = grid.clear_full_rows();
        assert_eq!(cleared.as_slice(), &[19, 17]);

        assert_eq!(grid.get(0, 19), Some(Some(PieceKind::T)));
        assert_eq!(grid.get(4, 18), Some(Some(PieceKind::S)));
        assert!(grid.cells()[..18 * BOARD_COLS].iter().all(|c| c.is_none()));
    }

    #[test]
    fn test_clear_handles_more_than_four_rows() {
        let mut grid = Grid::new();
        for y in 10..20 {
            for x in 0..10 {
                grid.set(x, y, Some(PieceKind::O));
            }
        }
        let cleared = grid.clear_full_rows();
        assert_eq!(cleared.len(), 10);
        assert!(grid.cells().iter().all(|c| c.is_none()));
    }

    #[test]
    fn test_lock_cells_is_all_or_nothing() {
        let mut grid = Grid::new();
        grid.set(5, 5, Some(PieceKind::Z));
        let before = grid.clone();

        assert!(!grid.lock_cells(&[(4, 5), (5, 5)], PieceKind::T));
        assert_eq!(grid, before);

        assert!(!grid.lock_cells(&[(9, 0), (10, 0)], PieceKind::T));
        assert_eq!(grid, before);

        assert!(grid.lock_cells(&[(0, 0), (1, 0)], PieceKind::T));
        assert_eq!(grid.get(1, 0), Some(Some(PieceKind::T)));
    }

    #[test]
    fn test_rows_round_trip() {
        let mut grid = Grid::new();
        grid.set(3, 7, Some(PieceKind::L));
        grid.set(9, 19, Some(PieceKind::Z));

        let rows = grid.rows();
        assert_eq!(rows[7][3], 3);
        assert_eq!(rows[19][9], 7);
        assert_eq!(Grid::from_rows(&rows), grid);
    }
}
