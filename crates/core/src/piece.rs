//! Piece module - one falling tetromino
//!
//! A piece only knows its kind, rotation index and position. It never checks
//! itself against a grid; collision is decided by the board that owns it.

use crate::pieces::{box_size, get_shape, PieceShape, ROTATIONS};
use crate::types::{PieceKind, BOARD_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    /// Always in `0..4`
    pub rotation: usize,
    pub x: i8,
    pub y: i8,
}

impl Piece {
    /// Create a piece at its spawn position: horizontally centered, top row.
    ///
    /// `x = floor(width / 2) - ceil(box / 2)`
    pub fn spawn(kind: PieceKind) -> Self {
        let size = box_size(kind);
        let x = (BOARD_WIDTH / 2) as i8 - size.div_ceil(2) as i8;
        Self {
            kind,
            rotation: 0,
            x,
            y: 0,
        }
    }

    /// Mino offsets of the current rotation
    pub fn shape(&self) -> PieceShape {
        get_shape(self.kind, self.rotation)
    }

    /// Absolute grid coordinates of the four minos
    pub fn cells(&self) -> [(i8, i8); 4] {
        self.shape().map(|(dx, dy)| (self.x + dx, self.y + dy))
    }

    /// Translate without any bounds check
    pub fn move_by(&mut self, dx: i8, dy: i8) {
        self.x += dx;
        self.y += dy;
    }

    /// Step the rotation index by the sign of `direction` (wrapping).
    /// A zero direction leaves the piece unchanged.
    pub fn rotate(&mut self, direction: i8) {
        let step = match direction.signum() {
            1 => 1,
            -1 => ROTATIONS - 1,
            _ => 0,
        };
        self.rotation = (self.rotation + step) % ROTATIONS;
    }

    /// Copy of this piece moved by (dx, dy)
    pub fn moved(&self, dx: i8, dy: i8) -> Self {
        let mut next = *self;
        next.move_by(dx, dy);
        next
    }

    /// Copy of this piece rotated by `direction`
    pub fn rotated(&self, direction: i8) -> Self {
        let mut next = *self;
        next.rotate(direction);
        next
    }
}
