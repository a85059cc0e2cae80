//! Pieces module - tetromino rotation tables
//!
//! Every kind has four rotation states. Each state lists the four mino
//! offsets inside the kind's bounding box (3x3 for J, L, S, T, Z; 4x4 for I;
//! 2x2 for O). The tables are fixed; pieces only pick an index into them.

use crate::types::PieceKind;

/// Offset of a single mino relative to the piece origin (top-left of its box)
pub type MinoOffset = (i8, i8);

/// Shape of a piece - 4 mino offsets from piece origin
pub type PieceShape = [MinoOffset; 4];

/// Rotation states per kind
pub const ROTATIONS: usize = 4;

/// Side length of the kind's bounding box
pub fn box_size(kind: PieceKind) -> u8 {
    match kind {
        PieceKind::I => 4,
        PieceKind::O => 2,
        _ => 3,
    }
}

/// Get the shape for a piece kind and rotation index (taken modulo 4)
pub fn get_shape(kind: PieceKind, rotation: usize) -> PieceShape {
    rotation_table(kind)[rotation % ROTATIONS]
}

/// The full rotation table of a kind
pub fn rotation_table(kind: PieceKind) -> &'static [PieceShape; ROTATIONS] {
    match kind {
        PieceKind::I => &I_SHAPES,
        PieceKind::J => &J_SHAPES,
        PieceKind::L => &L_SHAPES,
        PieceKind::O => &O_SHAPES,
        PieceKind::S => &S_SHAPES,
        PieceKind::T => &T_SHAPES,
        PieceKind::Z => &Z_SHAPES,
    }
}

const I_SHAPES: [PieceShape; ROTATIONS] = [
    [(0, 1), (1, 1), (2, 1), (3, 1)],
    [(2, 0), (2, 1), (2, 2), (2, 3)],
    [(0, 2), (1, 2), (2, 2), (3, 2)],
    [(1, 0), (1, 1), (1, 2), (1, 3)],
];

const J_SHAPES: [PieceShape; ROTATIONS] = [
    [(0, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (2, 0), (1, 1), (1, 2)],
    [(0, 1), (1, 1), (2, 1), (2, 2)],
    [(1, 0), (1, 1), (0, 2), (1, 2)],
];

const L_SHAPES: [PieceShape; ROTATIONS] = [
    [(2, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (1, 1), (1, 2), (2, 2)],
    [(0, 1), (1, 1), (2, 1), (0, 2)],
    [(0, 0), (1, 0), (1, 1), (1, 2)],
];

// O looks the same in every state
const O_SHAPES: [PieceShape; ROTATIONS] = [[(0, 0), (1, 0), (0, 1), (1, 1)]; ROTATIONS];

const S_SHAPES: [PieceShape; ROTATIONS] = [
    [(1, 0), (2, 0), (0, 1), (1, 1)],
    [(1, 0), (1, 1), (2, 1), (2, 2)],
    [(1, 1), (2, 1), (0, 2), (1, 2)],
    [(0, 0), (0, 1), (1, 1), (1, 2)],
];

const T_SHAPES: [PieceShape; ROTATIONS] = [
    [(1, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (1, 1), (2, 1), (1, 2)],
    [(0, 1), (1, 1), (2, 1), (1, 2)],
    [(1, 0), (0, 1), (1, 1), (1, 2)],
];

const Z_SHAPES: [PieceShape; ROTATIONS] = [
    [(0, 0), (1, 0), (1, 1), (2, 1)],
    [(2, 0), (1, 1), (2, 1), (1, 2)],
    [(0, 1), (1, 1), (1, 2), (2, 2)],
    [(1, 0), (0, 1), (1, 1), (0, 2)],
];
