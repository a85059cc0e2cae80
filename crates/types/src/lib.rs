//! Shared types module - vocabulary used by every layer of the game server
//!
//! This crate defines the fundamental types exchanged between the simulation,
//! the room orchestration and the transport adapter. All types are plain data
//! with no external dependencies.
//!
//! # Board Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9)
//! - **Height**: 20 rows (indexed 0-19, row 0 at the top)
//!
//! # Piece Ids
//!
//! Grid cells are serialized as `u8`: `0` is empty and `1..=7` identify the
//! piece kind that was locked there.
//!
//! | Id | Kind |
//! |----|------|
//! | 1 | I |
//! | 2 | J |
//! | 3 | L |
//! | 4 | O |
//! | 5 | S |
//! | 6 | T |
//! | 7 | Z |
//!
//! # Examples
//!
//! ```
//! use blockrooms_types::{Command, GameType, PieceKind, BOARD_WIDTH};
//!
//! assert_eq!(PieceKind::from_id(6), Some(PieceKind::T));
//! assert_eq!(PieceKind::T.id(), 6);
//! assert_eq!(GameType::from_str("multi"), Some(GameType::Multi));
//! assert_eq!(Command::from_str("HARD_DROP"), Some(Command::HardDrop));
//! assert_eq!(BOARD_WIDTH, 10);
//! ```

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Board width as a `usize`, for array lengths
pub const BOARD_COLS: usize = BOARD_WIDTH as usize;

/// Board height as a `usize`, for array lengths
pub const BOARD_ROWS: usize = BOARD_HEIGHT as usize;

/// Game loop interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Number of pieces in one generated set (five shuffled 7-bags)
pub const PIECE_SET_LEN: usize = 35;

/// A queue whose cursor sits in its last set with this many pieces or fewer
/// left is "almost empty" and asks for replenishment.
pub const ALMOST_EMPTY_THRESHOLD: usize = 15;

/// Sets appended to a room's piece store before the first spawn
pub const INITIAL_PIECE_SETS: usize = 2;

/// Default player cap for multiplayer rooms
pub const DEFAULT_MULTI_MAX_PLAYERS: usize = 2;

/// How long an open room may sit with no players before it is disbanded
pub const EMPTY_ROOM_GRACE_MS: u64 = 30_000;

/// Gravity intervals by level (milliseconds per row)
///
/// Index 0 = Level 0, Index 8 = Level 8+
pub const DROP_INTERVALS: [u32; 9] = [1000, 800, 650, 500, 400, 320, 250, 200, 160];

/// Absolute minimum drop interval (100ms)
pub const DROP_INTERVAL_MIN_MS: u32 = 100;

/// Line clear scoring table (Classic Nintendo scoring)
///
/// Base points for clearing N lines at level 0. Points are multiplied by
/// (level + 1).
pub const LINE_SCORES: [u32; 5] = [0, 40, 100, 300, 1200];

/// Identifies a player (one connection) across the whole server
pub type PlayerId = u64;

/// Identifies a game room in the registry
pub type RoomId = String;

/// Serialized grid: one `u8` per cell, row-major, row 0 at the top
pub type GridRows = [[u8; BOARD_COLS]; BOARD_ROWS];

/// The seven tetromino piece kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl PieceKind {
    /// All kinds in id order; the contents of one 7-bag.
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::J,
        PieceKind::L,
        PieceKind::O,
        PieceKind::S,
        PieceKind::T,
        PieceKind::Z,
    ];

    /// Grid value written when this kind locks (`1..=7`)
    pub fn id(&self) -> u8 {
        match self {
            PieceKind::I => 1,
            PieceKind::J => 2,
            PieceKind::L => 3,
            PieceKind::O => 4,
            PieceKind::S => 5,
            PieceKind::T => 6,
            PieceKind::Z => 7,
        }
    }

    /// Inverse of [`PieceKind::id`]
    ///
    /// ```
    /// use blockrooms_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_id(1), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_id(0), None);
    /// assert_eq!(PieceKind::from_id(8), None);
    /// ```
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1..=7 => Some(Self::ALL[(id - 1) as usize]),
            _ => None,
        }
    }

    /// Single-letter name, lowercase
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "i",
            PieceKind::J => "j",
            PieceKind::L => "l",
            PieceKind::O => "o",
            PieceKind::S => "s",
            PieceKind::T => "t",
            PieceKind::Z => "z",
        }
    }
}

/// Room flavor; decides the player cap and how the match is summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameType {
    Single,
    Multi,
}

impl GameType {
    /// Parse a game type as sent by clients (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" => Some(GameType::Single),
            "multi" => Some(GameType::Multi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Single => "single",
            GameType::Multi => "multi",
        }
    }
}

/// Input commands a client can send inside `executeCommands`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Move piece one cell left
    Left,
    /// Move piece one cell right
    Right,
    /// Soft drop one row (scores one point per row)
    Down,
    /// Rotate counter-clockwise
    RotateLeft,
    /// Rotate clockwise
    RotateRight,
    /// Drop to the floor and lock
    HardDrop,
    /// Gravity step; same movement as `Down` without drop points
    AutoDown,
}

impl Command {
    /// Parse a wire command id
    ///
    /// ```
    /// use blockrooms_types::Command;
    ///
    /// assert_eq!(Command::from_str("LEFT"), Some(Command::Left));
    /// assert_eq!(Command::from_str("ROTATE_RIGHT"), Some(Command::RotateRight));
    /// assert_eq!(Command::from_str("TELEPORT"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LEFT" => Some(Command::Left),
            "RIGHT" => Some(Command::Right),
            "DOWN" => Some(Command::Down),
            "ROTATE_LEFT" => Some(Command::RotateLeft),
            "ROTATE_RIGHT" => Some(Command::RotateRight),
            "HARD_DROP" => Some(Command::HardDrop),
            "AUTO_DOWN" => Some(Command::AutoDown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Left => "LEFT",
            Command::Right => "RIGHT",
            Command::Down => "DOWN",
            Command::RotateLeft => "ROTATE_LEFT",
            Command::RotateRight => "ROTATE_RIGHT",
            Command::HardDrop => "HARD_DROP",
            Command::AutoDown => "AUTO_DOWN",
        }
    }
}

/// Per-player progress counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerStats {
    pub score: u32,
    pub level: u32,
    pub lines: u32,
}

/// One row of a finished match's ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    /// 1-based finishing place
    pub place: u32,
    pub player_id: PlayerId,
    pub stats: PlayerStats,
}

/// Final result of a room's match
///
/// Multiplayer standings are ordered by place (last board standing first).
/// A single-player summary holds one standing with the final stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    pub game_type: GameType,
    pub standings: Vec<Standing>,
}

impl MatchSummary {
    pub fn winner(&self) -> Option<PlayerId> {
        self.standings
            .iter()
            .find(|s| s.place == 1)
            .map(|s| s.player_id)
    }
}

/// Drop interval for a level (milliseconds per row)
///
/// ```
/// use blockrooms_types::drop_interval_ms;
///
/// assert_eq!(drop_interval_ms(0), 1000);
/// assert_eq!(drop_interval_ms(8), 160);
/// assert_eq!(drop_interval_ms(30), 100);
/// ```
pub fn drop_interval_ms(level: u32) -> u32 {
    let idx = level as usize;
    if idx < DROP_INTERVALS.len() {
        return DROP_INTERVALS[idx];
    }
    let over = (level - (DROP_INTERVALS.len() as u32 - 1)).saturating_mul(10);
    DROP_INTERVALS[DROP_INTERVALS.len() - 1]
        .saturating_sub(over)
        .max(DROP_INTERVAL_MIN_MS)
}
