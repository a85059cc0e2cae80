//! Room policy configuration.

use std::env;

use crate::types::{
    GameType, DEFAULT_MULTI_MAX_PLAYERS, EMPTY_ROOM_GRACE_MS, INITIAL_PIECE_SETS, PIECE_SET_LEN,
};

/// Policy shared by every room a registry creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// Player cap for multiplayer rooms (single-player rooms always cap at 1)
    pub multi_max_players: usize,
    /// Sets appended before the first spawn
    pub initial_sets: usize,
    /// Pieces per generated set
    pub set_len: usize,
    /// Open rooms left without players this long are disbanded
    pub empty_grace_ms: u64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            multi_max_players: DEFAULT_MULTI_MAX_PLAYERS,
            initial_sets: INITIAL_PIECE_SETS,
            set_len: PIECE_SET_LEN,
            empty_grace_ms: EMPTY_ROOM_GRACE_MS,
        }
    }
}

impl RoomConfig {
    pub fn max_players(&self, game_type: GameType) -> usize {
        match game_type {
            GameType::Single => 1,
            GameType::Multi => self.multi_max_players.max(1),
        }
    }
}

/// Registry-wide settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub room: RoomConfig,
    /// Seeds room ids and every room's piece generator
    pub seed: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            room: RoomConfig::default(),
            seed: 1,
        }
    }
}

impl GameConfig {
    /// Create from environment variables
    ///
    /// - `BLOCKROOMS_MULTI_MAX_PLAYERS`: multiplayer cap (default 2)
    /// - `BLOCKROOMS_EMPTY_ROOM_GRACE_MS`: idle time before an empty room is
    ///   disbanded (default 30000)
    /// - `BLOCKROOMS_SEED`: fixed seed; defaults to the current time
    pub fn from_env() -> Self {
        let multi_max_players = env::var("BLOCKROOMS_MULTI_MAX_PLAYERS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(DEFAULT_MULTI_MAX_PLAYERS);

        let empty_grace_ms = env::var("BLOCKROOMS_EMPTY_ROOM_GRACE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(EMPTY_ROOM_GRACE_MS);

        let seed = env::var("BLOCKROOMS_SEED")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or_else(time_seed);

        Self {
            room: RoomConfig {
                multi_max_players,
                empty_grace_ms,
                ..RoomConfig::default()
            },
            seed,
        }
    }
}

fn time_seed() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
        .unwrap_or(1)
}
