//! Error types for room orchestration
//!
//! Every variant here is an expected outcome of racing clients, surfaced to
//! the transport layer as a value. `Display` strings are the flash texts sent
//! back to players.

use thiserror::Error;

use crate::types::RoomId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Room is full")]
    RoomFull,

    #[error("Room is closed")]
    RoomClosed,

    #[error("Game already started")]
    MatchInProgress,

    #[error("Already in room")]
    AlreadyJoined,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unable to create game")]
    InvalidGameType(String),

    /// Id generation kept colliding with live rooms.
    #[error("Unable to create game")]
    IdsExhausted,

    #[error("Game not found")]
    GameNotFound(RoomId),

    #[error(transparent)]
    Join(#[from] JoinError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
