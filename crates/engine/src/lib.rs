//! Room orchestration on top of the core simulation
//!
//! - [`PlayerManager`]: ordered roster of a room's sessions
//! - [`GameSession`]: one player's board, stats and gravity clock
//! - [`PieceFeeder`]: answers `needPieces` by appending generated sets
//! - [`GameRoom`]: join/ready/start/leave and the final ranking
//! - [`Registry`]: id -> room map, owned by the game loop
//!
//! Everything here is single-threaded; a room and its bus never leave the
//! thread that created them.

pub mod config;
pub mod error;
pub mod feeder;
pub mod player_manager;
pub mod registry;
pub mod room;
pub mod session;

pub use blockrooms_core as core;
pub use blockrooms_types as types;

pub use config::{GameConfig, RoomConfig};
pub use error::{JoinError, RegistryError};
pub use feeder::PieceFeeder;
pub use player_manager::PlayerManager;
pub use registry::Registry;
pub use room::{GameRoom, RemovalCallback, RoomStatus};
pub use session::{GameSession, GameStatus};
