//! Adapter module - game clients over a TCP socket with a JSON protocol
//!
//! This crate is the transport collaborator of the room engine: it owns the
//! sockets, turns client lines into [`ClientRequest`]s for the game loop, and
//! delivers the lines the game loop produces from room events.
//!
//! # Protocol Overview
//!
//! **Line-delimited JSON** over TCP. Every message is an envelope:
//!
//! ```text
//! {"type": "<name>", "data": <payload>}
//! ```
//!
//! ## Client → Server
//!
//! - **createGame** `{gameType: "single" | "multi"}`
//! - **joinGame** `{id}`
//! - **leaveGame**, **play** (no data)
//! - **executeCommands** `["LEFT", "ROTATE_RIGHT", "HARD_DROP", ...]`
//!
//! ## Server → Client
//!
//! - **gameCreated**, **joinedGame**: replies to room requests
//! - **addPlayer**, **removePlayer**, **startGame**
//! - **draw**, **boardChange**, **clearLines**, **updateScore**
//! - **needPieces**, **piecesAdded**
//! - **gameOver**: one board (`{id, grid}`) or the whole room (`{id, ranking}`)
//! - **addMessage**: flash notice such as "Game not found"
//!
//! # Environment Variables
//!
//! - `BLOCKROOMS_HOST`: Bind address (default: "127.0.0.1")
//! - `BLOCKROOMS_PORT`: Port number (default: 7878)
//! - `BLOCKROOMS_MAX_PENDING`: Inbound queue capacity (default: 64)
//!
//! # Testing
//!
//! ```bash
//! nc 127.0.0.1 7878
//! {"type":"createGame","data":{"gameType":"single"}}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use blockrooms_core as core;
pub use blockrooms_types as types;

pub use protocol::{encode_event, parse_message, ClientRequest, ParsedMessage};
pub use runtime::{Adapter, ClientId, InboundCommand, OutboundMessage};
pub use server::{run_server, ServerConfig};
