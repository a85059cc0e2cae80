//! Block rooms (workspace facade crate).
//!
//! Re-exports the member crates under short names and hosts the gateway that
//! connects the TCP adapter to the room registry.

pub use blockrooms_adapter as adapter;
pub use blockrooms_core as core;
pub use blockrooms_engine as engine;
pub use blockrooms_types as types;

pub mod gateway;
