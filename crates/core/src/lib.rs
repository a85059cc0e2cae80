//! Core simulation - pure, deterministic, and testable
//!
//! This crate holds the per-player board simulation and the room-scoped event
//! bus it reports through. It has **no dependencies** on networking, timers or
//! I/O: every state change happens synchronously inside a call, and every side
//! effect is either a return value or an event on the [`TopicBus`].
//!
//! # Module Structure
//!
//! - [`grid`]: 10x20 matrix of locked cells with line clearing
//! - [`pieces`]: rotation tables for the seven tetrominoes
//! - [`piece`]: one falling piece (kind, rotation index, position)
//! - [`piece_queue`]: shared piece sets and the per-board cursor over them
//! - [`rng`]: seeded 7-bag generator that produces piece sets
//! - [`scoring`]: pluggable score and level policy
//! - [`bus`]: closed-topic publish/subscribe bus
//! - [`board`]: movement, rotation, collision, locking, top-out
//!
//! # Example
//!
//! ```
//! use blockrooms_core::{Board, BagGenerator, PieceQueue, PieceSets, TopicBus};
//!
//! let bus = TopicBus::new();
//! let sets = PieceSets::shared();
//! sets.borrow_mut().add_set(BagGenerator::new(42).next_set());
//!
//! let mut board = Board::new(1, PieceQueue::new(sets.clone()), bus.clone());
//! board.start().unwrap();
//! board.move_by(1, 0).unwrap();
//! board.rotate(1);
//! let report = board.hard_drop().unwrap().unwrap();
//! assert!(!report.lock.topped_out);
//! ```

pub mod board;
pub mod bus;
pub mod grid;
pub mod piece;
pub mod piece_queue;
pub mod pieces;
pub mod rng;
pub mod scoring;

pub use blockrooms_types as types;

pub use board::{Board, BoardState, CoreError, DropReport, LockReport, MoveOutcome};
pub use bus::{Event, Subscription, Topic, TopicBus, WeakTopicBus};
pub use grid::{Cell, Grid};
pub use piece::Piece;
pub use piece_queue::{PieceQueue, PieceQueueError, PieceSets, SharedPieceSets};
pub use pieces::{get_shape, PieceShape};
pub use rng::{BagGenerator, SimpleRng};
pub use scoring::{ClassicScoring, ScoringPolicy};
