//! Board module - one player's grid and falling piece
//!
//! The board implements movement, rotation, collision, locking and line
//! clearing, and reports what happened on the room's [`TopicBus`]:
//!
//! - `draw` after every accepted move/rotation and after each spawn
//! - `clearLines` when a lock removes rows, then `boardChange` for every lock
//! - `needPieces` once per scarcity transition of its piece cursor
//! - `gameOver` when a fresh piece cannot be placed
//!
//! State machine: `Idle -> Falling -> (Locking -> Falling)* -> ToppedOut`.
//!
//! The board never creates its own piece supply; it reads the room's shared
//! sets through the [`PieceQueue`] cursor it is given.

use thiserror::Error;

use crate::bus::{Event, TopicBus};
use crate::grid::Grid;
use crate::piece::Piece;
use crate::piece_queue::{PieceQueue, PieceQueueError};
use crate::types::{PieceKind, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error(transparent)]
    Queue(#[from] PieceQueueError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardState {
    /// Created, no piece spawned yet
    Idle,
    Falling,
    /// Only observable from handlers running during a lock
    Locking,
    ToppedOut,
}

/// What a lock did to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockReport {
    pub lines_cleared: u32,
    pub topped_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Illegal target or board not falling; nothing changed
    Rejected,
    /// A blocked downward move locked the piece
    Locked(LockReport),
}

/// Result of a hard drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropReport {
    /// Rows travelled before locking
    pub distance: u32,
    pub lock: LockReport,
}

#[derive(Debug)]
pub struct Board {
    player_id: PlayerId,
    grid: Grid,
    active: Option<Piece>,
    queue: PieceQueue,
    bus: TopicBus,
    state: BoardState,
    /// Set count of the store when `needPieces` was last published
    signaled_at_sets: Option<usize>,
    pieces_locked: u32,
}

impl Board {
    pub fn new(player_id: PlayerId, queue: PieceQueue, bus: TopicBus) -> Self {
        Self {
            player_id,
            grid: Grid::new(),
            active: None,
            queue,
            bus,
            state: BoardState::Idle,
            signaled_at_sets: None,
            pieces_locked: 0,
        }
    }

    /// Start from a prepared grid instead of an empty one.
    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.grid = grid;
        self
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn state(&self) -> BoardState {
        self.state
    }

    pub fn is_topped_out(&self) -> bool {
        self.state == BoardState::ToppedOut
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn active(&self) -> Option<Piece> {
        self.active
    }

    pub fn queue(&self) -> &PieceQueue {
        &self.queue
    }

    pub fn pieces_locked(&self) -> u32 {
        self.pieces_locked
    }

    /// Next piece this board will spawn
    pub fn peek_next(&self) -> Option<PieceKind> {
        self.queue.peek(0)
    }

    /// Spawn the first piece. No-op unless the board is idle.
    pub fn start(&mut self) -> Result<(), CoreError> {
        if self.state != BoardState::Idle {
            return Ok(());
        }
        self.spawn_next()?;
        Ok(())
    }

    /// Pull the next kind from the queue and make it the active piece.
    ///
    /// Returns false when the new piece collides at its spawn position; the
    /// board is then topped out.
    pub fn spawn_next(&mut self) -> Result<bool, CoreError> {
        let kind = self.queue.next()?;

        if self.queue.is_almost_empty() {
            let seen = self.queue.set_count();
            if self.signaled_at_sets != Some(seen) {
                self.signaled_at_sets = Some(seen);
                self.bus.publish(&Event::NeedPieces {
                    player_id: self.player_id,
                    sets_seen: seen,
                });
            }
        }

        let piece = Piece::spawn(kind);
        if !self.fits(&piece) {
            self.top_out();
            return Ok(false);
        }

        self.active = Some(piece);
        self.state = BoardState::Falling;
        self.publish_draw();
        Ok(true)
    }

    /// A placement is legal when every mino is in bounds and on an empty cell.
    pub fn fits(&self, piece: &Piece) -> bool {
        piece.cells().iter().all(|&(x, y)| self.grid.is_free(x, y))
    }

    /// Translate the active piece. A blocked downward move locks it instead.
    pub fn move_by(&mut self, dx: i8, dy: i8) -> Result<MoveOutcome, CoreError> {
        let Some(active) = self.falling_piece() else {
            return Ok(MoveOutcome::Rejected);
        };

        let candidate = active.moved(dx, dy);
        if self.fits(&candidate) {
            self.active = Some(candidate);
            self.publish_draw();
            return Ok(MoveOutcome::Moved);
        }

        if dy > 0 {
            return Ok(MoveOutcome::Locked(self.lock()?));
        }
        Ok(MoveOutcome::Rejected)
    }

    /// Rotate the active piece in place; rejected (no kicks) if it collides.
    pub fn rotate(&mut self, direction: i8) -> MoveOutcome {
        let Some(active) = self.falling_piece() else {
            return MoveOutcome::Rejected;
        };
        if direction == 0 {
            return MoveOutcome::Rejected;
        }

        let candidate = active.rotated(direction);
        if !self.fits(&candidate) {
            return MoveOutcome::Rejected;
        }
        self.active = Some(candidate);
        self.publish_draw();
        MoveOutcome::Moved
    }

    /// Drop straight down and lock, as one operation: one lock, at most one
    /// line clear, no intermediate draws.
    pub fn hard_drop(&mut self) -> Result<Option<DropReport>, CoreError> {
        let Some(mut piece) = self.falling_piece() else {
            return Ok(None);
        };

        let mut distance = 0;
        loop {
            let below = piece.moved(0, 1);
            if !self.fits(&below) {
                break;
            }
            piece = below;
            distance += 1;
        }

        self.active = Some(piece);
        let lock = self.lock()?;
        Ok(Some(DropReport { distance, lock }))
    }

    /// Row the active piece would land on
    pub fn ghost_y(&self) -> Option<i8> {
        let mut piece = self.active?;
        while self.fits(&piece.moved(0, 1)) {
            piece.move_by(0, 1);
        }
        Some(piece.y)
    }

    fn falling_piece(&self) -> Option<Piece> {
        if self.state != BoardState::Falling {
            return None;
        }
        self.active
    }

    fn lock(&mut self) -> Result<LockReport, CoreError> {
        let Some(piece) = self.active.take() else {
            return Ok(LockReport::default());
        };
        self.state = BoardState::Locking;

        let written = self.grid.lock_cells(&piece.cells(), piece.kind);
        debug_assert!(written, "active piece must fit where it locks");
        self.pieces_locked += 1;

        let cleared = self.grid.clear_full_rows().len() as u32;
        if cleared > 0 {
            self.bus.publish(&Event::ClearLines {
                player_id: self.player_id,
                count: cleared,
            });
        }
        self.bus.publish(&Event::BoardChange {
            player_id: self.player_id,
            grid: self.grid.rows(),
        });

        let placed = self.spawn_next()?;
        Ok(LockReport {
            lines_cleared: cleared,
            topped_out: !placed,
        })
    }

    fn top_out(&mut self) {
        self.active = None;
        self.state = BoardState::ToppedOut;
        self.bus.publish(&Event::GameOver {
            player_id: self.player_id,
            grid: self.grid.rows(),
        });
    }

    fn publish_draw(&self) {
        let Some(piece) = self.active else {
            return;
        };
        self.bus.publish(&Event::Draw {
            player_id: self.player_id,
            piece,
            ghost_y: self.ghost_y().unwrap_or(piece.y),
            next: self.peek_next(),
        });
    }
}
