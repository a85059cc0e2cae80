//! Game session - one connected player bound to one board
//!
//! The session turns client commands and gravity ticks into board calls,
//! keeps the player's score/level/lines, and publishes `updateScore` when
//! they change.

use std::rc::Rc;

use tracing::debug;

use crate::core::{Board, CoreError, Event, LockReport, MoveOutcome, ScoringPolicy, TopicBus};
use crate::types::{drop_interval_ms, Command, PlayerId, PlayerStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Joined, match not started
    Waiting,
    Playing,
    /// Board topped out
    Over,
}

pub struct GameSession {
    id: PlayerId,
    is_host: bool,
    ready: bool,
    board: Board,
    stats: PlayerStats,
    status: GameStatus,
    last_fall_ms: u64,
    bus: TopicBus,
    scoring: Rc<dyn ScoringPolicy>,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("is_host", &self.is_host)
            .field("ready", &self.ready)
            .field("stats", &self.stats)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl GameSession {
    pub fn new(id: PlayerId, board: Board, bus: TopicBus, scoring: Rc<dyn ScoringPolicy>) -> Self {
        Self {
            id,
            is_host: false,
            ready: false,
            board,
            stats: PlayerStats::default(),
            status: GameStatus::Waiting,
            last_fall_ms: 0,
            bus,
            scoring,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn set_host(&mut self, host: bool) {
        self.is_host = host;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn stats(&self) -> PlayerStats {
        self.stats
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Record the player's `play` signal. Returns false if already ready.
    pub fn mark_ready(&mut self) -> bool {
        let was_ready = self.ready;
        self.ready = true;
        !was_ready
    }

    /// Spawn the first piece and start the gravity clock.
    pub fn start(&mut self, now_ms: u64) -> Result<(), CoreError> {
        if self.status != GameStatus::Waiting {
            return Ok(());
        }
        self.status = GameStatus::Playing;
        self.last_fall_ms = now_ms;
        self.board.start()?;
        if self.board.is_topped_out() {
            self.status = GameStatus::Over;
        }
        Ok(())
    }

    /// Apply commands in order; the rest of the batch is dropped once the
    /// board tops out.
    pub fn execute_commands(&mut self, commands: &[Command], now_ms: u64) -> Result<(), CoreError> {
        for &command in commands {
            if self.status != GameStatus::Playing {
                debug!(player = self.id, ?command, "command ignored, session not playing");
                break;
            }
            self.execute(command, now_ms)?;
        }
        Ok(())
    }

    /// Apply one command. Returns false if it changed nothing.
    pub fn execute(&mut self, command: Command, now_ms: u64) -> Result<bool, CoreError> {
        if self.status != GameStatus::Playing {
            return Ok(false);
        }

        let before = self.stats;
        let outcome = match command {
            Command::Left => self.board.move_by(-1, 0)?,
            Command::Right => self.board.move_by(1, 0)?,
            Command::RotateLeft => self.board.rotate(-1),
            Command::RotateRight => self.board.rotate(1),
            Command::Down => {
                let outcome = self.board.move_by(0, 1)?;
                if outcome == MoveOutcome::Moved {
                    self.stats.score += self.scoring.drop_points(1, false);
                }
                outcome
            }
            Command::AutoDown => {
                self.last_fall_ms = now_ms;
                self.board.move_by(0, 1)?
            }
            Command::HardDrop => match self.board.hard_drop()? {
                Some(drop) => {
                    self.stats.score += self.scoring.drop_points(drop.distance, true);
                    MoveOutcome::Locked(drop.lock)
                }
                None => MoveOutcome::Rejected,
            },
        };

        if let MoveOutcome::Locked(report) = outcome {
            self.apply_lock(report);
        }
        if self.stats != before {
            self.bus.publish(&Event::UpdateScore {
                player_id: self.id,
                stats: self.stats,
            });
        }
        Ok(outcome != MoveOutcome::Rejected)
    }

    /// Gravity: one `AUTO_DOWN` once the level's interval has elapsed.
    /// Returns whether a step was taken.
    pub fn advance(&mut self, now_ms: u64) -> Result<bool, CoreError> {
        if self.status != GameStatus::Playing {
            return Ok(false);
        }
        let interval = drop_interval_ms(self.stats.level) as u64;
        if now_ms.saturating_sub(self.last_fall_ms) < interval {
            return Ok(false);
        }
        self.execute(Command::AutoDown, now_ms)?;
        Ok(true)
    }

    fn apply_lock(&mut self, report: LockReport) {
        if report.lines_cleared > 0 {
            self.stats.lines += report.lines_cleared;
            self.stats.level = self.scoring.level_for(self.stats.lines);
            self.stats.score += self
                .scoring
                .line_clear_points(report.lines_cleared, self.stats.level);
        }
        if report.topped_out {
            self.status = GameStatus::Over;
        }
    }
}
