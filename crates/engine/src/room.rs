//! Game room - one match, its players and its bus
//!
//! A room owns the bus every component of the match talks through, the
//! shared piece store, the feeder that refills it, and one session per
//! player. Room state machine: `Open -> Active -> Closed`.
//!
//! Board-level game overs arrive on the bus while a session call is still on
//! the stack, so the room only queues them there and folds them into the
//! ranking in [`GameRoom::settle`] once the call has returned.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::config::RoomConfig;
use crate::core::{
    BagGenerator, Board, CoreError, Event, PieceQueue, PieceSets, ScoringPolicy,
    SharedPieceSets, Subscription, Topic, TopicBus,
};
use crate::error::JoinError;
use crate::feeder::PieceFeeder;
use crate::player_manager::PlayerManager;
use crate::session::{GameSession, GameStatus};
use crate::types::{Command, GameType, MatchSummary, PlayerId, PlayerStats, RoomId, Standing};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    /// Accepting joins
    Open,
    /// Match running
    Active,
    /// Finished or disbanded; waiting to be reaped
    Closed,
}

/// Invoked once when the room closes, with the room's id.
pub type RemovalCallback = Box<dyn FnMut(&RoomId)>;

pub struct GameRoom {
    id: RoomId,
    game_type: GameType,
    max_players: usize,
    status: RoomStatus,
    players: PlayerManager,
    bus: TopicBus,
    sets: SharedPieceSets,
    feeder: PieceFeeder,
    scoring: Rc<dyn ScoringPolicy>,
    subscriptions: Vec<Subscription>,
    /// Game overs seen on the bus, not yet folded in
    topped_out: Rc<RefCell<Vec<PlayerId>>>,
    /// Elimination order, first out first
    eliminated: Vec<(PlayerId, PlayerStats)>,
    summary: Option<MatchSummary>,
    on_remove: Option<RemovalCallback>,
}

impl GameRoom {
    pub fn new(
        id: RoomId,
        game_type: GameType,
        config: &RoomConfig,
        seed: u32,
        scoring: Rc<dyn ScoringPolicy>,
    ) -> Self {
        let bus = TopicBus::new();
        let sets = PieceSets::shared();
        let feeder = PieceFeeder::new(
            Rc::clone(&sets),
            BagGenerator::with_set_len(seed, config.set_len),
            &bus,
        );

        let topped_out = Rc::new(RefCell::new(Vec::new()));
        let inbox = Rc::clone(&topped_out);
        let subscriptions = vec![
            feeder.subscribe(&bus),
            bus.subscribe(Topic::GameOver, move |event| {
                if let Event::GameOver { player_id, .. } = event {
                    inbox.borrow_mut().push(*player_id);
                }
            }),
        ];

        for _ in 0..config.initial_sets {
            feeder.add_set();
        }

        Self {
            id,
            game_type,
            max_players: config.max_players(game_type),
            status: RoomStatus::Open,
            players: PlayerManager::new(),
            bus,
            sets,
            feeder,
            scoring,
            subscriptions,
            topped_out,
            eliminated: Vec::new(),
            summary: None,
            on_remove: None,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn players(&self) -> &PlayerManager {
        &self.players
    }

    /// The room's bus; outside observers subscribe here.
    pub fn bus(&self) -> &TopicBus {
        &self.bus
    }

    pub fn piece_sets(&self) -> usize {
        self.sets.borrow().len()
    }

    pub fn feeder(&self) -> &PieceFeeder {
        &self.feeder
    }

    /// Final ranking, once the match has finished
    pub fn summary(&self) -> Option<&MatchSummary> {
        self.summary.as_ref()
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.players.list().iter().find(|p| p.is_host()).map(GameSession::id)
    }

    pub fn set_on_remove(&mut self, callback: RemovalCallback) {
        self.on_remove = Some(callback);
    }

    /// Add a player with a fresh board on the room's shared pieces.
    /// Returns whether the player became host.
    pub fn join(&mut self, player_id: PlayerId) -> Result<bool, JoinError> {
        let rejected = match self.status {
            RoomStatus::Closed => Some(JoinError::RoomClosed),
            RoomStatus::Active => Some(JoinError::MatchInProgress),
            RoomStatus::Open if self.players.contains(player_id) => Some(JoinError::AlreadyJoined),
            RoomStatus::Open if self.players.count() >= self.max_players => {
                Some(JoinError::RoomFull)
            }
            RoomStatus::Open => None,
        };
        if let Some(err) = rejected {
            warn!(room = %self.id, player = player_id, %err, "join rejected");
            self.bus.publish(&Event::AddMessage {
                player_id: Some(player_id),
                text: err.to_string(),
            });
            return Err(err);
        }

        let queue = PieceQueue::new(Rc::clone(&self.sets));
        let board = Board::new(player_id, queue, self.bus.clone());
        let mut session =
            GameSession::new(player_id, board, self.bus.clone(), Rc::clone(&self.scoring));
        let host = self.players.is_empty();
        session.set_host(host);
        self.players.add(session);

        info!(room = %self.id, player = player_id, host, "player joined");
        self.bus.publish(&Event::AddPlayer { player_id, host });
        Ok(host)
    }

    /// A player's `play` signal. The match starts once every player in the
    /// room is ready. Returns whether this call started it.
    pub fn ready(&mut self, player_id: PlayerId, now_ms: u64) -> Result<bool, CoreError> {
        if self.status != RoomStatus::Open {
            return Ok(false);
        }
        let Some(session) = self.players.get_by_id_mut(player_id) else {
            return Ok(false);
        };
        session.mark_ready();

        if self.players.list().iter().all(GameSession::is_ready) {
            return self.start(now_ms);
        }
        Ok(false)
    }

    /// `Open -> Active`: spawn every board's first piece. No-op otherwise.
    pub fn start(&mut self, now_ms: u64) -> Result<bool, CoreError> {
        if self.status != RoomStatus::Open || self.players.is_empty() {
            return Ok(false);
        }
        self.status = RoomStatus::Active;
        info!(room = %self.id, players = self.players.count(), "match started");
        self.bus.publish(&Event::StartGame);

        let mut result = Ok(());
        for session in self.players.iter_mut() {
            if let Err(err) = session.start(now_ms) {
                result = Err(err);
            }
        }
        self.settle();
        result.map(|()| true)
    }

    /// Forward a batch of client commands to the player's session.
    pub fn execute_commands(
        &mut self,
        player_id: PlayerId,
        commands: &[Command],
        now_ms: u64,
    ) -> Result<bool, CoreError> {
        if self.status != RoomStatus::Active {
            debug!(room = %self.id, player = player_id, "commands outside a match ignored");
            return Ok(false);
        }
        let Some(session) = self.players.get_by_id_mut(player_id) else {
            return Ok(false);
        };
        let result = session.execute_commands(commands, now_ms);
        self.settle();
        result.map(|()| true)
    }

    /// Gravity tick for every board. The first supply error is returned after
    /// all boards have been advanced.
    pub fn advance(&mut self, now_ms: u64) -> Result<(), CoreError> {
        if self.status != RoomStatus::Active {
            return Ok(());
        }
        let mut result = Ok(());
        for session in self.players.iter_mut() {
            if let Err(err) = session.advance(now_ms) {
                result = Err(err);
            }
        }
        self.settle();
        result
    }

    /// Remove a player. Returns false if they were not in the room.
    ///
    /// Leaving mid-match counts as elimination at that moment. The next
    /// player in join order inherits the host flag. An empty room disbands.
    pub fn leave(&mut self, player_id: PlayerId) -> bool {
        let Some(session) = self.players.remove(player_id) else {
            return false;
        };
        info!(room = %self.id, player = player_id, "player left");
        self.bus.publish(&Event::RemovePlayer { player_id });

        if self.status == RoomStatus::Active && !self.is_eliminated(player_id) {
            self.eliminated.push((player_id, session.stats()));
        }

        if session.is_host() {
            if let Some(next) = self.players.first_mut() {
                next.set_host(true);
                let next_id = next.id();
                info!(room = %self.id, player = next_id, "host migrated");
                self.bus.publish(&Event::AddPlayer {
                    player_id: next_id,
                    host: true,
                });
            }
        }

        if self.players.is_empty() {
            if self.status != RoomStatus::Closed {
                info!(room = %self.id, "room disbanded");
                self.close();
            }
        } else {
            self.settle();
        }
        true
    }

    /// Close an open room nobody is in. Returns whether it closed.
    pub fn disband_if_empty(&mut self) -> bool {
        if self.status != RoomStatus::Open || !self.players.is_empty() {
            return false;
        }
        info!(room = %self.id, "empty room disbanded");
        self.close();
        true
    }

    /// Fold queued game overs into the elimination order and finish the match
    /// once no board is left standing.
    pub fn settle(&mut self) {
        let topped: Vec<PlayerId> = self.topped_out.borrow_mut().drain(..).collect();
        for player_id in topped {
            if self.is_eliminated(player_id) {
                continue;
            }
            let stats = self
                .players
                .get_by_id(player_id)
                .map(GameSession::stats)
                .unwrap_or_default();
            debug!(room = %self.id, player = player_id, "board topped out");
            self.eliminated.push((player_id, stats));
        }

        if self.status != RoomStatus::Active {
            return;
        }
        let standing = self
            .players
            .list()
            .iter()
            .any(|p| p.status() != GameStatus::Over && !self.is_eliminated(p.id()));
        if !standing {
            self.finish();
        }
    }

    /// Rank, publish the summary and close. Runs at most once per room.
    fn finish(&mut self) {
        if self.status != RoomStatus::Active {
            return;
        }
        let summary = MatchSummary {
            game_type: self.game_type,
            standings: self.rank(),
        };
        info!(
            room = %self.id,
            winner = ?summary.winner(),
            players = summary.standings.len(),
            "match finished"
        );
        self.bus.publish(&Event::MatchOver {
            summary: summary.clone(),
        });
        self.summary = Some(summary);
        self.close();
    }

    /// Last board standing first, then by reverse elimination order.
    fn rank(&self) -> Vec<Standing> {
        self.eliminated
            .iter()
            .rev()
            .enumerate()
            .map(|(i, &(player_id, stats))| Standing {
                place: i as u32 + 1,
                player_id,
                stats: self
                    .players
                    .get_by_id(player_id)
                    .map_or(stats, GameSession::stats),
            })
            .collect()
    }

    fn is_eliminated(&self, player_id: PlayerId) -> bool {
        self.eliminated.iter().any(|&(id, _)| id == player_id)
    }

    fn close(&mut self) {
        self.status = RoomStatus::Closed;
        self.teardown();
        if let Some(mut callback) = self.on_remove.take() {
            callback(&self.id);
        }
    }

    /// Cancel every handler the room registered on its bus.
    pub fn teardown(&mut self) {
        for sub in self.subscriptions.drain(..) {
            sub.unsubscribe();
        }
        self.status = RoomStatus::Closed;
    }
}

impl std::fmt::Debug for GameRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameRoom")
            .field("id", &self.id)
            .field("game_type", &self.game_type)
            .field("status", &self.status)
            .field("players", &self.players.ids())
            .finish_non_exhaustive()
    }
}
