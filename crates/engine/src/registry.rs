//! Room registry - owns every live room by id
//!
//! The registry is an ordinary value: whoever runs the game loop owns it and
//! passes it to whatever needs to create or look up rooms. Rooms close
//! themselves through their removal callback; the registry only drops them
//! in [`Registry::reap`], never while one of their calls is on the stack.
//!
//! Open rooms that stay empty for `RoomConfig::empty_grace_ms` are disbanded
//! from [`Registry::advance`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, error, info};

use crate::config::GameConfig;
use crate::core::{ClassicScoring, ScoringPolicy, SimpleRng};
use crate::error::{RegistryError, Result};
use crate::room::{GameRoom, RoomStatus};
use crate::types::{GameType, PlayerId, RoomId};

/// Characters used in generated room ids (no 0/O or 1/I)
const ID_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ID_LEN: usize = 6;
/// Colliding ids are regenerated this many times before giving up
const MAX_ID_ATTEMPTS: usize = 32;

type IdSource = Box<dyn FnMut() -> RoomId>;

pub struct Registry {
    config: GameConfig,
    scoring: Rc<dyn ScoringPolicy>,
    rooms: HashMap<RoomId, GameRoom>,
    ids: IdSource,
    seeds: SimpleRng,
    closed: Rc<RefCell<Vec<RoomId>>>,
    /// Last time seen by `advance`
    clock_ms: u64,
    /// When each open room was last seen empty
    idle_since: HashMap<RoomId, u64>,
}

impl Registry {
    pub fn new(config: GameConfig) -> Self {
        let mut rng = SimpleRng::new(config.seed ^ 0x5bd1_e995);
        let ids: IdSource = Box::new(move || {
            (0..ID_LEN)
                .map(|_| ID_ALPHABET[rng.next_range(ID_ALPHABET.len() as u32) as usize] as char)
                .collect()
        });
        Self {
            seeds: SimpleRng::new(config.seed),
            config,
            scoring: Rc::new(ClassicScoring),
            rooms: HashMap::new(),
            ids,
            closed: Rc::new(RefCell::new(Vec::new())),
            clock_ms: 0,
            idle_since: HashMap::new(),
        }
    }

    /// Replace the room id generator.
    pub fn with_id_source<F>(mut self, ids: F) -> Self
    where
        F: FnMut() -> RoomId + 'static,
    {
        self.ids = Box::new(ids);
        self
    }

    /// Scoring used by rooms created from now on
    pub fn with_scoring(mut self, scoring: Rc<dyn ScoringPolicy>) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Create an empty room. `game_type` must be `"single"` or `"multi"`.
    pub fn create_game(&mut self, game_type: &str) -> Result<RoomId> {
        let Some(kind) = GameType::from_str(game_type) else {
            return Err(RegistryError::InvalidGameType(game_type.to_string()));
        };

        let id = self.fresh_id()?;
        let mut room = GameRoom::new(
            id.clone(),
            kind,
            &self.config.room,
            self.seeds.next_u32(),
            Rc::clone(&self.scoring),
        );
        let closed = Rc::clone(&self.closed);
        room.set_on_remove(Box::new(move |id| closed.borrow_mut().push(id.clone())));

        info!(room = %id, game_type = kind.as_str(), "room created");
        self.idle_since.insert(id.clone(), self.clock_ms);
        self.rooms.insert(id.clone(), room);
        Ok(id)
    }

    fn fresh_id(&mut self) -> Result<RoomId> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = (self.ids)();
            if !self.rooms.contains_key(&id) {
                return Ok(id);
            }
        }
        error!(attempts = MAX_ID_ATTEMPTS, "room id generation kept colliding");
        Err(RegistryError::IdsExhausted)
    }

    pub fn get_game(&self, id: &str) -> Option<&GameRoom> {
        self.rooms.get(id)
    }

    pub fn get_game_mut(&mut self, id: &str) -> Option<&mut GameRoom> {
        self.rooms.get_mut(id)
    }

    /// Run `f` on a room, or fail with `GameNotFound`.
    pub fn with_room<T>(&mut self, id: &str, f: impl FnOnce(&mut GameRoom) -> T) -> Result<T> {
        self.rooms
            .get_mut(id)
            .map(f)
            .ok_or_else(|| RegistryError::GameNotFound(id.to_string()))
    }

    /// Join `player_id` to room `id`. Returns whether they became host.
    pub fn join_game(&mut self, id: &str, player_id: PlayerId) -> Result<bool> {
        let host = self.with_room(id, |room| room.join(player_id))??;
        Ok(host)
    }

    /// Disband room `id` if it is open and nobody is in it.
    pub fn close_if_empty(&mut self, id: &str) -> bool {
        self.rooms
            .get_mut(id)
            .is_some_and(GameRoom::disband_if_empty)
    }

    /// Drop a room. True iff it existed.
    pub fn remove_game(&mut self, id: &str) -> bool {
        self.idle_since.remove(id);
        let Some(mut room) = self.rooms.remove(id) else {
            return false;
        };
        room.teardown();
        info!(room = %id, "room removed");
        true
    }

    /// Gravity tick for every active room; disbands rooms left empty past
    /// the grace period.
    pub fn advance(&mut self, now_ms: u64) {
        self.clock_ms = now_ms;
        let grace = self.config.room.empty_grace_ms;
        for (id, room) in self.rooms.iter_mut() {
            if let Err(err) = room.advance(now_ms) {
                error!(room = %id, %err, "piece supply exhausted");
            }

            if room.status() != RoomStatus::Open || !room.players().is_empty() {
                self.idle_since.remove(id);
                continue;
            }
            let since = *self.idle_since.entry(id.clone()).or_insert(now_ms);
            if now_ms.saturating_sub(since) >= grace {
                debug!(room = %id, idle_ms = now_ms - since, "idle room expired");
                room.disband_if_empty();
            }
        }
    }

    /// Remove rooms that closed since the last call; returns their ids.
    pub fn reap(&mut self) -> Vec<RoomId> {
        let mut reaped: Vec<RoomId> = self.closed.borrow_mut().drain(..).collect();
        // Rooms closed through `teardown` never fire their callback.
        let stale: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(id, room)| room.status() == RoomStatus::Closed && !reaped.contains(*id))
            .map(|(id, _)| id.clone())
            .collect();
        reaped.extend(stale);
        reaped.retain(|id| self.remove_game(id));
        reaped
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.keys()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("rooms", &self.rooms)
            .finish_non_exhaustive()
    }
}
