//! Ordered, duplicate-free roster of the sessions in one room.

use crate::session::GameSession;
use crate::types::PlayerId;

#[derive(Debug, Default)]
pub struct PlayerManager {
    players: Vec<GameSession>,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append in join order. Returns false (and drops nothing) when a session
    /// with the same id is already present.
    pub fn add(&mut self, session: GameSession) -> bool {
        if self.contains(session.id()) {
            return false;
        }
        self.players.push(session);
        true
    }

    /// Remove by id, keeping the order of the rest. `None` if absent.
    pub fn remove(&mut self, id: PlayerId) -> Option<GameSession> {
        let pos = self.players.iter().position(|p| p.id() == id)?;
        Some(self.players.remove(pos))
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.iter().any(|p| p.id() == id)
    }

    pub fn get_by_id(&self, id: PlayerId) -> Option<&GameSession> {
        self.players.iter().find(|p| p.id() == id)
    }

    pub fn get_by_id_mut(&mut self, id: PlayerId) -> Option<&mut GameSession> {
        self.players.iter_mut().find(|p| p.id() == id)
    }

    /// Earliest remaining joiner
    pub fn first(&self) -> Option<&GameSession> {
        self.players.first()
    }

    pub fn first_mut(&mut self) -> Option<&mut GameSession> {
        self.players.first_mut()
    }

    pub fn count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn list(&self) -> &[GameSession] {
        &self.players
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(GameSession::id).collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GameSession> {
        self.players.iter_mut()
    }
}
