//! Gateway between connected clients and the room registry
//!
//! Lives on the game-loop thread next to the [`Registry`]. Client requests
//! come in as [`InboundCommand`]s; every room bus event is buffered per room
//! and turned into [`OutboundMessage`]s for that room's members once the
//! call that produced it has returned.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::adapter::protocol::{add_message, encode_event, game_created, joined_game};
use crate::adapter::{ClientId, ClientRequest, InboundCommand, OutboundMessage};
use crate::core::{Event, Subscription, Topic};
use crate::engine::{Registry, RegistryError};
use crate::types::{Command, RoomId};

/// Buffered events of one room plus the handlers that fill the buffer
struct RoomLink {
    outbox: Rc<RefCell<Vec<Event>>>,
    subscriptions: Vec<Subscription>,
}

impl RoomLink {
    fn unlink(self) {
        for sub in self.subscriptions {
            sub.unsubscribe();
        }
    }
}

pub struct Gateway {
    registry: Registry,
    links: HashMap<RoomId, RoomLink>,
    memberships: HashMap<ClientId, RoomId>,
    /// Rooms each client created, closed on disconnect if still empty
    created: HashMap<ClientId, Vec<RoomId>>,
}

impl Gateway {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            links: HashMap::new(),
            memberships: HashMap::new(),
            created: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Room a client currently belongs to
    pub fn room_of(&self, client_id: ClientId) -> Option<&RoomId> {
        self.memberships.get(&client_id)
    }

    /// Apply one client request. Returns the lines to deliver.
    pub fn handle(&mut self, inbound: InboundCommand, now_ms: u64) -> Vec<OutboundMessage> {
        let InboundCommand { client_id, request } = inbound;
        let mut out = Vec::new();

        match request {
            ClientRequest::CreateGame { game_type } => match self.registry.create_game(&game_type) {
                Ok(id) => {
                    self.link(&id);
                    self.created.entry(client_id).or_default().push(id.clone());
                    push_line(&mut out, client_id, game_created(&id));
                }
                Err(e) => {
                    warn!(client = client_id, %game_type, error = %e, "create rejected");
                    push_line(&mut out, client_id, add_message(&e.to_string()));
                }
            },
            ClientRequest::JoinGame { id } => {
                if self.memberships.get(&client_id) != Some(&id) {
                    self.leave(client_id, &mut out);
                }
                self.join(client_id, &id, &mut out);
            }
            ClientRequest::LeaveGame => {
                self.leave(client_id, &mut out);
            }
            ClientRequest::Disconnect => {
                self.leave(client_id, &mut out);
                for id in self.created.remove(&client_id).unwrap_or_default() {
                    self.registry.close_if_empty(&id);
                }
            }
            ClientRequest::Play => {
                if let Some(id) = self.memberships.get(&client_id).cloned() {
                    let result = self.registry.with_room(&id, |room| room.ready(client_id, now_ms));
                    if let Ok(Err(e)) = result {
                        error!(room = %id, error = %e, "match start failed");
                    }
                }
            }
            ClientRequest::ExecuteCommands(commands) => {
                self.execute(client_id, &commands, now_ms);
            }
        }

        self.flush(&mut out);
        self.reap();
        out
    }

    /// Gravity tick for every room.
    pub fn tick(&mut self, now_ms: u64) -> Vec<OutboundMessage> {
        self.registry.advance(now_ms);
        let mut out = Vec::new();
        self.flush(&mut out);
        self.reap();
        out
    }

    fn link(&mut self, id: &RoomId) {
        let Some(room) = self.registry.get_game(id) else {
            return;
        };
        let outbox = Rc::new(RefCell::new(Vec::new()));
        let subscriptions = Topic::ALL
            .iter()
            .map(|&topic| {
                let outbox = Rc::clone(&outbox);
                room.bus()
                    .subscribe(topic, move |event| outbox.borrow_mut().push(event.clone()))
            })
            .collect();
        self.links.insert(
            id.clone(),
            RoomLink {
                outbox,
                subscriptions,
            },
        );
    }

    fn join(&mut self, client_id: ClientId, id: &RoomId, out: &mut Vec<OutboundMessage>) {
        let host = match self.registry.join_game(id, client_id) {
            Ok(host) => host,
            // The room flashed the joiner on its own bus.
            Err(RegistryError::Join(e)) => {
                debug!(client = client_id, room = %id, error = %e, "join rejected by room");
                return;
            }
            Err(e) => {
                warn!(client = client_id, room = %id, error = %e, "join rejected");
                push_line(out, client_id, add_message(&e.to_string()));
                return;
            }
        };
        self.memberships.insert(client_id, id.clone());
        push_line(out, client_id, joined_game(id, client_id, host));

        // Roster of everyone already in the room.
        let Some(room) = self.registry.get_game(id) else {
            return;
        };
        for player in room.players().list().iter().filter(|p| p.id() != client_id) {
            let event = Event::AddPlayer {
                player_id: player.id(),
                host: player.is_host(),
            };
            push_line(out, client_id, encode_event(id, &event));
        }
    }

    fn leave(&mut self, client_id: ClientId, out: &mut Vec<OutboundMessage>) {
        let Some(id) = self.memberships.remove(&client_id) else {
            return;
        };
        match self.registry.with_room(&id, |room| room.leave(client_id)) {
            Ok(true) => {}
            Ok(false) => debug!(client = client_id, room = %id, "leaver was not in room"),
            Err(e) => push_line(out, client_id, add_message(&e.to_string())),
        }
    }

    fn execute(&mut self, client_id: ClientId, commands: &[Command], now_ms: u64) {
        let Some(id) = self.memberships.get(&client_id).cloned() else {
            debug!(client = client_id, "commands without a room ignored");
            return;
        };
        let result = self
            .registry
            .with_room(&id, |room| room.execute_commands(client_id, commands, now_ms));
        if let Ok(Err(e)) = result {
            error!(room = %id, player = client_id, error = %e, "piece supply exhausted");
        }
    }

    /// Route buffered room events to the room's members.
    fn flush(&mut self, out: &mut Vec<OutboundMessage>) {
        for (id, link) in &self.links {
            let events: Vec<Event> = link.outbox.borrow_mut().drain(..).collect();
            if events.is_empty() {
                continue;
            }
            let members: Vec<ClientId> = self
                .memberships
                .iter()
                .filter(|(_, room)| *room == id)
                .map(|(&client, _)| client)
                .collect();

            for event in &events {
                let line = match encode_event(id, event) {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(room = %id, error = %e, "event not encodable");
                        continue;
                    }
                };
                match event {
                    Event::AddMessage {
                        player_id: Some(player),
                        ..
                    } => out.push(OutboundMessage::ToClient {
                        client_id: *player,
                        line,
                    }),
                    _ => out.extend(members.iter().map(|&client_id| OutboundMessage::ToClient {
                        client_id,
                        line: line.clone(),
                    })),
                }
            }
        }
    }

    fn reap(&mut self) {
        for id in self.registry.reap() {
            if let Some(link) = self.links.remove(&id) {
                link.unlink();
            }
            self.memberships.retain(|_, room| *room != id);
            for rooms in self.created.values_mut() {
                rooms.retain(|room| *room != id);
            }
        }
        self.created.retain(|_, rooms| !rooms.is_empty());
    }
}

fn push_line(out: &mut Vec<OutboundMessage>, client_id: ClientId, line: serde_json::Result<String>) {
    match line {
        Ok(line) => out.push(OutboundMessage::ToClient { client_id, line }),
        Err(e) => warn!(client = client_id, error = %e, "reply not encodable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GameConfig;

    fn lines_for(out: &[OutboundMessage], client: ClientId) -> Vec<serde_json::Value> {
        out.iter()
            .filter_map(|m| match m {
                OutboundMessage::ToClient { client_id, line } if *client_id == client => {
                    serde_json::from_str(line).ok()
                }
                _ => None,
            })
            .collect()
    }

    fn send(gw: &mut Gateway, client_id: ClientId, request: ClientRequest) -> Vec<OutboundMessage> {
        gw.handle(InboundCommand { client_id, request }, 0)
    }

    fn created_id(out: &[OutboundMessage], client: ClientId) -> RoomId {
        lines_for(out, client)
            .iter()
            .find(|v| v["type"] == "gameCreated")
            .and_then(|v| v["data"]["id"].as_str())
            .map(str::to_string)
            .unwrap()
    }

    #[test]
    fn test_invalid_game_type_flashes() {
        let mut gw = Gateway::new(Registry::new(GameConfig::default()));
        let out = send(&mut gw, 1, ClientRequest::CreateGame { game_type: "duo".into() });
        let lines = lines_for(&out, 1);
        assert_eq!(lines[0]["type"], "addMessage");
        assert_eq!(lines[0]["data"]["message"], "Unable to create game");
    }

    #[test]
    fn test_join_unknown_room_flashes() {
        let mut gw = Gateway::new(Registry::default());
        let out = send(&mut gw, 1, ClientRequest::JoinGame { id: "ZZZZZZ".into() });
        assert_eq!(lines_for(&out, 1)[0]["data"]["message"], "Game not found");
        assert!(gw.room_of(1).is_none());
    }

    #[test]
    fn test_join_broadcasts_to_members() {
        let mut gw = Gateway::new(Registry::default());
        let out = send(&mut gw, 1, ClientRequest::CreateGame { game_type: "multi".into() });
        let id = created_id(&out, 1);

        send(&mut gw, 1, ClientRequest::JoinGame { id: id.clone() });
        let out = send(&mut gw, 2, ClientRequest::JoinGame { id: id.clone() });

        let to_host = lines_for(&out, 1);
        assert!(to_host.iter().any(|v| v["type"] == "addPlayer" && v["data"]["id"] == 2));
        let to_joiner = lines_for(&out, 2);
        assert_eq!(to_joiner[0]["type"], "joinedGame");
        assert_eq!(to_joiner[0]["data"]["host"], false);
        assert!(to_joiner.iter().any(|v| v["type"] == "addPlayer" && v["data"]["id"] == 1));
    }

    #[test]
    fn test_disconnect_disbands_and_reaps() {
        let mut gw = Gateway::new(Registry::default());
        let out = send(&mut gw, 1, ClientRequest::CreateGame { game_type: "single".into() });
        let id = created_id(&out, 1);
        send(&mut gw, 1, ClientRequest::JoinGame { id: id.clone() });
        assert_eq!(gw.room_of(1), Some(&id));

        send(&mut gw, 1, ClientRequest::Disconnect);
        assert!(gw.room_of(1).is_none());
        assert!(gw.registry().get_game(&id).is_none());
    }

    #[test]
    fn test_rejected_join_flashes_only_the_joiner() {
        let mut gw = Gateway::new(Registry::default());
        let out = send(&mut gw, 1, ClientRequest::CreateGame { game_type: "single".into() });
        let id = created_id(&out, 1);
        send(&mut gw, 1, ClientRequest::JoinGame { id: id.clone() });

        let out = send(&mut gw, 2, ClientRequest::JoinGame { id });
        let to_joiner = lines_for(&out, 2);
        assert_eq!(to_joiner.len(), 1);
        assert_eq!(to_joiner[0]["type"], "addMessage");
        assert_eq!(to_joiner[0]["data"]["message"], "Room is full");
        assert!(lines_for(&out, 1).is_empty());
        assert!(gw.room_of(2).is_none());
    }

    #[test]
    fn test_unjoined_rooms_close_when_creator_disconnects() {
        let mut gw = Gateway::new(Registry::default());
        for _ in 0..100 {
            send(&mut gw, 1, ClientRequest::CreateGame { game_type: "multi".into() });
        }
        let out = send(&mut gw, 2, ClientRequest::CreateGame { game_type: "multi".into() });
        let kept = created_id(&out, 2);
        send(&mut gw, 3, ClientRequest::JoinGame { id: kept.clone() });
        assert_eq!(gw.registry().len(), 101);

        send(&mut gw, 1, ClientRequest::Disconnect);
        assert_eq!(gw.registry().len(), 1);

        // Someone else is in the second creator's room, so it survives them.
        send(&mut gw, 2, ClientRequest::Disconnect);
        gw.tick(10_000);
        assert_eq!(gw.registry().ids().collect::<Vec<_>>(), vec![&kept]);
    }

    #[test]
    fn test_idle_rooms_expire_on_tick() {
        let mut gw = Gateway::new(Registry::default());
        send(&mut gw, 1, ClientRequest::CreateGame { game_type: "multi".into() });
        let grace = gw.registry().config().room.empty_grace_ms;

        gw.tick(grace - 1);
        assert_eq!(gw.registry().len(), 1);
        gw.tick(grace);
        assert!(gw.registry().is_empty());
    }

    #[test]
    fn test_play_starts_single_game() {
        let mut gw = Gateway::new(Registry::default());
        let out = send(&mut gw, 1, ClientRequest::CreateGame { game_type: "single".into() });
        let id = created_id(&out, 1);
        send(&mut gw, 1, ClientRequest::JoinGame { id });

        let out = send(&mut gw, 1, ClientRequest::Play);
        let types: Vec<_> = lines_for(&out, 1)
            .iter()
            .map(|v| v["type"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(types[0], "startGame");
        assert!(types.contains(&"draw".to_string()));

        let out = send(&mut gw, 1, ClientRequest::ExecuteCommands(vec![Command::HardDrop]));
        let types: Vec<_> = lines_for(&out, 1)
            .iter()
            .map(|v| v["type"].as_str().unwrap_or_default().to_string())
            .collect();
        assert!(types.contains(&"boardChange".to_string()));
        assert!(types.contains(&"updateScore".to_string()));
    }
}
