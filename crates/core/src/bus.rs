//! Topic bus module - room-scoped publish/subscribe
//!
//! Each room owns one [`TopicBus`]; boards, sessions and the transport layer
//! only talk to each other through it. Topics are a closed enum and handlers
//! are registered per topic, so there is no stringly-typed dispatch and no way
//! for one room's events to reach another room's subscribers.
//!
//! Publishing is synchronous: every handler subscribed to the event's topic
//! runs, in subscription order, before `publish` returns. The subscriber list
//! is snapshotted first, so handlers may subscribe or unsubscribe (themselves
//! included) while an event is in flight. A handler that publishes an event
//! of a topic it is itself subscribed to is not re-entered.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::piece::Piece;
use crate::types::{GridRows, MatchSummary, PieceKind, PlayerId, PlayerStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    AddPlayer,
    RemovePlayer,
    StartGame,
    Draw,
    BoardChange,
    ClearLines,
    UpdateScore,
    NeedPieces,
    PiecesAdded,
    GameOver,
    MatchOver,
    AddMessage,
}

impl Topic {
    pub const ALL: [Topic; 12] = [
        Topic::AddPlayer,
        Topic::RemovePlayer,
        Topic::StartGame,
        Topic::Draw,
        Topic::BoardChange,
        Topic::ClearLines,
        Topic::UpdateScore,
        Topic::NeedPieces,
        Topic::PiecesAdded,
        Topic::GameOver,
        Topic::MatchOver,
        Topic::AddMessage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::AddPlayer => "addPlayer",
            Topic::RemovePlayer => "removePlayer",
            Topic::StartGame => "startGame",
            Topic::Draw => "draw",
            Topic::BoardChange => "boardChange",
            Topic::ClearLines => "clearLines",
            Topic::UpdateScore => "updateScore",
            Topic::NeedPieces => "needPieces",
            Topic::PiecesAdded => "piecesAdded",
            Topic::GameOver => "gameOver",
            Topic::MatchOver => "matchOver",
            Topic::AddMessage => "addMessage",
        }
    }
}

/// Payload of a published event; each variant belongs to exactly one topic.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    AddPlayer {
        player_id: PlayerId,
        host: bool,
    },
    RemovePlayer {
        player_id: PlayerId,
    },
    StartGame,
    /// The active piece moved, rotated or spawned.
    Draw {
        player_id: PlayerId,
        piece: Piece,
        ghost_y: i8,
        next: Option<PieceKind>,
    },
    /// The locked grid changed.
    BoardChange {
        player_id: PlayerId,
        grid: GridRows,
    },
    ClearLines {
        player_id: PlayerId,
        count: u32,
    },
    UpdateScore {
        player_id: PlayerId,
        stats: PlayerStats,
    },
    /// A board's cursor reached the last, nearly consumed set.
    NeedPieces {
        player_id: PlayerId,
        sets_seen: usize,
    },
    PiecesAdded {
        sets: usize,
    },
    /// One board topped out.
    GameOver {
        player_id: PlayerId,
        grid: GridRows,
    },
    /// The whole room finished.
    MatchOver {
        summary: MatchSummary,
    },
    AddMessage {
        player_id: Option<PlayerId>,
        text: String,
    },
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::AddPlayer { .. } => Topic::AddPlayer,
            Event::RemovePlayer { .. } => Topic::RemovePlayer,
            Event::StartGame => Topic::StartGame,
            Event::Draw { .. } => Topic::Draw,
            Event::BoardChange { .. } => Topic::BoardChange,
            Event::ClearLines { .. } => Topic::ClearLines,
            Event::UpdateScore { .. } => Topic::UpdateScore,
            Event::NeedPieces { .. } => Topic::NeedPieces,
            Event::PiecesAdded { .. } => Topic::PiecesAdded,
            Event::GameOver { .. } => Topic::GameOver,
            Event::MatchOver { .. } => Topic::MatchOver,
            Event::AddMessage { .. } => Topic::AddMessage,
        }
    }
}

type Handler = Rc<RefCell<dyn FnMut(&Event)>>;

#[derive(Default)]
struct BusInner {
    next_id: u64,
    topics: HashMap<Topic, Vec<(u64, Handler)>>,
}

/// Cloneable handle to one room's bus
#[derive(Clone, Default)]
pub struct TopicBus {
    inner: Rc<RefCell<BusInner>>,
}

impl TopicBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`. Keep the returned [`Subscription`] to
    /// cancel it later.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: FnMut(&Event) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        let handler: Handler = Rc::new(RefCell::new(handler));
        inner.topics.entry(topic).or_default().push((id, handler));
        Subscription {
            bus: Rc::downgrade(&self.inner),
            topic,
            id,
        }
    }

    /// Deliver `event` to every handler of its topic. Returns how many ran.
    pub fn publish(&self, event: &Event) -> usize {
        let snapshot: Vec<Handler> = {
            let inner = self.inner.borrow();
            match inner.topics.get(&event.topic()) {
                Some(handlers) => handlers.iter().map(|(_, h)| Rc::clone(h)).collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for handler in snapshot {
            // Busy means this handler is further up the stack.
            if let Ok(mut f) = handler.try_borrow_mut() {
                (&mut *f)(event);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner
            .borrow()
            .topics
            .get(&topic)
            .map_or(0, Vec::len)
    }

    /// Drop every handler on every topic.
    pub fn clear(&self) {
        self.inner.borrow_mut().topics.clear();
    }

    /// Handle for handlers that publish back onto their own bus; holding a
    /// strong handle there would keep the bus alive forever.
    pub fn downgrade(&self) -> WeakTopicBus {
        WeakTopicBus {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct WeakTopicBus {
    inner: Weak<RefCell<BusInner>>,
}

impl WeakTopicBus {
    pub fn upgrade(&self) -> Option<TopicBus> {
        self.inner.upgrade().map(|inner| TopicBus { inner })
    }

    /// Publish if the bus still exists; returns handlers run.
    pub fn publish(&self, event: &Event) -> usize {
        self.upgrade().map_or(0, |bus| bus.publish(event))
    }
}

impl fmt::Debug for TopicBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let mut topics: Vec<(&'static str, usize)> = inner
            .topics
            .iter()
            .map(|(topic, handlers)| (topic.as_str(), handlers.len()))
            .collect();
        topics.sort_unstable();
        f.debug_struct("TopicBus").field("topics", &topics).finish()
    }
}

/// Capability to remove one handler from the bus it was registered on
#[derive(Debug)]
#[must_use = "dropping a Subscription leaves the handler registered with no way to remove it"]
pub struct Subscription {
    bus: Weak<RefCell<BusInner>>,
    topic: Topic,
    id: u64,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Remove exactly this handler. Returns false if it was already gone
    /// (or the bus no longer exists).
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.bus.upgrade() else {
            return false;
        };
        let mut inner = inner.borrow_mut();
        let Some(handlers) = inner.topics.get_mut(&self.topic) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != self.id);
        before != handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_lines(count: u32) -> Event {
        Event::ClearLines {
            player_id: 1,
            count,
        }
    }

    #[test]
    fn test_publish_runs_handlers_in_subscription_order() {
        let bus = TopicBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = Rc::clone(&log);
        let _a = bus.subscribe(Topic::ClearLines, move |_| l1.borrow_mut().push("a"));
        let l2 = Rc::clone(&log);
        let _b = bus.subscribe(Topic::ClearLines, move |_| l2.borrow_mut().push("b"));

        assert_eq!(bus.publish(&clear_lines(1)), 2);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus = TopicBus::new();
        let hits = Rc::new(RefCell::new(0));
        let h = Rc::clone(&hits);
        let _sub = bus.subscribe(Topic::BoardChange, move |_| *h.borrow_mut() += 1);

        assert_eq!(bus.publish(&clear_lines(2)), 0);
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_unsubscribe_removes_exactly_one_handler() {
        let bus = TopicBus::new();
        let a = bus.subscribe(Topic::ClearLines, |_| {});
        let _b = bus.subscribe(Topic::ClearLines, |_| {});
        assert_eq!(bus.subscriber_count(Topic::ClearLines), 2);

        assert!(a.unsubscribe());
        assert_eq!(bus.subscriber_count(Topic::ClearLines), 1);
    }

    #[test]
    fn test_unsubscribe_after_clear_reports_noop() {
        let bus = TopicBus::new();
        let sub = bus.subscribe(Topic::StartGame, |_| {});
        bus.clear();
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_handler_can_unsubscribe_itself_mid_publish() {
        let bus = TopicBus::new();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let hits = Rc::new(RefCell::new(0));

        let s = Rc::clone(&slot);
        let h = Rc::clone(&hits);
        let sub = bus.subscribe(Topic::ClearLines, move |_| {
            *h.borrow_mut() += 1;
            if let Some(sub) = s.borrow_mut().take() {
                sub.unsubscribe();
            }
        });
        *slot.borrow_mut() = Some(sub);
        let h2 = Rc::clone(&hits);
        let _other = bus.subscribe(Topic::ClearLines, move |_| *h2.borrow_mut() += 10);

        assert_eq!(bus.publish(&clear_lines(1)), 2);
        assert_eq!(*hits.borrow(), 11);
        assert_eq!(bus.publish(&clear_lines(1)), 1);
        assert_eq!(*hits.borrow(), 21);
    }

    #[test]
    fn test_handler_may_publish_other_topics() {
        let bus = TopicBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = bus.clone();
        let _relay = bus.subscribe(Topic::NeedPieces, move |_| {
            inner_bus.publish(&Event::PiecesAdded { sets: 3 });
        });
        let s = Rc::clone(&seen);
        let _sink = bus.subscribe(Topic::PiecesAdded, move |e| s.borrow_mut().push(e.clone()));

        bus.publish(&Event::NeedPieces {
            player_id: 1,
            sets_seen: 2,
        });
        assert_eq!(*seen.borrow(), vec![Event::PiecesAdded { sets: 3 }]);
    }

    #[test]
    fn test_separate_buses_do_not_bleed() {
        let room_a = TopicBus::new();
        let room_b = TopicBus::new();
        let hits = Rc::new(RefCell::new(0));
        let h = Rc::clone(&hits);
        let _sub = room_a.subscribe(Topic::ClearLines, move |_| *h.borrow_mut() += 1);

        room_b.publish(&clear_lines(4));
        assert_eq!(*hits.borrow(), 0);
    }
}
