//! Piece feeder - keeps a room's shared piece store topped up
//!
//! The feeder listens for `needPieces` on the room bus and appends one fresh
//! set per scarcity signal. Several boards usually run low at the same point
//! of the shared sequence; only the first signal for a given store size adds
//! a set.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::core::{BagGenerator, Event, SharedPieceSets, Subscription, Topic, TopicBus, WeakTopicBus};

#[derive(Clone)]
pub struct PieceFeeder {
    sets: SharedPieceSets,
    generator: Rc<RefCell<BagGenerator>>,
    bus: WeakTopicBus,
}

impl PieceFeeder {
    pub fn new(sets: SharedPieceSets, generator: BagGenerator, bus: &TopicBus) -> Self {
        Self {
            sets,
            generator: Rc::new(RefCell::new(generator)),
            bus: bus.downgrade(),
        }
    }

    /// Generate and append one set, then announce it. Returns the new set count.
    pub fn add_set(&self) -> usize {
        let pieces = self.generator.borrow_mut().next_set();
        let count = {
            let mut sets = self.sets.borrow_mut();
            sets.add_set(pieces);
            sets.len()
        };
        debug!(sets = count, "piece set added");
        self.bus.publish(&Event::PiecesAdded { sets: count });
        count
    }

    pub fn set_count(&self) -> usize {
        self.sets.borrow().len()
    }

    /// Answer `needPieces` on `bus` until the subscription is dropped.
    pub fn subscribe(&self, bus: &TopicBus) -> Subscription {
        let feeder = self.clone();
        bus.subscribe(Topic::NeedPieces, move |event| {
            let Event::NeedPieces { sets_seen, .. } = event else {
                return;
            };
            // A later signal for the same store size is already answered.
            if feeder.set_count() > *sets_seen {
                return;
            }
            feeder.add_set();
        })
    }
}

impl std::fmt::Debug for PieceFeeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PieceFeeder")
            .field("sets", &self.set_count())
            .finish_non_exhaustive()
    }
}
