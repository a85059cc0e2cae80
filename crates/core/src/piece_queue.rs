//! Piece queue module - the shared sequence of upcoming pieces
//!
//! A room owns one append-only [`PieceSets`] store. Every board in the room
//! reads it through its own [`PieceQueue`] cursor, so all players face the
//! identical sequence no matter how fast each of them plays.
//!
//! Sets are appended by the piece generator whenever a cursor reports it is
//! almost empty; the store never validates or reorders what it is given.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::types::{PieceKind, ALMOST_EMPTY_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PieceQueueError {
    #[error("piece queue exhausted at set {set}, index {index}")]
    OutOfPieces { set: usize, index: usize },
}

/// Append-only list of piece batches
#[derive(Debug, Clone, Default)]
pub struct PieceSets {
    sets: Vec<Vec<PieceKind>>,
}

/// Handle a room passes to each of its boards
pub type SharedPieceSets = Rc<RefCell<PieceSets>>;

impl PieceSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in the shared handle boards expect
    pub fn shared() -> SharedPieceSets {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn add_set(&mut self, pieces: Vec<PieceKind>) {
        self.sets.push(pieces);
    }

    /// Number of sets appended so far
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Total pieces across all sets
    pub fn total_pieces(&self) -> usize {
        self.sets.iter().map(Vec::len).sum()
    }

    pub fn get(&self, set: usize, index: usize) -> Option<PieceKind> {
        self.sets.get(set).and_then(|s| s.get(index)).copied()
    }

    fn set_len(&self, set: usize) -> usize {
        self.sets.get(set).map_or(0, Vec::len)
    }
}

/// One board's read cursor over a room's shared sets
#[derive(Debug, Clone)]
pub struct PieceQueue {
    sets: SharedPieceSets,
    current_set: usize,
    current_index: usize,
}

impl PieceQueue {
    /// Start a cursor at the very first piece of `sets`
    pub fn new(sets: SharedPieceSets) -> Self {
        Self {
            sets,
            current_set: 0,
            current_index: 0,
        }
    }

    /// Append a batch to the shared store; visible to every cursor.
    pub fn add_set(&self, pieces: Vec<PieceKind>) {
        self.sets.borrow_mut().add_set(pieces);
    }

    /// Return the piece at the cursor and advance.
    ///
    /// Fails with [`PieceQueueError::OutOfPieces`] once every appended piece
    /// has been consumed by this cursor.
    pub fn next(&mut self) -> Result<PieceKind, PieceQueueError> {
        let store = Rc::clone(&self.sets);
        let sets = store.borrow();
        self.skip_exhausted_sets(&sets);

        let kind = sets
            .get(self.current_set, self.current_index)
            .ok_or(PieceQueueError::OutOfPieces {
                set: self.current_set,
                index: self.current_index,
            })?;

        self.current_index += 1;
        if self.current_index >= sets.set_len(self.current_set) {
            self.current_set += 1;
            self.current_index = 0;
        }
        Ok(kind)
    }

    /// Look at the piece `ahead` positions past the cursor without consuming.
    pub fn peek(&self, ahead: usize) -> Option<PieceKind> {
        let sets = self.sets.borrow();
        let mut set = self.current_set;
        let mut index = self.current_index + ahead;
        while set < sets.len() {
            let len = sets.set_len(set);
            if index < len {
                return sets.get(set, index);
            }
            index -= len;
            set += 1;
        }
        None
    }

    /// True only while the cursor is in the last appended set and at most
    /// [`ALMOST_EMPTY_THRESHOLD`] pieces of it remain.
    pub fn is_almost_empty(&self) -> bool {
        let sets = self.sets.borrow();
        if sets.is_empty() || self.current_set >= sets.len() {
            return true;
        }
        if self.current_set != sets.len() - 1 {
            return false;
        }
        let remaining = sets.set_len(self.current_set) - self.current_index;
        remaining <= ALMOST_EMPTY_THRESHOLD
    }

    /// `(current_set, current_index)`
    pub fn cursor(&self) -> (usize, usize) {
        (self.current_set, self.current_index)
    }

    /// Number of sets in the shared store
    pub fn set_count(&self) -> usize {
        self.sets.borrow().len()
    }

    /// Pieces this cursor can still draw
    pub fn remaining(&self) -> usize {
        let sets = self.sets.borrow();
        let tail: usize = (self.current_set..sets.len()).map(|s| sets.set_len(s)).sum();
        tail.saturating_sub(self.current_index)
    }

    /// Empty sets never hold the cursor.
    fn skip_exhausted_sets(&mut self, sets: &PieceSets) {
        while self.current_set < sets.len()
            && self.current_index >= sets.set_len(self.current_set)
        {
            self.current_set += 1;
            self.current_index = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(len: usize) -> Vec<PieceKind> {
        (0..len).map(|i| PieceKind::ALL[i % 7]).collect()
    }

    #[test]
    fn test_next_walks_sets_in_order() {
        let sets = PieceSets::shared();
        let mut queue = PieceQueue::new(sets.clone());
        queue.add_set(vec![PieceKind::I, PieceKind::O]);
        queue.add_set(vec![PieceKind::T]);

        assert_eq!(queue.next(), Ok(PieceKind::I));
        assert_eq!(queue.cursor(), (0, 1));
        assert_eq!(queue.next(), Ok(PieceKind::O));
        assert_eq!(queue.cursor(), (1, 0));
        assert_eq!(queue.next(), Ok(PieceKind::T));
        assert_eq!(
            queue.next(),
            Err(PieceQueueError::OutOfPieces { set: 2, index: 0 })
        );
    }

    #[test]
    fn test_exactly_total_entries_can_be_drawn() {
        let sets = PieceSets::shared();
        let mut queue = PieceQueue::new(sets.clone());
        queue.add_set(set_of(20));
        queue.add_set(set_of(35));
        queue.add_set(set_of(3));

        let total = sets.borrow().total_pieces();
        for _ in 0..total {
            assert!(queue.next().is_ok());
        }
        assert!(queue.next().is_err());

        queue.add_set(set_of(1));
        assert!(queue.next().is_ok());
    }

    #[test]
    fn test_empty_sets_are_skipped() {
        let sets = PieceSets::shared();
        let mut queue = PieceQueue::new(sets);
        queue.add_set(Vec::new());
        queue.add_set(vec![PieceKind::Z]);
        assert_eq!(queue.next(), Ok(PieceKind::Z));
    }

    #[test]
    fn test_almost_empty_boundary_is_fifteen_remaining() {
        let sets = PieceSets::shared();
        let mut queue = PieceQueue::new(sets);
        queue.add_set(set_of(20));

        for _ in 0..4 {
            queue.next().unwrap();
        }
        assert!(!queue.is_almost_empty(), "16 remaining");

        queue.next().unwrap();
        assert!(queue.is_almost_empty(), "15 remaining");

        queue.next().unwrap();
        assert_eq!(queue.cursor(), (0, 6));
        assert!(queue.is_almost_empty(), "14 remaining");
    }

    #[test]
    fn test_not_almost_empty_while_a_later_set_exists() {
        let sets = PieceSets::shared();
        let mut queue = PieceQueue::new(sets);
        queue.add_set(set_of(20));
        queue.add_set(set_of(2));

        for _ in 0..19 {
            queue.next().unwrap();
        }
        assert_eq!(queue.cursor(), (0, 19));
        assert!(!queue.is_almost_empty());

        queue.next().unwrap();
        assert_eq!(queue.cursor(), (1, 0));
        assert!(queue.is_almost_empty());
    }

    #[test]
    fn test_cursors_share_sets_but_not_position() {
        let sets = PieceSets::shared();
        let mut a = PieceQueue::new(sets.clone());
        let mut b = PieceQueue::new(sets.clone());
        a.add_set(vec![PieceKind::S, PieceKind::J, PieceKind::L]);

        assert_eq!(a.next(), Ok(PieceKind::S));
        assert_eq!(a.next(), Ok(PieceKind::J));
        assert_eq!(b.next(), Ok(PieceKind::S));
        assert_eq!(b.peek(0), Some(PieceKind::J));
        assert_eq!(b.peek(1), Some(PieceKind::L));
        assert_eq!(b.peek(2), None);
        assert_eq!(a.remaining(), 1);
        assert_eq!(b.remaining(), 2);
    }
}
