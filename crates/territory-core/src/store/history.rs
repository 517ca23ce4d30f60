//! Linear undo/redo history over whole-state snapshots.
//!
//! `past` is bounded and evicts its oldest entry first; `future` is unbounded
//! and only ever cleared by a new push. There is no branching: pushing after
//! an undo discards the redo path.

use std::collections::VecDeque;
use std::mem;

/// Maximum number of undoable states kept by default.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Clone, Debug)]
pub struct History<T> {
    past: VecDeque<T>,
    present: T,
    future: VecDeque<T>,
    limit: usize,
}

impl<T> History<T> {
    pub fn new(present: T) -> Self {
        Self::with_limit(present, HISTORY_LIMIT)
    }

    /// `limit` is clamped to at least one entry.
    pub fn with_limit(present: T, limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present,
            future: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn present(&self) -> &T {
        &self.present
    }

    /// Undoable states, oldest first.
    pub fn past(&self) -> impl Iterator<Item = &T> {
        self.past.iter()
    }

    /// Redoable states, next-to-redo first.
    pub fn future(&self) -> impl Iterator<Item = &T> {
        self.future.iter()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Make `next` the present state, recording the old one as undoable.
    pub fn push(&mut self, next: T) {
        let previous = mem::replace(&mut self.present, next);
        self.past.push_back(previous);
        self.trim_past();
        self.future.clear();
    }

    /// Step back one state. Returns `false` (and changes nothing) when there
    /// is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        let current = mem::replace(&mut self.present, previous);
        self.future.push_front(current);
        true
    }

    /// Step forward one state. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        let current = mem::replace(&mut self.present, next);
        self.past.push_back(current);
        self.trim_past();
        true
    }

    fn trim_past(&mut self) {
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_history_has_nothing_to_undo_or_redo() {
        let mut h = History::new(0);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(!h.undo());
        assert!(!h.redo());
        assert_eq!(*h.present(), 0);
    }

    #[test]
    fn undo_moves_present_to_front_of_future() {
        let mut h = History::new(0);
        h.push(1);
        h.push(2);
        h.push(3);
        assert!(h.undo());
        assert!(h.undo());
        assert_eq!(*h.present(), 1);
        assert_eq!(h.future().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert!(h.redo());
        assert_eq!(*h.present(), 2);
        assert_eq!(h.past().copied().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn past_is_capped_and_evicts_oldest() {
        let mut h = History::new(0);
        for i in 1..=120 {
            h.push(i);
            assert!(h.past_len() <= HISTORY_LIMIT);
        }
        assert_eq!(h.past_len(), HISTORY_LIMIT);
        assert_eq!(h.past().next(), Some(&70));

        let mut undone = 0;
        while h.undo() {
            undone += 1;
        }
        assert_eq!(undone, HISTORY_LIMIT);
        assert_eq!(*h.present(), 70);
    }

    #[test]
    fn push_clears_future() {
        let mut h = History::new(0);
        h.push(1);
        h.push(2);
        h.undo();
        h.undo();
        assert_eq!(h.future_len(), 2);
        h.push(9);
        assert!(!h.can_redo());
        assert_eq!(h.past().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn redo_respects_the_cap() {
        let mut h = History::with_limit(0, 3);
        for i in 1..=3 {
            h.push(i);
        }
        h.undo();
        h.undo();
        h.undo();
        assert_eq!(*h.present(), 0);
        while h.redo() {}
        assert_eq!(*h.present(), 3);
        assert_eq!(h.past_len(), 3);
    }

    #[test]
    fn limit_is_at_least_one() {
        let mut h = History::with_limit("a", 0);
        assert_eq!(h.limit(), 1);
        h.push("b");
        h.push("c");
        assert_eq!(h.past().copied().collect::<Vec<_>>(), vec!["b"]);
    }
}
