//! Bounded undo/redo history over snapshots

use std::collections::VecDeque;

/// Default number of snapshots kept by an editor
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// A linear history of snapshots with a pointer to the current one.
///
/// Pushing while the pointer is not at the newest snapshot discards the
/// redo branch. When more than `limit` snapshots are held the oldest is
/// evicted, so at most `limit - 1` undo steps are available.
#[derive(Debug, Clone)]
pub struct History<T> {
    states: VecDeque<T>,
    pointer: usize,
    limit: usize,
}

impl<T: Clone> History<T> {
    /// Create a history holding `initial`. A `limit` of zero is treated as one.
    pub fn new(initial: T, limit: usize) -> Self {
        let mut states = VecDeque::with_capacity(limit.clamp(1, DEFAULT_HISTORY_LIMIT));
        states.push_back(initial);
        Self {
            states,
            pointer: 0,
            limit: limit.max(1),
        }
    }

    /// The snapshot under the pointer
    pub fn current(&self) -> &T {
        &self.states[self.pointer]
    }

    /// Record a new snapshot and make it current
    pub fn push(&mut self, state: T) {
        self.states.truncate(self.pointer + 1);
        self.states.push_back(state);
        while self.states.len() > self.limit {
            self.states.pop_front();
        }
        self.pointer = self.states.len() - 1;
    }

    /// Step back one snapshot. Returns `None` when already at the oldest.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.pointer -= 1;
        Some(self.current())
    }

    /// Step forward one snapshot. Returns `None` when already at the newest.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.pointer += 1;
        Some(self.current())
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.states.len()
    }

    /// Drop every snapshot and start over from `state`
    pub fn reset(&mut self, state: T) {
        self.states.clear();
        self.states.push_back(state);
        self.pointer = 0;
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
