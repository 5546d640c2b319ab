//! Snapshot-based undo/redo
//!
//! `past` holds the states to return to on undo (newest at the back),
//! `future` holds undone states (most recently undone at the back).

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct History<S> {
    past: VecDeque<S>,
    future: Vec<S>,
    limit: Option<usize>,
}

impl<S> History<S> {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit,
        }
    }

    /// Record the state as it was before a new action. Invalidates redo.
    pub fn record(&mut self, snapshot: S) {
        self.past.push_back(snapshot);
        if let Some(limit) = self.limit {
            while self.past.len() > limit {
                self.past.pop_front();
            }
        }
        self.future.clear();
    }

    /// Trade `current` for the newest past state
    pub fn undo(&mut self, current: S) -> Option<S> {
        let previous = self.past.pop_back()?;
        self.future.push(current);
        Some(previous)
    }

    /// Trade `current` for the most recently undone state
    pub fn redo(&mut self, current: S) -> Option<S> {
        let next = self.future.pop()?;
        self.past.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }
}
