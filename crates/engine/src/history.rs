use std::collections::VecDeque;

use tracing::debug;

use crate::cue::Cue;

/// Bounded undo/redo stacks of whole timeline snapshots.
///
/// # Example
/// ```
/// use cue_engine::History;
///
/// let mut history = History::new(2);
/// history.push(Vec::new());
/// history.push(Vec::new());
/// history.push(Vec::new());
///
/// assert_eq!(history.undo_len(), 2);
/// assert!(history.undo(Vec::new()).is_some());
/// assert!(history.can_redo());
/// ```
#[derive(Debug, Clone)]
pub struct History {
    depth: usize,
    undo: VecDeque<Vec<Cue>>,
    redo: VecDeque<Vec<Cue>>,
}

impl History {
    /// Creates a history keeping at most `depth` undo snapshots.
    ///
    /// A zero depth is raised to one.
    pub fn new(depth: usize) -> Self {
        Self {
            depth: depth.max(1),
            undo: VecDeque::new(),
            redo: VecDeque::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Records the state before a forward edit and abandons the redo future.
    pub fn push(&mut self, snapshot: Vec<Cue>) {
        self.undo.push_back(snapshot);
        evict_oldest(&mut self.undo, self.depth);
        self.redo.clear();
        debug!(undo_len = self.undo.len(), "history step recorded");
    }

    /// Pops the last snapshot, parking `current` on the redo stack.
    pub fn undo(&mut self, current: Vec<Cue>) -> Option<Vec<Cue>> {
        let previous = self.undo.pop_back()?;
        self.redo.push_back(current);
        evict_oldest(&mut self.redo, self.depth);
        debug!(
            undo_len = self.undo.len(),
            redo_len = self.redo.len(),
            "undo applied"
        );
        Some(previous)
    }

    /// Pops the last undone snapshot, parking `current` on the undo stack.
    pub fn redo(&mut self, current: Vec<Cue>) -> Option<Vec<Cue>> {
        let next = self.redo.pop_back()?;
        self.undo.push_back(current);
        evict_oldest(&mut self.undo, self.depth);
        debug!(
            undo_len = self.undo.len(),
            redo_len = self.redo.len(),
            "redo applied"
        );
        Some(next)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

fn evict_oldest(stack: &mut VecDeque<Vec<Cue>>, depth: usize) {
    while stack.len() > depth {
        let _ = stack.pop_front();
    }
}
