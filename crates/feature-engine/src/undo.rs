use std::collections::VecDeque;

/// Bounded snapshot undo/redo history.
///
/// The owner calls [`History::save`] with its current state right before
/// mutating it. `undo` and `redo` swap the owner's state with the stored
/// snapshot, so the history stays strictly linear: any new save drops the
/// redo branch. Once `capacity` snapshots are held, the oldest is evicted.
#[derive(Debug, Clone)]
pub struct History<T> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    capacity: usize,
}

impl<T: Clone> History<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity,
        }
    }

    /// Record `current` as the state to return to on the next undo.
    pub fn save(&mut self, current: &T) {
        self.redo.clear();
        self.push_undo(current.clone());
    }

    /// Restore the most recent snapshot into `current`. Returns false when
    /// there is nothing to undo.
    pub fn undo(&mut self, current: &mut T) -> bool {
        match self.undo.pop_back() {
            Some(previous) => {
                self.redo.push(std::mem::replace(current, previous));
                true
            }
            None => false,
        }
    }

    /// Re-apply the most recently undone state. Returns false when there is
    /// nothing to redo.
    pub fn redo(&mut self, current: &mut T) -> bool {
        match self.redo.pop() {
            Some(next) => {
                let previous = std::mem::replace(current, next);
                self.push_undo(previous);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn push_undo(&mut self, snapshot: T) {
        if self.capacity == 0 {
            return;
        }
        if self.undo.len() == self.capacity {
            self.undo.pop_front();
        }
        self.undo.push_back(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_undo_redo() {
        let mut history = History::new(10);
        let mut state = vec!["A"];
        history.save(&state);
        state.push("B");
        history.save(&state);
        state.push("C");

        assert!(history.undo(&mut state));
        assert!(history.undo(&mut state));
        assert_eq!(state, vec!["A"]);
        assert!(history.redo(&mut state));
        assert_eq!(state, vec!["A", "B"]);
    }

    #[test]
    fn empty_stacks_are_no_ops() {
        let mut history: History<u32> = History::new(3);
        let mut state = 7;
        assert!(!history.undo(&mut state));
        assert!(!history.redo(&mut state));
        assert_eq!(state, 7);
    }

    #[test]
    fn save_clears_redo() {
        let mut history = History::new(3);
        let mut state = 1;
        history.save(&state);
        state = 2;
        history.undo(&mut state);
        assert!(history.can_redo());
        history.save(&state);
        assert!(!history.can_redo());
    }

    #[test]
    fn oldest_snapshot_evicted() {
        let mut history = History::new(2);
        let mut state = 0;
        for next in 1..=3 {
            history.save(&state);
            state = next;
        }
        assert_eq!(history.undo_depth(), 2);
        while history.undo(&mut state) {}
        assert_eq!(state, 1);
    }
}
