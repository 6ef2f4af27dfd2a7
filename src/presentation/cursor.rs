//! Staged cursor, navigation guards and live-position bookkeeping

use serde::{Deserialize, Serialize};

use super::store::{SlideStore, StoreChange};

/// A (stack, slide) pair addressing one slide in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub stack_index: usize,
    pub slide_index: usize,
}

impl Position {
    pub fn new(stack_index: usize, slide_index: usize) -> Self {
        Self {
            stack_index,
            slide_index,
        }
    }
}

/// What is being projected. `None` is blackout; there is no half-null state.
pub type LivePosition = Option<Position>;

/// How a store mutation affects the live position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveAdjustment {
    Unchanged,
    Moved(Position),
    Cleared,
}

/// Work out how the live position follows a store mutation
pub fn adjust_live(live: LivePosition, change: &StoreChange) -> LiveAdjustment {
    let Some(pos) = live else {
        return LiveAdjustment::Unchanged;
    };

    match *change {
        StoreChange::StackRemoved { index } => {
            if pos.stack_index == index {
                LiveAdjustment::Cleared
            } else if pos.stack_index > index {
                LiveAdjustment::Moved(Position::new(pos.stack_index - 1, pos.slide_index))
            } else {
                LiveAdjustment::Unchanged
            }
        }
        StoreChange::SlideRemoved {
            stack_index,
            slide_index,
        } if stack_index == pos.stack_index => {
            if pos.slide_index == slide_index {
                LiveAdjustment::Cleared
            } else if pos.slide_index > slide_index {
                LiveAdjustment::Moved(Position::new(pos.stack_index, pos.slide_index - 1))
            } else {
                LiveAdjustment::Unchanged
            }
        }
        _ => LiveAdjustment::Unchanged,
    }
}

/// Operator's staged (preview) position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StagingCursor {
    staged: Position,
}

impl StagingCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.staged
    }

    pub fn reset(&mut self) {
        self.staged = Position::default();
    }

    pub fn can_go_prev_slide(&self) -> bool {
        self.staged.slide_index > 0
    }

    pub fn can_go_next_slide(&self, store: &SlideStore) -> bool {
        self.staged.slide_index + 1 < store.slide_count(self.staged.stack_index)
    }

    pub fn can_go_prev_stack(&self) -> bool {
        self.staged.stack_index > 0
    }

    pub fn can_go_next_stack(&self, store: &SlideStore) -> bool {
        self.staged.stack_index + 1 < store.len()
    }

    /// Each navigation returns whether the staged position changed
    pub fn next_slide(&mut self, store: &SlideStore) -> bool {
        if !self.can_go_next_slide(store) {
            return false;
        }
        self.staged.slide_index += 1;
        true
    }

    pub fn prev_slide(&mut self) -> bool {
        if !self.can_go_prev_slide() {
            return false;
        }
        self.staged.slide_index -= 1;
        true
    }

    pub fn next_stack(&mut self, store: &SlideStore) -> bool {
        if !self.can_go_next_stack(store) {
            return false;
        }
        self.staged = Position::new(self.staged.stack_index + 1, 0);
        true
    }

    pub fn prev_stack(&mut self) -> bool {
        if !self.can_go_prev_stack() {
            return false;
        }
        self.staged = Position::new(self.staged.stack_index - 1, 0);
        true
    }

    pub fn stage_stack(&mut self, store: &SlideStore, stack_index: usize) -> bool {
        if stack_index >= store.len() {
            return false;
        }
        let target = Position::new(stack_index, 0);
        let changed = self.staged != target;
        self.staged = target;
        changed
    }

    pub fn stage_slide(&mut self, store: &SlideStore, stack_index: usize, slide_index: usize) -> bool {
        if store.slide(stack_index, slide_index).is_none() {
            return false;
        }
        let target = Position::new(stack_index, slide_index);
        let changed = self.staged != target;
        self.staged = target;
        changed
    }

    /// Keep the cursor valid after a store mutation. Returns whether it moved.
    pub fn follow_change(&mut self, store: &SlideStore, change: &StoreChange) -> bool {
        let before = self.staged;

        if let StoreChange::StackRemoved { index } = *change {
            if self.staged.stack_index > index {
                self.staged.stack_index -= 1;
            } else if self.staged.stack_index == index {
                self.staged.slide_index = 0;
            }
        }
        self.clamp(store);

        self.staged != before
    }

    /// Force both indices back into range
    pub fn clamp(&mut self, store: &SlideStore) {
        if store.is_empty() {
            self.staged = Position::default();
            return;
        }
        if self.staged.stack_index >= store.len() {
            self.staged = Position::new(store.len() - 1, 0);
        }
        let count = store.slide_count(self.staged.stack_index);
        if count == 0 {
            self.staged.slide_index = 0;
        } else if self.staged.slide_index >= count {
            self.staged.slide_index = count - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::slide::Slide;

    fn store_with(counts: &[usize]) -> SlideStore {
        let mut store = SlideStore::new();
        for (i, count) in counts.iter().enumerate() {
            store.add_stack(format!("Stack {}", i));
            for j in 0..*count {
                store.add_slide(
                    i,
                    Slide::Custom {
                        title: format!("{}-{}", i, j),
                        html: String::new(),
                        background: None,
                    },
                );
            }
        }
        store
    }

    #[test]
    fn test_navigation_respects_bounds() {
        let store = store_with(&[2, 1]);
        let mut cursor = StagingCursor::new();

        assert!(!cursor.prev_slide());
        assert!(cursor.next_slide(&store));
        assert!(!cursor.next_slide(&store));
        assert_eq!(cursor.position(), Position::new(0, 1));

        assert!(cursor.next_stack(&store));
        assert_eq!(cursor.position(), Position::new(1, 0));
        assert!(!cursor.next_stack(&store));
        assert!(cursor.prev_stack());
        assert_eq!(cursor.position(), Position::new(0, 0));
    }

    #[test]
    fn test_stage_slide_rejects_invalid_targets() {
        let store = store_with(&[2]);
        let mut cursor = StagingCursor::new();
        assert!(!cursor.stage_slide(&store, 0, 5));
        assert!(!cursor.stage_slide(&store, 3, 0));
        assert!(!cursor.stage_stack(&store, 1));
        assert!(cursor.stage_slide(&store, 0, 1));
        assert_eq!(cursor.position(), Position::new(0, 1));
    }

    #[test]
    fn test_removing_staged_tail_slide_clamps() {
        let mut store = store_with(&[3]);
        let mut cursor = StagingCursor::new();
        cursor.stage_slide(&store, 0, 2);

        let change = store.remove_slide(0, 2).unwrap();
        assert!(cursor.follow_change(&store, &change));
        assert_eq!(cursor.position(), Position::new(0, 1));
    }

    #[test]
    fn test_removing_earlier_stack_keeps_staged_stack() {
        let mut store = store_with(&[1, 1, 3]);
        let mut cursor = StagingCursor::new();
        cursor.stage_slide(&store, 2, 2);

        let change = store.remove_stack(0).unwrap();
        cursor.follow_change(&store, &change);
        assert_eq!(cursor.position(), Position::new(1, 2));
    }

    #[test]
    fn test_live_follows_stack_removal() {
        let live = Some(Position::new(2, 1));
        assert_eq!(
            adjust_live(live, &StoreChange::StackRemoved { index: 2 }),
            LiveAdjustment::Cleared
        );
        assert_eq!(
            adjust_live(live, &StoreChange::StackRemoved { index: 0 }),
            LiveAdjustment::Moved(Position::new(1, 1))
        );
        assert_eq!(
            adjust_live(live, &StoreChange::SlideRemoved { stack_index: 2, slide_index: 0 }),
            LiveAdjustment::Moved(Position::new(2, 0))
        );
        assert_eq!(
            adjust_live(None, &StoreChange::StackRemoved { index: 0 }),
            LiveAdjustment::Unchanged
        );
    }
}
