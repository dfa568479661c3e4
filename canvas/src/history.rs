//! History stack: linear undo/redo over full document snapshots.
//!
//! DESIGN
//! ======
//! The stack holds immutable [`Snapshot`]s with an index pointing at the
//! current one. A new committed mutation truncates everything beyond the
//! index before appending — redo history does not survive a fresh edit.
//! Undo/redo move the index and hand back the snapshot for the caller to
//! restore wholesale; there is no diffing or partial replay.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::consts::HISTORY_LIMIT;
use crate::document::Snapshot;

/// Linear snapshot stack. Always holds at least the seed snapshot, so the
/// index points at a valid "current" entry from construction on.
pub struct History {
    snapshots: Vec<Snapshot>,
    index: usize,
}

impl History {
    /// Seed the stack with the initial document state.
    #[must_use]
    pub fn new(initial: Snapshot) -> Self {
        Self { snapshots: vec![initial], index: 0 }
    }

    /// Record a committed mutation. Entries beyond the current index are
    /// discarded first; the oldest entry falls off past [`HISTORY_LIMIT`].
    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(snapshot);
        if self.snapshots.len() > HISTORY_LIMIT {
            self.snapshots.remove(0);
        }
        self.index = self.snapshots.len() - 1;
    }

    /// Whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    /// Whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    /// Step back and return the snapshot to restore. No-op at the bottom.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(&self.snapshots[self.index])
    }

    /// Step forward and return the snapshot to restore. No-op at the top.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(&self.snapshots[self.index])
    }

    /// The snapshot the index points at.
    #[must_use]
    pub fn current(&self) -> &Snapshot {
        &self.snapshots[self.index]
    }

    /// Number of retained snapshots.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }

    /// Position of the current snapshot.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}
