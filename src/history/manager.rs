//! Undo/redo log for one domain.
//!
//! ```text
//! submit(t5)
//!   undo: [t1, t2, t3, t4, t5]   redo: []
//! undo() x2
//!   undo: [t1, t2, t3]           redo: [t5, t4]
//! submit(t6)  <-- new branch, clears redo
//!   undo: [t1, t2, t3, t6]       redo: []
//! ```
//!
//! While frozen, operations still mutate the model; the returned event is
//! tagged so callers route it to the frozen notification channel.

use std::collections::VecDeque;

use super::change::ChangeSet;
use super::intent::{Intent, Transaction};

/// Which history operation produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryAction {
    Apply,
    Undo,
    Redo,
    Clear,
}

/// Outcome of a state-changing history operation.
#[derive(Clone, Debug)]
pub struct HistoryEvent<K: Eq + std::hash::Hash> {
    pub action: HistoryAction,
    /// Set when the manager was frozen during the operation.
    pub frozen: bool,
    /// Union of the effected keys of every intent in the transaction.
    pub changes: ChangeSet<K>,
}

/// Undo and redo stacks of top-level transactions.
pub struct HistoryManager<I: Intent> {
    undo_stack: VecDeque<Transaction<I>>,
    redo_stack: Vec<Transaction<I>>,
    frozen: bool,
    limit: Option<usize>,
}

impl<I: Intent> HistoryManager<I> {
    /// Create an unbounded history.
    pub fn new() -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            frozen: false,
            limit: None,
        }
    }

    /// Keep at most `limit` undo entries, evicting the oldest.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Apply a new top-level intent and record it for undo.
    pub fn submit(&mut self, target: &mut I::Target, intent: I) -> HistoryEvent<I::Key> {
        let transaction = Transaction::run(target, intent);
        let changes = transaction.changes();
        self.redo_stack.clear();
        self.undo_stack.push_back(transaction);
        if let Some(limit) = self.limit {
            while self.undo_stack.len() > limit {
                self.undo_stack.pop_front();
            }
        }
        self.event(HistoryAction::Apply, changes)
    }

    /// Revert the newest transaction. No-op on an empty log.
    pub fn undo(&mut self, target: &mut I::Target) -> Option<HistoryEvent<I::Key>> {
        let mut transaction = self.undo_stack.pop_back()?;
        transaction.revert(target);
        let changes = transaction.changes();
        self.redo_stack.push(transaction);
        Some(self.event(HistoryAction::Undo, changes))
    }

    /// Replay the most recently undone transaction. No-op on an empty log.
    pub fn redo(&mut self, target: &mut I::Target) -> Option<HistoryEvent<I::Key>> {
        let mut transaction = self.redo_stack.pop()?;
        transaction.replay(target);
        let changes = transaction.changes();
        self.undo_stack.push_back(transaction);
        Some(self.event(HistoryAction::Redo, changes))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Drop both logs. The model is left untouched.
    pub fn clear(&mut self) -> HistoryEvent<I::Key> {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.event(HistoryAction::Clear, ChangeSet::new())
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn event(&self, action: HistoryAction, changes: ChangeSet<I::Key>) -> HistoryEvent<I::Key> {
        HistoryEvent {
            action,
            frozen: self.frozen,
            changes,
        }
    }
}

impl<I: Intent> Default for HistoryManager<I> {
    fn default() -> Self {
        Self::new()
    }
}
