//! Reversible mutation units and composite transactions.
//!
//! An intent's first application may submit attached child intents through
//! its [`Scope`]. Children are applied immediately and recorded in post-order,
//! so a transaction is a flat list whose last entry is the root:
//!
//! ```text
//! DeleteLayer
//! ├── RemoveVoxel(a)
//! └── RemoveVoxel(b)
//!
//! steps:   [RemoveVoxel(a), RemoveVoxel(b), DeleteLayer]
//! redo:     ─────────────────────────────────────────▶
//! undo:     ◀─────────────────────────────────────────
//! ```

use std::hash::Hash;

use super::change::ChangeSet;

/// An atomic, reversible mutation of a domain model.
pub trait Intent: Sized {
    /// Model the intent mutates.
    type Target;
    /// Key type reported as effected (positions or entity ids).
    type Key: Copy + Eq + Hash;

    /// Forward mutation.
    ///
    /// On the first call (`scope.is_first_call()`) the intent captures the
    /// state it needs for `unapply` and may submit attached children. On
    /// replays it must only redo its own mutation; children replay themselves.
    fn apply(&mut self, target: &mut Self::Target, scope: &mut Scope<'_, Self>);

    /// Exact inverse of the intent's own mutation, using captured state.
    fn unapply(&mut self, target: &mut Self::Target);

    /// Report effected keys and change categories.
    fn record(&self, changes: &mut ChangeSet<Self::Key>);
}

/// Execution context handed to [`Intent::apply`].
pub struct Scope<'a, I: Intent> {
    steps: Option<&'a mut Vec<I>>,
}

impl<'a, I: Intent> Scope<'a, I> {
    fn first(steps: &'a mut Vec<I>) -> Self {
        Self { steps: Some(steps) }
    }

    fn replay() -> Self {
        Self { steps: None }
    }

    /// True only on the very first forward application of the intent.
    pub fn is_first_call(&self) -> bool {
        self.steps.is_some()
    }

    /// Apply an attached child intent as part of the running transaction.
    ///
    /// # Panics
    /// When called during a replay. Children are only created on the first
    /// application; replays walk the recorded steps instead.
    pub fn submit(&mut self, target: &mut I::Target, mut child: I) {
        let Some(steps) = self.steps.as_deref_mut() else {
            panic!("attached intent submitted outside a first application");
        };
        child.apply(target, &mut Scope::first(&mut *steps));
        steps.push(child);
    }
}

/// One undoable unit: a root intent plus every attached child, flattened.
pub struct Transaction<I: Intent> {
    steps: Vec<I>,
}

impl<I: Intent> Transaction<I> {
    /// Apply `root` for the first time, collecting its attached children.
    pub fn run(target: &mut I::Target, mut root: I) -> Self {
        let mut steps = Vec::new();
        root.apply(target, &mut Scope::first(&mut steps));
        steps.push(root);
        Self { steps }
    }

    /// Re-apply every step in forward order.
    pub fn replay(&mut self, target: &mut I::Target) {
        for step in &mut self.steps {
            step.apply(target, &mut Scope::replay());
        }
    }

    /// Unapply every step, root first, children in reverse order.
    pub fn revert(&mut self, target: &mut I::Target) {
        for step in self.steps.iter_mut().rev() {
            step.unapply(target);
        }
    }

    /// Union of every step's effected keys.
    pub fn changes(&self) -> ChangeSet<I::Key> {
        let mut changes = ChangeSet::new();
        for step in &self.steps {
            step.record(&mut changes);
        }
        changes
    }

    /// The root intent.
    pub fn root(&self) -> &I {
        // run() always pushes the root
        &self.steps[self.steps.len() - 1]
    }

    /// Number of intents including the root.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[I] {
        &self.steps
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::history::change::ChangeFlags;

    /// Test model: an append-only journal of values.
    #[derive(Debug, Default, PartialEq)]
    pub struct Journal {
        pub values: Vec<i32>,
    }

    /// Test intents over [`Journal`].
    #[derive(Debug)]
    pub enum JournalIntent {
        Push(i32),
        /// Pushes each value as an attached child, then its own marker.
        Batch { values: Vec<i32>, marker: i32 },
        /// Nested composite to check depth-first ordering.
        Nested(i32),
    }

    impl Intent for JournalIntent {
        type Target = Journal;
        type Key = i32;

        fn apply(&mut self, target: &mut Journal, scope: &mut Scope<'_, Self>) {
            match self {
                JournalIntent::Push(value) => target.values.push(*value),
                JournalIntent::Batch { values, marker } => {
                    if scope.is_first_call() {
                        for value in values.iter() {
                            scope.submit(target, JournalIntent::Push(*value));
                        }
                    }
                    target.values.push(*marker);
                }
                JournalIntent::Nested(value) => {
                    if scope.is_first_call() {
                        scope.submit(target, JournalIntent::Batch {
                            values: vec![*value * 10],
                            marker: *value * 100,
                        });
                    }
                    target.values.push(*value);
                }
            }
        }

        fn unapply(&mut self, target: &mut Journal) {
            match self {
                JournalIntent::Push(value)
                | JournalIntent::Batch { marker: value, .. }
                | JournalIntent::Nested(value) => {
                    let popped = target.values.pop();
                    assert_eq!(popped, Some(*value), "journal unwound out of order");
                }
            }
        }

        fn record(&self, changes: &mut ChangeSet<i32>) {
            match self {
                JournalIntent::Push(value)
                | JournalIntent::Batch { marker: value, .. }
                | JournalIntent::Nested(value) => changes.insert(*value),
            }
            changes.mark(ChangeFlags::VOXELS);
        }
    }

    #[test]
    fn test_children_recorded_in_post_order() {
        let mut journal = Journal::default();
        let tx = Transaction::run(&mut journal, JournalIntent::Batch {
            values: vec![1, 2],
            marker: 9,
        });

        assert_eq!(journal.values, vec![1, 2, 9]);
        assert_eq!(tx.len(), 3);
        assert!(matches!(tx.root(), JournalIntent::Batch { marker: 9, .. }));
    }

    #[test]
    fn test_revert_is_stack_ordered() {
        let mut journal = Journal::default();
        let mut tx = Transaction::run(&mut journal, JournalIntent::Nested(3));
        assert_eq!(journal.values, vec![30, 300, 3]);

        // Journal asserts on every pop, so any ordering mistake panics here
        tx.revert(&mut journal);
        assert!(journal.values.is_empty());

        tx.replay(&mut journal);
        assert_eq!(journal.values, vec![30, 300, 3]);
    }

    #[test]
    fn test_changes_union_of_steps() {
        let mut journal = Journal::default();
        let tx = Transaction::run(&mut journal, JournalIntent::Batch {
            values: vec![4, 5],
            marker: 6,
        });
        let changes = tx.changes();
        assert_eq!(changes.key_count(), 3);
        assert!(changes.contains(&4) && changes.contains(&6));
    }

    #[test]
    #[should_panic(expected = "outside a first application")]
    fn test_submit_during_replay_panics() {
        let mut journal = Journal::default();
        let mut scope: Scope<'_, JournalIntent> = Scope::replay();
        scope.submit(&mut journal, JournalIntent::Push(1));
    }
}
