//! Change sets reported by history operations.

use std::collections::HashSet;
use std::hash::Hash;

use bitflags::bitflags;

bitflags! {
    /// Categories of model state touched by a transaction.
    ///
    /// Derived views subscribe to the categories they read so that, for
    /// example, a recolor does not throw away the layer list.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangeFlags: u8 {
        const POINTS    = 1 << 0;
        const LINES     = 1 << 1;
        const FRAMES    = 1 << 2;
        const VOXELS    = 1 << 3;
        const SELECTION = 1 << 4;
        const LAYERS    = 1 << 5;
        const TEXTURES  = 1 << 6;
    }
}

/// Effected keys of one or more intents.
///
/// `everything` is the sentinel for changes too broad to enumerate. Consumers
/// treat it as "recompute from scratch".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeSet<K: Eq + Hash> {
    keys: HashSet<K>,
    everything: bool,
    flags: ChangeFlags,
}

impl<K: Eq + Hash> Default for ChangeSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> ChangeSet<K> {
    /// Empty change set.
    pub fn new() -> Self {
        Self {
            keys: HashSet::new(),
            everything: false,
            flags: ChangeFlags::empty(),
        }
    }

    /// Change set covering the whole model.
    pub fn everything() -> Self {
        Self {
            keys: HashSet::new(),
            everything: true,
            flags: ChangeFlags::all(),
        }
    }

    pub fn insert(&mut self, key: K) {
        if !self.everything {
            self.keys.insert(key);
        }
    }

    pub fn extend(&mut self, keys: impl IntoIterator<Item = K>) {
        if !self.everything {
            self.keys.extend(keys);
        }
    }

    /// Add categories without adding keys.
    pub fn mark(&mut self, flags: ChangeFlags) {
        self.flags |= flags;
    }

    /// Collapse into the everything sentinel.
    pub fn mark_everything(&mut self) {
        self.everything = true;
        self.keys.clear();
        self.flags = ChangeFlags::all();
    }

    /// Union with another change set.
    pub fn merge(&mut self, other: ChangeSet<K>) {
        if other.everything {
            self.mark_everything();
        } else {
            self.flags |= other.flags;
            self.extend(other.keys);
        }
    }

    pub fn is_everything(&self) -> bool {
        self.everything
    }

    pub fn flags(&self) -> ChangeFlags {
        self.flags
    }

    pub fn touches(&self, flags: ChangeFlags) -> bool {
        self.flags.intersects(flags)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.everything || self.keys.contains(key)
    }

    /// Enumerated keys. Empty for the everything sentinel.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// True when nothing at all was touched.
    pub fn is_empty(&self) -> bool {
        !self.everything && self.keys.is_empty() && self.flags.is_empty()
    }
}
