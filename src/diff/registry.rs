//! Pending-position buffers keyed by consumer and channel.

use std::collections::{HashMap, HashSet};

use crate::core::{Axis, IVec3};
use crate::history::ChangeSet;

/// Which family of buffers a poll reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Every position whose composited visible voxel changed.
    Visible,
    /// Positions whose visible voxel entered or left the selection.
    Selected,
    /// Visible changes on the plane `axis = coordinate`.
    Plane(Axis, i32),
    /// Visible changes for the model's own cached views. Its buffers are
    /// separate from [`Channel::Visible`], so no consumer id can drain them.
    View,
}

/// Net changes since a consumer's previous poll.
#[derive(Clone, Debug, PartialEq)]
pub struct Diff<T> {
    /// The consumer must discard everything it holds; `added` is complete.
    pub reset: bool,
    /// Positions that no longer hold anything.
    pub removed: Vec<IVec3>,
    /// Current state at every changed, occupied position.
    pub added: Vec<T>,
}

impl<T> Diff<T> {
    fn full(added: Vec<T>) -> Self {
        Self {
            reset: true,
            removed: Vec::new(),
            added,
        }
    }

    fn empty() -> Self {
        Self {
            reset: false,
            removed: Vec::new(),
            added: Vec::new(),
        }
    }

    /// True when there is nothing to apply.
    pub fn is_empty(&self) -> bool {
        !self.reset && self.removed.is_empty() && self.added.is_empty()
    }
}

/// Pending positions per consumer. The flag records whether the position was
/// occupied when the consumer last polled, so an add followed by a remove
/// nets out to nothing.
type Buffers = HashMap<String, HashMap<IVec3, bool>>;

/// Registry of consumer buffers.
///
/// A consumer without a buffer in a channel is uninitialized: its next poll
/// returns the full view and creates an empty buffer. Only initialized
/// buffers accumulate positions, and plane buffers only exist for planes
/// some consumer has polled.
#[derive(Debug, Default)]
pub struct DiffRegistry {
    visible: Buffers,
    selected: Buffers,
    view: Buffers,
    planes: HashMap<(Axis, i32), Buffers>,
    /// Positions holding a visible voxel.
    occupied: HashSet<IVec3>,
    /// Positions whose visible voxel is selected.
    current_selected: HashSet<IVec3>,
}

fn mark(buffers: &mut Buffers, position: IVec3, held: bool) {
    for pending in buffers.values_mut() {
        pending.entry(position).or_insert(held);
    }
}

impl DiffRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the keys of one history event into every buffer.
    ///
    /// `state_at` reports the visible voxel at a position after the event:
    /// `None` when the cell is empty, otherwise its selection flag. The
    /// everything sentinel must go through [`DiffRegistry::reset`] instead.
    pub fn record(&mut self, changes: &ChangeSet<IVec3>, state_at: impl Fn(IVec3) -> Option<bool>) {
        debug_assert!(!changes.is_everything(), "everything events reset the registry");

        for &position in changes.keys() {
            let state = state_at(position);

            let was_occupied = if state.is_some() {
                !self.occupied.insert(position)
            } else {
                self.occupied.remove(&position)
            };
            mark(&mut self.visible, position, was_occupied);
            mark(&mut self.view, position, was_occupied);
            for axis in Axis::ALL {
                if let Some(consumers) = self.planes.get_mut(&(axis, axis.coordinate(position))) {
                    mark(consumers, position, was_occupied);
                }
            }

            let was_selected = self.current_selected.contains(&position);
            let now_selected = state == Some(true);
            if was_selected != now_selected {
                if now_selected {
                    self.current_selected.insert(position);
                } else {
                    self.current_selected.remove(&position);
                }
                mark(&mut self.selected, position, was_selected);
            }
        }
    }

    /// Drop every buffer so each consumer's next poll starts over.
    ///
    /// `visible` lists every position holding a visible voxel now, `selected`
    /// those whose visible voxel is selected.
    pub fn reset(
        &mut self,
        visible: impl IntoIterator<Item = IVec3>,
        selected: impl IntoIterator<Item = IVec3>,
    ) {
        self.visible.clear();
        self.selected.clear();
        self.view.clear();
        self.planes.clear();
        self.occupied = visible.into_iter().collect();
        self.current_selected = selected.into_iter().collect();
        log::debug!("diff registry reset");
    }

    /// Poll one consumer's buffer in `channel`.
    ///
    /// `lookup` resolves a pending position to its current state, `snapshot`
    /// produces the full view for an uninitialized consumer.
    pub fn poll<T>(
        &mut self,
        channel: Channel,
        consumer: &str,
        lookup: impl Fn(IVec3) -> Option<T>,
        snapshot: impl FnOnce() -> Vec<T>,
    ) -> Diff<T> {
        let buffers = self.buffers_mut(channel);
        let Some(pending) = buffers.get_mut(consumer) else {
            buffers.insert(consumer.to_owned(), HashMap::new());
            return Diff::full(snapshot());
        };

        let mut positions: Vec<(IVec3, bool)> = pending.drain().collect();
        positions.sort_unstable_by_key(|(p, _)| p.to_array());

        let mut diff = Diff::empty();
        for (position, held) in positions {
            match lookup(position) {
                Some(state) => diff.added.push(state),
                None if held => diff.removed.push(position),
                None => {}
            }
        }
        diff
    }

    /// Forget a consumer's buffer so its next poll returns the full view.
    pub fn invalidate(&mut self, channel: Channel, consumer: &str) {
        let removed = match channel {
            Channel::Plane(axis, coordinate) => {
                let key = (axis, coordinate);
                let removed = self
                    .planes
                    .get_mut(&key)
                    .is_some_and(|consumers| consumers.remove(consumer).is_some());
                if self.planes.get(&key).is_some_and(HashMap::is_empty) {
                    self.planes.remove(&key);
                }
                removed
            }
            _ => self.buffers_mut(channel).remove(consumer).is_some(),
        };
        if removed {
            log::trace!("invalidated {channel:?} buffer of {consumer}");
        }
    }

    /// True once `consumer` has polled `channel` and not been reset since.
    pub fn is_initialized(&self, channel: Channel, consumer: &str) -> bool {
        match channel {
            Channel::Visible => self.visible.contains_key(consumer),
            Channel::Selected => self.selected.contains_key(consumer),
            Channel::View => self.view.contains_key(consumer),
            Channel::Plane(axis, coordinate) => self
                .planes
                .get(&(axis, coordinate))
                .is_some_and(|consumers| consumers.contains_key(consumer)),
        }
    }

    /// Number of positions waiting for `consumer` in `channel`.
    pub fn pending_count(&self, channel: Channel, consumer: &str) -> usize {
        let buffers = match channel {
            Channel::Visible => Some(&self.visible),
            Channel::Selected => Some(&self.selected),
            Channel::View => Some(&self.view),
            Channel::Plane(axis, coordinate) => self.planes.get(&(axis, coordinate)),
        };
        buffers
            .and_then(|buffers| buffers.get(consumer))
            .map_or(0, HashMap::len)
    }

    /// Number of planes with at least one initialized consumer.
    pub fn tracked_plane_count(&self) -> usize {
        self.planes.len()
    }

    fn buffers_mut(&mut self, channel: Channel) -> &mut Buffers {
        match channel {
            Channel::Visible => &mut self.visible,
            Channel::Selected => &mut self.selected,
            Channel::View => &mut self.view,
            Channel::Plane(axis, coordinate) => self.planes.entry((axis, coordinate)).or_default(),
        }
    }
}
