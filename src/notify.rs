//! Change notifications for editor observers.
//!
//! Domains queue [`Notice`]s while the engine lock is held; the engine hands
//! them to listeners after releasing it, so a listener may call back in.

use std::sync::Arc;

/// A queued notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Notice {
    AnimationChanged,
    VoxelChanged,
    LayerStateChanged,
    TextureChanged,
    /// An intent was applied while frozen
    FrozenAction,
    FrozenUndo,
    FrozenRedo,
}

/// Observer of engine changes. Every callback defaults to a no-op.
pub trait ChangeListener: Send + Sync {
    fn on_animation_changed(&self) {}
    fn on_voxel_changed(&self) {}
    fn on_layer_state_changed(&self) {}
    fn on_texture_changed(&self) {}
    fn on_frozen_action(&self) {}
    fn on_frozen_undo(&self) {}
    fn on_frozen_redo(&self) {}
}

/// Handle returned by listener registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registered listeners in registration order.
#[derive(Default)]
pub struct Listeners {
    entries: Vec<(ListenerId, Arc<dyn ChangeListener>)>,
    next_id: u64,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Returns false if the id was not registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clone the current listener set so dispatch can run unlocked.
    pub fn snapshot(&self) -> Vec<Arc<dyn ChangeListener>> {
        self.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
    }
}

/// Deliver notices in order to every listener.
pub fn dispatch(listeners: &[Arc<dyn ChangeListener>], notices: &[Notice]) {
    for notice in notices {
        for listener in listeners {
            match notice {
                Notice::AnimationChanged => listener.on_animation_changed(),
                Notice::VoxelChanged => listener.on_voxel_changed(),
                Notice::LayerStateChanged => listener.on_layer_state_changed(),
                Notice::TextureChanged => listener.on_texture_changed(),
                Notice::FrozenAction => listener.on_frozen_action(),
                Notice::FrozenUndo => listener.on_frozen_undo(),
                Notice::FrozenRedo => listener.on_frozen_redo(),
            }
        }
    }
}
