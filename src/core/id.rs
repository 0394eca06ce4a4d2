//! Entity identifiers and id allocation.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Unique identifier for an animation point.
    PointId
);
entity_id!(
    /// Unique identifier for an animation frame.
    FrameId
);
entity_id!(
    /// Unique identifier for a voxel.
    VoxelId
);
entity_id!(
    /// Unique identifier for a voxel layer.
    LayerId
);
entity_id!(
    /// Unique identifier for a texture.
    TextureId
);

/// Monotonic id source that skips ids still in use.
///
/// The counter never moves backwards, so an id freed by a removal is not
/// handed out again while an undo could still bring the old entity back.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    /// Create an allocator starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next id for which `in_use` is false.
    pub fn allocate(&mut self, mut in_use: impl FnMut(u32) -> bool) -> u32 {
        loop {
            let id = self.next;
            self.next = self.next.wrapping_add(1);
            if !in_use(id) {
                return id;
            }
        }
    }
}
