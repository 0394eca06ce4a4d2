//! Voxel data structures and operations

pub mod voxel;
pub mod layer;
pub mod texture;
pub mod container;
pub mod intent;
pub mod data;

pub use voxel::{FACE_COUNT, Face, Faces, Voxel, VoxelSpec, uniform_faces};
pub use layer::VoxelLayer;
pub use texture::{Texture, split_grid};
pub use container::VoxelContainer;
pub use intent::VoxelIntent;
pub use data::VoxelData;
