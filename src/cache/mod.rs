//! Memoized read projections over the document models.

pub mod memo;
pub mod animation;
pub mod voxel;

pub use memo::{KeyedMemo, Memo};
pub use animation::AnimationViews;
pub use voxel::VoxelViews;
