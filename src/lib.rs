//! Voxedit - transactional mutation engine for a voxel-art editor

pub mod core;
pub mod history;
pub mod animation;
pub mod voxel;
pub mod diff;
pub mod cache;
pub mod notify;
pub mod engine;

pub use engine::{Engine, Snapshot};
