//! Animation domain: points, lines and frames.

pub mod container;
pub mod intent;
pub mod data;

pub use container::{AnimationContainer, Frame, LineKey, Point};
pub use intent::AnimationIntent;
pub use data::AnimationData;
