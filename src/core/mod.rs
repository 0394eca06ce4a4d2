//! Core engine types and utilities

pub mod types;
pub mod error;
pub mod logging;
pub mod config;
pub mod color;
pub mod id;

pub use types::*;
pub use error::Error;
pub use config::EngineConfig;
pub use color::Color;
pub use id::{FrameId, IdAllocator, LayerId, PointId, TextureId, VoxelId};
