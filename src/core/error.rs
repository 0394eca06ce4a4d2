//! Error types for the editor engine
//!
//! Editing operations never fail with an error: a rejected operation returns
//! `false` or `None`. These variants cover the I/O around the engine.

use thiserror::Error;

/// Main error type for the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Texture error: {0}")]
    Texture(String),
}
