//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;

/// Tunables for a document engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Add operations are rejected once a layer holds this many voxels.
    pub max_voxels_per_layer: usize,
    /// Edge length in pixels of the tiles cut by a texture grid import.
    pub texture_tile_size: u32,
    /// Name of the layer created by a fresh start.
    pub default_layer_name: String,
    /// Name of the layer produced by merging visible layers.
    pub merged_layer_name: String,
    /// Name of the layer receiving migrated voxels.
    pub migrated_layer_name: String,
    /// Maximum undo entries per domain. `None` keeps everything.
    pub history_limit: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_voxels_per_layer: 100_000,
            texture_tile_size: 32,
            default_layer_name: "Layer".to_string(),
            merged_layer_name: "Merged".to_string(),
            migrated_layer_name: "Migrated".to_string(),
            history_limit: None,
        }
    }
}

impl EngineConfig {
    /// Set the per-layer voxel capacity.
    pub fn with_max_voxels_per_layer(mut self, max: usize) -> Self {
        self.max_voxels_per_layer = max;
        self
    }

    /// Set the undo depth limit.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Check values that would make the engine unusable.
    pub fn validate(&self) -> Result<()> {
        if self.max_voxels_per_layer == 0 {
            return Err(Error::Config("max_voxels_per_layer must be positive".into()));
        }
        if self.texture_tile_size == 0 {
            return Err(Error::Config("texture_tile_size must be positive".into()));
        }
        if self.history_limit == Some(0) {
            return Err(Error::Config("history_limit must be positive when set".into()));
        }
        Ok(())
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}
