//! Whole-document persistence.
//!
//! Snapshots bypass history: loading one replaces both models wholesale.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animation::AnimationContainer;
use crate::core::error::Error;
use crate::core::types::Result;
use crate::voxel::VoxelContainer;

/// Serialized form of a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub animation: AnimationContainer,
    pub voxels: VoxelContainer,
}

impl Snapshot {
    /// Current snapshot format version.
    pub const VERSION: u32 = 1;

    pub fn new(animation: AnimationContainer, voxels: VoxelContainer) -> Self {
        Self {
            version: Self::VERSION,
            animation,
            voxels,
        }
    }

    /// Save as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        log::info!("saved snapshot to {}", path.display());
        Ok(())
    }

    /// Load a snapshot and rebuild its indices.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let mut snapshot: Self = serde_json::from_str(&json)?;
        snapshot.prepare()?;
        log::info!(
            "loaded snapshot from {} ({} voxels, {} points)",
            path.display(),
            snapshot.voxels.voxel_count(),
            snapshot.animation.point_count()
        );
        Ok(snapshot)
    }

    /// Check version and references, then rebuild derived indices.
    pub(crate) fn prepare(&mut self) -> Result<()> {
        if self.version != Self::VERSION {
            return Err(Error::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                self.version,
                Self::VERSION
            )));
        }
        self.check_animation()?;
        self.animation.rebuild_index();
        self.voxels.rebuild_indices()
    }

    fn check_animation(&self) -> Result<()> {
        let model = &self.animation;
        if let Some(line) = model
            .lines()
            .find(|line| !model.contains_point(line.low()) || !model.contains_point(line.high()))
        {
            return Err(Error::Snapshot(format!("line {line} references a missing point")));
        }
        for frame_id in model.frame_ids() {
            let overrides_missing = model
                .frame(frame_id)
                .is_some_and(|frame| frame.points.keys().any(|point| !model.contains_point(*point)));
            if overrides_missing {
                return Err(Error::Snapshot(format!("frame {frame_id} overrides a missing point")));
            }
        }
        if model.active_frame().is_some_and(|frame| !model.contains_frame(frame)) {
            return Err(Error::Snapshot("active frame does not exist".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationIntent, LineKey};
    use crate::core::{PointId, Vec3};
    use crate::history::Transaction;
    use tempfile::tempdir;

    fn animation() -> AnimationContainer {
        let mut model = AnimationContainer::new();
        Transaction::run(&mut model, AnimationIntent::AddPoint { id: PointId(0), position: Vec3::ZERO });
        Transaction::run(&mut model, AnimationIntent::AddPoint { id: PointId(1), position: Vec3::X });
        Transaction::run(&mut model, AnimationIntent::Connect {
            line: LineKey::new(PointId(0), PointId(1)),
        });
        model
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docs").join("scene.json");
        let snapshot = Snapshot::new(animation(), VoxelContainer::new());

        snapshot.save(&path).unwrap();
        let loaded = Snapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.animation.lines_of(PointId(0)).len(), 1);
    }

    #[test]
    fn test_load_rejects_dangling_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let mut json = serde_json::to_value(Snapshot::new(animation(), VoxelContainer::new())).unwrap();
        json["animation"]["points"].as_object_mut().unwrap().remove("1");
        std::fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(Snapshot::load(&path), Err(Error::Snapshot(_))));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.json");
        let mut snapshot = Snapshot::new(AnimationContainer::new(), VoxelContainer::new());
        snapshot.version = 99;
        snapshot.save(&path).unwrap();

        assert!(matches!(Snapshot::load(&path), Err(Error::Snapshot(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(Snapshot::load(&dir.path().join("nope.json")), Err(Error::Io(_))));
    }
}
