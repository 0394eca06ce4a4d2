//! Process-wide editing engine.
//!
//! The engine owns one document (animation plus voxel domain) behind a single
//! lock. Every operation runs with exclusive access; change notices queued
//! during an operation are delivered to listeners after the lock is released,
//! so a listener may call straight back into the engine.

pub mod snapshot;

pub use snapshot::Snapshot;

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::animation::AnimationData;
use crate::core::EngineConfig;
use crate::core::types::Result;
use crate::notify::{ChangeListener, ListenerId, Listeners, Notice, dispatch};
use crate::voxel::VoxelData;

/// Both editing domains of one document.
struct Document {
    animation: AnimationData,
    voxels: VoxelData,
}

impl Document {
    fn new(config: &EngineConfig) -> Self {
        Self {
            animation: AnimationData::new(config),
            voxels: VoxelData::new(config),
        }
    }

    fn take_notices(&mut self) -> Vec<Notice> {
        let mut notices = self.animation.take_notices();
        notices.extend(self.voxels.take_notices());
        notices
    }
}

/// The editing engine.
pub struct Engine {
    config: EngineConfig,
    document: Mutex<Document>,
    listeners: Mutex<Listeners>,
}

static GLOBAL: OnceLock<Engine> = OnceLock::new();

impl Engine {
    /// Create an independent engine with a fresh document.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        log::debug!("engine created: {config:?}");
        Self {
            document: Mutex::new(Document::new(&config)),
            listeners: Mutex::new(Listeners::new()),
            config,
        }
    }

    /// The process-wide engine, created with the default config on first use.
    pub fn global() -> &'static Engine {
        GLOBAL.get_or_init(|| Self::build(EngineConfig::default()))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `f` with exclusive access to the animation domain.
    pub fn animation<R>(&self, f: impl FnOnce(&mut AnimationData) -> R) -> R {
        self.with_document(|document| f(&mut document.animation))
    }

    /// Run `f` with exclusive access to the voxel domain.
    pub fn voxels<R>(&self, f: impl FnOnce(&mut VoxelData) -> R) -> R {
        self.with_document(|document| f(&mut document.voxels))
    }

    /// Replace the document with an empty one and drop all history.
    pub fn fresh_start(&self) {
        self.with_document(|document| {
            document.animation.replace_model(Default::default());
            document.voxels.fresh_start();
        });
        log::info!("fresh start");
    }

    /// Replace the document with a loaded snapshot and drop all history.
    pub fn load(&self, mut snapshot: Snapshot) -> Result<()> {
        snapshot.prepare()?;
        self.with_document(|document| {
            document.animation.replace_model(snapshot.animation);
            document.voxels.replace_model(snapshot.voxels);
        });
        Ok(())
    }

    /// Copy of the current document for persistence.
    pub fn snapshot(&self) -> Snapshot {
        let document = self.document.lock();
        Snapshot::new(document.animation.model().clone(), document.voxels.model().clone())
    }

    /// Freeze or thaw both histories.
    pub fn set_frozen(&self, frozen: bool) {
        let mut document = self.document.lock();
        document.animation.set_frozen(frozen);
        document.voxels.set_frozen(frozen);
        log::debug!("engine frozen: {frozen}");
    }

    pub fn add_listener(&self, listener: Arc<dyn ChangeListener>) -> ListenerId {
        self.listeners.lock().add(listener)
    }

    /// Returns false if the id was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.lock().remove(id)
    }

    fn with_document<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let (result, notices) = {
            let mut document = self.document.lock();
            let result = f(&mut document);
            (result, document.take_notices())
        };
        if !notices.is_empty() {
            let listeners = self.listeners.lock().snapshot();
            dispatch(&listeners, &notices);
        }
        result
    }
}
