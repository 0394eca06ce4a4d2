//! Animation editing operations.

use std::sync::Arc;

use crate::cache::AnimationViews;
use crate::core::{EngineConfig, FrameId, IdAllocator, PointId, Vec3};
use crate::history::{HistoryAction, HistoryEvent, HistoryManager};
use crate::notify::Notice;

use super::container::{AnimationContainer, LineKey, Point};
use super::intent::AnimationIntent;

/// The animation domain: model, history and cached views.
///
/// Operations validate their preconditions and return `false`/`None`
/// without touching history when they fail.
pub struct AnimationData {
    model: AnimationContainer,
    history: HistoryManager<AnimationIntent>,
    views: AnimationViews,
    point_ids: IdAllocator,
    frame_ids: IdAllocator,
    outbox: Vec<Notice>,
}

impl AnimationData {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            model: AnimationContainer::new(),
            history: HistoryManager::new().with_limit(config.history_limit),
            views: AnimationViews::new(),
            point_ids: IdAllocator::new(),
            frame_ids: IdAllocator::new(),
            outbox: Vec::new(),
        }
    }

    pub fn model(&self) -> &AnimationContainer {
        &self.model
    }

    /// Swap in a whole model, dropping history.
    pub(crate) fn replace_model(&mut self, mut model: AnimationContainer) {
        model.rebuild_index();
        self.model = model;
        self.history.clear();
        self.views.invalidate_all();
        self.outbox.push(Notice::AnimationChanged);
    }

    pub(crate) fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn set_frozen(&mut self, frozen: bool) {
        self.history.set_frozen(frozen);
    }

    fn submit(&mut self, intent: AnimationIntent) {
        let event = self.history.submit(&mut self.model, intent);
        self.settle(event);
    }

    fn settle(&mut self, event: HistoryEvent<PointId>) {
        if event.action == HistoryAction::Clear {
            return;
        }
        self.views.invalidate(&event.changes);
        let notice = match (event.frozen, event.action) {
            (true, HistoryAction::Apply) => Notice::FrozenAction,
            (true, HistoryAction::Undo) => Notice::FrozenUndo,
            (true, HistoryAction::Redo) => Notice::FrozenRedo,
            _ => Notice::AnimationChanged,
        };
        self.outbox.push(notice);
    }

    // -- Points ------------------------------------------------------------

    pub fn is_valid(&self, id: PointId) -> bool {
        self.model.contains_point(id)
    }

    /// Add a point and return its new id.
    pub fn add_point(&mut self, position: Vec3) -> PointId {
        let model = &self.model;
        let id = PointId(self.point_ids.allocate(|raw| model.contains_point(PointId(raw))));
        self.submit(AnimationIntent::AddPoint { id, position });
        id
    }

    /// Remove a point together with its lines and frame overrides.
    pub fn remove_point(&mut self, id: PointId) -> bool {
        if !self.is_valid(id) {
            log::debug!("remove_point rejected: unknown point {id}");
            return false;
        }
        self.submit(AnimationIntent::RemovePoint { id, removed: None });
        true
    }

    /// Move the base point, or place an override when a frame is active.
    pub fn move_point(&mut self, id: PointId, position: Vec3) -> bool {
        if !self.is_valid(id) {
            log::debug!("move_point rejected: unknown point {id}");
            return false;
        }
        let intent = match self.model.active_frame() {
            None => AnimationIntent::MovePoint { id, position, previous: None },
            Some(frame) => AnimationIntent::PlaceFramePoint {
                frame,
                point: id,
                position,
                previous: None,
            },
        };
        self.submit(intent);
        true
    }

    /// Position of a point through the active frame.
    pub fn get_point(&self, id: PointId) -> Option<Point> {
        self.model
            .resolved_position(id)
            .map(|position| Point { id, position })
    }

    pub fn get_points(&mut self) -> Arc<[Point]> {
        self.views.points(&self.model)
    }

    /// Remove every point. Returns false if there are none.
    pub fn clear(&mut self) -> bool {
        if self.model.point_count() == 0 {
            return false;
        }
        self.submit(AnimationIntent::Clear);
        true
    }

    // -- Lines -------------------------------------------------------------

    pub fn are_connected(&self, a: PointId, b: PointId) -> bool {
        self.model.is_connected(LineKey::new(a, b))
    }

    pub fn connect(&mut self, a: PointId, b: PointId) -> bool {
        if a == b || !self.is_valid(a) || !self.is_valid(b) || self.are_connected(a, b) {
            log::debug!("connect rejected: {a} -> {b}");
            return false;
        }
        self.submit(AnimationIntent::Connect { line: LineKey::new(a, b) });
        true
    }

    pub fn disconnect(&mut self, a: PointId, b: PointId) -> bool {
        if !self.is_valid(a) || !self.is_valid(b) || !self.are_connected(a, b) {
            log::debug!("disconnect rejected: {a} -> {b}");
            return false;
        }
        self.submit(AnimationIntent::Disconnect { line: LineKey::new(a, b) });
        true
    }

    /// Every line as its two resolved endpoints.
    pub fn get_lines(&mut self) -> Arc<[(Point, Point)]> {
        self.views.lines(&self.model)
    }

    // -- Frames ------------------------------------------------------------

    /// Activate a frame, or the base pose with `None`.
    pub fn select_frame(&mut self, frame: Option<FrameId>) -> bool {
        if let Some(id) = frame {
            if !self.model.contains_frame(id) {
                log::debug!("select_frame rejected: unknown frame {id}");
                return false;
            }
        }
        if self.model.active_frame() == frame {
            log::debug!("select_frame rejected: {frame:?} already active");
            return false;
        }
        self.submit(AnimationIntent::SelectFrame { frame, previous: None });
        true
    }

    pub fn selected_frame(&self) -> Option<FrameId> {
        self.model.active_frame()
    }

    pub fn create_frame(&mut self, name: impl Into<String>) -> FrameId {
        let model = &self.model;
        let id = FrameId(self.frame_ids.allocate(|raw| model.contains_frame(FrameId(raw))));
        self.submit(AnimationIntent::CreateFrame { id, name: name.into() });
        id
    }

    pub fn delete_frame(&mut self, id: FrameId) -> bool {
        if !self.model.contains_frame(id) {
            log::debug!("delete_frame rejected: unknown frame {id}");
            return false;
        }
        self.submit(AnimationIntent::DeleteFrame { id, name: None });
        true
    }

    pub fn rename_frame(&mut self, id: FrameId, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.model.frame(id).is_none_or(|frame| frame.name == name) {
            log::debug!("rename_frame rejected: frame {id}");
            return false;
        }
        self.submit(AnimationIntent::RenameFrame {
            id,
            name,
            previous: None,
        });
        true
    }

    /// Drop every override held by a frame.
    pub fn reset_frame(&mut self, id: FrameId) -> bool {
        if !self.model.contains_frame(id) {
            log::debug!("reset_frame rejected: unknown frame {id}");
            return false;
        }
        self.submit(AnimationIntent::ResetFrame { id });
        true
    }

    pub fn get_frames(&mut self) -> Arc<[FrameId]> {
        self.views.frames(&self.model)
    }

    pub fn frame_name(&self, id: FrameId) -> Option<String> {
        self.model.frame(id).map(|frame| frame.name.clone())
    }

    // -- History -----------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&mut self.model) {
            Some(event) => {
                self.settle(event);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&mut self.model) {
            Some(event) => {
                self.settle(event);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        let event = self.history.clear();
        log::info!("animation history cleared");
        self.settle(event);
    }
}
