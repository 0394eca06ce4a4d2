//! Cached animation projections.

use std::sync::Arc;

use crate::animation::{AnimationContainer, Point};
use crate::core::{FrameId, PointId};
use crate::history::{ChangeFlags, ChangeSet};

use super::memo::Memo;

/// Point, line and frame lists derived from the animation model.
#[derive(Debug, Default)]
pub struct AnimationViews {
    points: Memo<Point>,
    lines: Memo<(Point, Point)>,
    frames: Memo<FrameId>,
}

impl AnimationViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the views a change can affect.
    pub fn invalidate(&mut self, changes: &ChangeSet<PointId>) {
        if changes.touches(ChangeFlags::POINTS | ChangeFlags::FRAMES) {
            self.points.invalidate();
        }
        // Line endpoints are resolved positions
        if changes.touches(ChangeFlags::LINES | ChangeFlags::POINTS | ChangeFlags::FRAMES) {
            self.lines.invalidate();
        }
        if changes.touches(ChangeFlags::FRAMES) {
            self.frames.invalidate();
        }
    }

    pub fn invalidate_all(&mut self) {
        self.invalidate(&ChangeSet::everything());
    }

    /// Every point, resolved through the active frame, in id order.
    pub fn points(&mut self, model: &AnimationContainer) -> Arc<[Point]> {
        self.points.get_or_compute(|| {
            model
                .point_ids()
                .filter_map(|id| resolve(model, id))
                .collect()
        })
    }

    /// Every line as its two resolved endpoints.
    pub fn lines(&mut self, model: &AnimationContainer) -> Arc<[(Point, Point)]> {
        self.lines.get_or_compute(|| {
            model
                .lines()
                .filter_map(|line| Some((resolve(model, line.low())?, resolve(model, line.high())?)))
                .collect()
        })
    }

    pub fn frames(&mut self, model: &AnimationContainer) -> Arc<[FrameId]> {
        self.frames.get_or_compute(|| model.frame_ids().collect())
    }

    /// Generations of the point, line and frame views.
    pub fn generations(&self) -> [u32; 3] {
        [
            self.points.generation(),
            self.lines.generation(),
            self.frames.generation(),
        ]
    }
}

fn resolve(model: &AnimationContainer, id: PointId) -> Option<Point> {
    model
        .resolved_position(id)
        .map(|position| Point { id, position })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationIntent, LineKey};
    use crate::core::Vec3;
    use crate::history::Transaction;

    fn model() -> AnimationContainer {
        let mut model = AnimationContainer::new();
        Transaction::run(&mut model, AnimationIntent::AddPoint { id: PointId(0), position: Vec3::ZERO });
        Transaction::run(&mut model, AnimationIntent::AddPoint { id: PointId(1), position: Vec3::ONE });
        Transaction::run(&mut model, AnimationIntent::Connect {
            line: LineKey::new(PointId(0), PointId(1)),
        });
        model
    }

    #[test]
    fn test_lines_resolve_endpoints() {
        let model = model();
        let mut views = AnimationViews::new();
        let lines = views.lines(&model);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].1.position, Vec3::ONE);
    }

    #[test]
    fn test_frame_change_keeps_unrelated_views() {
        let model = model();
        let mut views = AnimationViews::new();
        views.points(&model);
        views.frames(&model);

        let mut changes = ChangeSet::new();
        changes.mark(ChangeFlags::LINES);
        views.invalidate(&changes);
        assert_eq!(views.generations(), [0, 1, 0]);

        let mut changes = ChangeSet::new();
        changes.mark(ChangeFlags::FRAMES);
        views.invalidate(&changes);
        assert_eq!(views.generations(), [1, 2, 1]);
    }
}
