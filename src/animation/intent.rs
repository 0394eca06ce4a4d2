//! Reversible animation edits.

use crate::core::{FrameId, PointId, Vec3};
use crate::history::{ChangeFlags, ChangeSet, Intent, Scope};

use super::container::{AnimationContainer, Frame, LineKey};

/// Every animation mutation. Captured prior state lives in the `Option`
/// slots, filled on the first application.
#[derive(Clone, Debug)]
pub enum AnimationIntent {
    AddPoint {
        id: PointId,
        position: Vec3,
    },
    /// Cascades a disconnect for each line and an override removal for each
    /// frame before removing the point itself.
    RemovePoint {
        id: PointId,
        removed: Option<Vec3>,
    },
    MovePoint {
        id: PointId,
        position: Vec3,
        previous: Option<Vec3>,
    },
    Connect {
        line: LineKey,
    },
    Disconnect {
        line: LineKey,
    },
    /// Removes every point through attached removals.
    Clear,
    CreateFrame {
        id: FrameId,
        name: String,
    },
    DeleteFrame {
        id: FrameId,
        name: Option<String>,
    },
    /// Drops every override of a frame through attached removals.
    ResetFrame {
        id: FrameId,
    },
    RenameFrame {
        id: FrameId,
        name: String,
        previous: Option<String>,
    },
    PlaceFramePoint {
        frame: FrameId,
        point: PointId,
        position: Vec3,
        previous: Option<Option<Vec3>>,
    },
    RemoveFramePoint {
        frame: FrameId,
        point: PointId,
        removed: Option<Vec3>,
    },
    SelectFrame {
        frame: Option<FrameId>,
        previous: Option<Option<FrameId>>,
    },
}

fn captured<T: Copy>(slot: &Option<T>, what: &str) -> T {
    match slot {
        Some(value) => *value,
        None => panic!("{what} unapplied before it was applied"),
    }
}

impl Intent for AnimationIntent {
    type Target = AnimationContainer;
    type Key = PointId;

    fn apply(&mut self, model: &mut AnimationContainer, scope: &mut Scope<'_, Self>) {
        match self {
            AnimationIntent::AddPoint { id, position } => model.insert_point(*id, *position),
            AnimationIntent::RemovePoint { id, removed } => {
                if scope.is_first_call() {
                    for line in model.lines_of(*id) {
                        scope.submit(model, AnimationIntent::Disconnect { line });
                    }
                    for frame in model.frames_overriding(*id) {
                        scope.submit(model, AnimationIntent::RemoveFramePoint {
                            frame,
                            point: *id,
                            removed: None,
                        });
                    }
                }
                let position = model.remove_point(*id);
                removed.get_or_insert(position);
            }
            AnimationIntent::MovePoint { id, position, previous } => {
                let old = model.set_position(*id, *position);
                previous.get_or_insert(old);
            }
            AnimationIntent::Connect { line } => model.connect(*line),
            AnimationIntent::Disconnect { line } => model.disconnect(*line),
            AnimationIntent::Clear => {
                if scope.is_first_call() {
                    let ids: Vec<PointId> = model.point_ids().collect();
                    for id in ids {
                        scope.submit(model, AnimationIntent::RemovePoint { id, removed: None });
                    }
                }
            }
            AnimationIntent::CreateFrame { id, name } => {
                model.insert_frame(*id, Frame::new(name.clone()));
            }
            AnimationIntent::DeleteFrame { id, name } => {
                if scope.is_first_call() {
                    if model.active_frame() == Some(*id) {
                        scope.submit(model, AnimationIntent::SelectFrame {
                            frame: None,
                            previous: None,
                        });
                    }
                    submit_override_removals(model, scope, *id);
                }
                let frame = model.remove_frame(*id);
                debug_assert!(frame.points.is_empty(), "frame {id} deleted with overrides");
                name.get_or_insert(frame.name);
            }
            AnimationIntent::ResetFrame { id } => {
                if scope.is_first_call() {
                    submit_override_removals(model, scope, *id);
                }
            }
            AnimationIntent::RenameFrame { id, name, previous } => {
                let old = std::mem::replace(&mut model.frame_mut(*id).name, name.clone());
                previous.get_or_insert(old);
            }
            AnimationIntent::PlaceFramePoint { frame, point, position, previous } => {
                let old = model.frame_mut(*frame).points.insert(*point, *position);
                previous.get_or_insert(old);
            }
            AnimationIntent::RemoveFramePoint { frame, point, removed } => {
                match model.frame_mut(*frame).points.remove(point) {
                    Some(position) => {
                        removed.get_or_insert(position);
                    }
                    None => panic!("frame {frame} has no override for point {point}"),
                }
            }
            AnimationIntent::SelectFrame { frame, previous } => {
                let old = model.set_active_frame(*frame);
                previous.get_or_insert(old);
            }
        }
    }

    fn unapply(&mut self, model: &mut AnimationContainer) {
        match self {
            AnimationIntent::AddPoint { id, .. } => {
                model.remove_point(*id);
            }
            AnimationIntent::RemovePoint { id, removed } => {
                model.insert_point(*id, captured(removed, "point removal"));
            }
            AnimationIntent::MovePoint { id, previous, .. } => {
                model.set_position(*id, captured(previous, "point move"));
            }
            AnimationIntent::Connect { line } => model.disconnect(*line),
            AnimationIntent::Disconnect { line } => model.connect(*line),
            AnimationIntent::Clear | AnimationIntent::ResetFrame { .. } => {}
            AnimationIntent::CreateFrame { id, .. } => {
                model.remove_frame(*id);
            }
            AnimationIntent::DeleteFrame { id, name } => {
                let Some(name) = name.clone() else {
                    panic!("frame deletion unapplied before it was applied");
                };
                model.insert_frame(*id, Frame::new(name));
            }
            AnimationIntent::RenameFrame { id, previous, .. } => {
                let Some(old) = previous.clone() else {
                    panic!("frame rename unapplied before it was applied");
                };
                model.frame_mut(*id).name = old;
            }
            AnimationIntent::PlaceFramePoint { frame, point, previous, .. } => {
                let points = &mut model.frame_mut(*frame).points;
                match captured(previous, "frame point placement") {
                    Some(old) => points.insert(*point, old),
                    None => points.remove(point),
                };
            }
            AnimationIntent::RemoveFramePoint { frame, point, removed } => {
                let position = captured(removed, "frame point removal");
                model.frame_mut(*frame).points.insert(*point, position);
            }
            AnimationIntent::SelectFrame { previous, .. } => {
                model.set_active_frame(captured(previous, "frame selection"));
            }
        }
    }

    fn record(&self, changes: &mut ChangeSet<PointId>) {
        match self {
            AnimationIntent::AddPoint { id, .. }
            | AnimationIntent::RemovePoint { id, .. }
            | AnimationIntent::MovePoint { id, .. } => {
                changes.insert(*id);
                changes.mark(ChangeFlags::POINTS);
            }
            AnimationIntent::Connect { line } | AnimationIntent::Disconnect { line } => {
                changes.insert(line.low());
                changes.insert(line.high());
                changes.mark(ChangeFlags::LINES);
            }
            AnimationIntent::Clear => changes.mark_everything(),
            AnimationIntent::CreateFrame { .. }
            | AnimationIntent::DeleteFrame { .. }
            | AnimationIntent::ResetFrame { .. }
            | AnimationIntent::RenameFrame { .. } => changes.mark(ChangeFlags::FRAMES),
            AnimationIntent::PlaceFramePoint { point, .. }
            | AnimationIntent::RemoveFramePoint { point, .. } => {
                changes.insert(*point);
                changes.mark(ChangeFlags::FRAMES | ChangeFlags::POINTS);
            }
            // Every resolved position may change
            AnimationIntent::SelectFrame { .. } => {
                changes.mark(ChangeFlags::FRAMES | ChangeFlags::POINTS);
            }
        }
    }
}

fn submit_override_removals(
    model: &mut AnimationContainer,
    scope: &mut Scope<'_, AnimationIntent>,
    frame: FrameId,
) {
    let points: Vec<PointId> = match model.frame(frame) {
        Some(f) => f.points.keys().copied().collect(),
        None => return,
    };
    for point in points {
        scope.submit(model, AnimationIntent::RemoveFramePoint {
            frame,
            point,
            removed: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Transaction;

    fn model_with_line() -> AnimationContainer {
        let mut model = AnimationContainer::new();
        model.insert_point(PointId(0), Vec3::ZERO);
        model.insert_point(PointId(1), Vec3::ONE);
        model.connect(LineKey::new(PointId(0), PointId(1)));
        model
    }

    #[test]
    fn test_remove_point_cascades() {
        let mut model = model_with_line();
        model.insert_frame(FrameId(0), Frame::new("f"));
        model.frame_mut(FrameId(0)).points.insert(PointId(0), Vec3::X);
        let before = model.clone();

        let mut tx = Transaction::run(&mut model, AnimationIntent::RemovePoint {
            id: PointId(0),
            removed: None,
        });
        // disconnect + override removal + root
        assert_eq!(tx.len(), 3);
        assert!(!model.contains_point(PointId(0)));
        assert_eq!(model.lines().count(), 0);
        assert!(model.frame(FrameId(0)).unwrap().points.is_empty());

        tx.revert(&mut model);
        assert_eq!(model, before);
        assert_eq!(model.lines_of(PointId(0)).len(), 1);
    }

    #[test]
    fn test_delete_active_frame_deselects() {
        let mut model = model_with_line();
        model.insert_frame(FrameId(3), Frame::new("jump"));
        model.frame_mut(FrameId(3)).points.insert(PointId(1), Vec3::Y);
        model.set_active_frame(Some(FrameId(3)));
        let before = model.clone();

        let mut tx = Transaction::run(&mut model, AnimationIntent::DeleteFrame {
            id: FrameId(3),
            name: None,
        });
        assert_eq!(model.active_frame(), None);
        assert!(!model.contains_frame(FrameId(3)));

        tx.revert(&mut model);
        assert_eq!(model, before);

        tx.replay(&mut model);
        assert!(!model.contains_frame(FrameId(3)));
    }

    #[test]
    fn test_place_frame_point_restores_absence() {
        let mut model = model_with_line();
        model.insert_frame(FrameId(0), Frame::new("f"));

        let mut tx = Transaction::run(&mut model, AnimationIntent::PlaceFramePoint {
            frame: FrameId(0),
            point: PointId(1),
            position: Vec3::splat(9.0),
            previous: None,
        });
        assert_eq!(model.frame(FrameId(0)).unwrap().points.len(), 1);

        tx.revert(&mut model);
        assert!(model.frame(FrameId(0)).unwrap().points.is_empty());
    }

    #[test]
    fn test_clear_reports_everything() {
        let mut model = model_with_line();
        let tx = Transaction::run(&mut model, AnimationIntent::Clear);
        assert_eq!(model.point_count(), 0);
        assert!(tx.changes().is_everything());
    }
}
