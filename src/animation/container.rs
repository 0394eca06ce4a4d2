//! Animation model: points, lines between them and per-frame overrides.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{FrameId, PointId, Vec3};

/// A point as seen through the active frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub id: PointId,
    pub position: Vec3,
}

/// Unordered pair of point ids, stored with the smaller id first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineKey {
    low: PointId,
    high: PointId,
}

impl LineKey {
    pub fn new(a: PointId, b: PointId) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn low(&self) -> PointId {
        self.low
    }

    pub fn high(&self) -> PointId {
        self.high
    }

    pub fn touches(&self, point: PointId) -> bool {
        self.low == point || self.high == point
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.low, self.high)
    }
}

/// Named sparse map of point overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub points: BTreeMap<PointId, Vec3>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: BTreeMap::new(),
        }
    }
}

/// Animation state owned by the animation history.
///
/// Mutated only by [`AnimationIntent`](super::AnimationIntent)s. The
/// point-to-lines index is derived and rebuilt after deserialization.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnimationContainer {
    points: BTreeMap<PointId, Vec3>,
    lines: BTreeSet<LineKey>,
    frames: BTreeMap<FrameId, Frame>,
    active_frame: Option<FrameId>,
    #[serde(skip)]
    point_lines: HashMap<PointId, BTreeSet<LineKey>>,
}

impl PartialEq for AnimationContainer {
    fn eq(&self, other: &Self) -> bool {
        self.points == other.points
            && self.lines == other.lines
            && self.frames == other.frames
            && self.active_frame == other.active_frame
    }
}

impl AnimationContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the point-to-lines index from the line set.
    pub fn rebuild_index(&mut self) {
        self.point_lines.clear();
        for line in &self.lines {
            self.point_lines.entry(line.low).or_default().insert(*line);
            self.point_lines.entry(line.high).or_default().insert(*line);
        }
    }

    // -- Points ------------------------------------------------------------

    pub fn contains_point(&self, id: PointId) -> bool {
        self.points.contains_key(&id)
    }

    /// Base position, ignoring frames.
    pub fn base_position(&self, id: PointId) -> Option<Vec3> {
        self.points.get(&id).copied()
    }

    /// Position through the active frame, falling back to the base point.
    pub fn resolved_position(&self, id: PointId) -> Option<Vec3> {
        let base = self.points.get(&id)?;
        let overridden = self
            .active_frame
            .and_then(|frame| self.frames.get(&frame))
            .and_then(|frame| frame.points.get(&id));
        Some(*overridden.unwrap_or(base))
    }

    pub fn point_ids(&self) -> impl Iterator<Item = PointId> + '_ {
        self.points.keys().copied()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub(crate) fn insert_point(&mut self, id: PointId, position: Vec3) {
        let previous = self.points.insert(id, position);
        assert!(previous.is_none(), "point {id} inserted twice");
    }

    pub(crate) fn remove_point(&mut self, id: PointId) -> Vec3 {
        assert!(
            self.point_lines.get(&id).is_none_or(|lines| lines.is_empty()),
            "point {id} removed while still connected"
        );
        self.point_lines.remove(&id);
        match self.points.remove(&id) {
            Some(position) => position,
            None => panic!("point {id} removed but not present"),
        }
    }

    pub(crate) fn set_position(&mut self, id: PointId, position: Vec3) -> Vec3 {
        match self.points.get_mut(&id) {
            Some(slot) => std::mem::replace(slot, position),
            None => panic!("point {id} moved but not present"),
        }
    }

    // -- Lines -------------------------------------------------------------

    pub fn is_connected(&self, line: LineKey) -> bool {
        self.lines.contains(&line)
    }

    pub fn lines(&self) -> impl Iterator<Item = LineKey> + '_ {
        self.lines.iter().copied()
    }

    /// Lines touching `point`.
    pub fn lines_of(&self, point: PointId) -> Vec<LineKey> {
        self.point_lines
            .get(&point)
            .map(|lines| lines.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn connect(&mut self, line: LineKey) {
        assert!(
            self.contains_point(line.low) && self.contains_point(line.high),
            "line {line} connects a missing point"
        );
        assert!(self.lines.insert(line), "line {line} connected twice");
        self.point_lines.entry(line.low).or_default().insert(line);
        self.point_lines.entry(line.high).or_default().insert(line);
    }

    pub(crate) fn disconnect(&mut self, line: LineKey) {
        assert!(self.lines.remove(&line), "line {line} disconnected but not present");
        for point in [line.low, line.high] {
            if let Some(lines) = self.point_lines.get_mut(&point) {
                lines.remove(&line);
            }
        }
    }

    // -- Frames ------------------------------------------------------------

    pub fn contains_frame(&self, id: FrameId) -> bool {
        self.frames.contains_key(&id)
    }

    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(&id)
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.frames.keys().copied()
    }

    pub fn active_frame(&self) -> Option<FrameId> {
        self.active_frame
    }

    /// Frames holding an override for `point`.
    pub fn frames_overriding(&self, point: PointId) -> Vec<FrameId> {
        self.frames
            .iter()
            .filter(|(_, frame)| frame.points.contains_key(&point))
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn insert_frame(&mut self, id: FrameId, frame: Frame) {
        let previous = self.frames.insert(id, frame);
        assert!(previous.is_none(), "frame {id} created twice");
    }

    pub(crate) fn remove_frame(&mut self, id: FrameId) -> Frame {
        match self.frames.remove(&id) {
            Some(frame) => frame,
            None => panic!("frame {id} removed but not present"),
        }
    }

    pub(crate) fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        match self.frames.get_mut(&id) {
            Some(frame) => frame,
            None => panic!("frame {id} edited but not present"),
        }
    }

    pub(crate) fn set_active_frame(&mut self, frame: Option<FrameId>) -> Option<FrameId> {
        std::mem::replace(&mut self.active_frame, frame)
    }
}
