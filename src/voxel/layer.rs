//! Voxel layers and their spatial indices.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::{Axis, IVec3, LayerId, VoxelId};

/// A named, independently visible group of voxels.
///
/// The layer indexes its voxels by position (at most one per position) and
/// by plane along each axis for slice queries. Voxel data itself lives in the
/// container; only ids are stored here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VoxelLayer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    #[serde(skip)]
    voxels: BTreeSet<VoxelId>,
    #[serde(skip)]
    positions: HashMap<IVec3, VoxelId>,
    #[serde(skip)]
    planes: [HashMap<i32, BTreeSet<VoxelId>>; 3],
}

impl PartialEq for VoxelLayer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.visible == other.visible
            && self.voxels == other.voxels
    }
}

impl VoxelLayer {
    /// Create an empty, visible layer.
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            voxels: BTreeSet::new(),
            positions: HashMap::new(),
            planes: Default::default(),
        }
    }

    /// Voxel occupying `position`, if any.
    pub fn search(&self, position: IVec3) -> Option<VoxelId> {
        self.positions.get(&position).copied()
    }

    pub fn is_free(&self, position: IVec3) -> bool {
        !self.positions.contains_key(&position)
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Voxel ids in ascending order.
    pub fn voxel_ids(&self) -> impl Iterator<Item = VoxelId> + '_ {
        self.voxels.iter().copied()
    }

    /// Voxel ids on the plane `axis = coordinate`.
    pub fn plane(&self, axis: Axis, coordinate: i32) -> impl Iterator<Item = VoxelId> + '_ {
        self.planes[axis.index()]
            .get(&coordinate)
            .into_iter()
            .flat_map(|ids| ids.iter().copied())
    }

    pub(crate) fn insert(&mut self, id: VoxelId, position: IVec3) {
        if let Some(occupant) = self.positions.insert(position, id) {
            panic!("layer {} already holds voxel {occupant} at {position}", self.id);
        }
        self.voxels.insert(id);
        for axis in Axis::ALL {
            self.planes[axis.index()]
                .entry(axis.coordinate(position))
                .or_default()
                .insert(id);
        }
    }

    pub(crate) fn remove(&mut self, id: VoxelId, position: IVec3) {
        match self.positions.remove(&position) {
            Some(found) if found == id => {}
            other => panic!("layer {} expected voxel {id} at {position}, found {other:?}", self.id),
        }
        self.voxels.remove(&id);
        for axis in Axis::ALL {
            let plane = &mut self.planes[axis.index()];
            let coordinate = axis.coordinate(position);
            if let Some(ids) = plane.get_mut(&coordinate) {
                ids.remove(&id);
                if ids.is_empty() {
                    plane.remove(&coordinate);
                }
            }
        }
    }

    /// Drop every indexed voxel, keeping name and visibility.
    pub(crate) fn clear_index(&mut self) {
        self.voxels.clear();
        self.positions.clear();
        for plane in &mut self.planes {
            plane.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_search() {
        let mut layer = VoxelLayer::new(LayerId(0), "base");
        layer.insert(VoxelId(1), IVec3::new(1, 2, 3));

        assert_eq!(layer.search(IVec3::new(1, 2, 3)), Some(VoxelId(1)));
        assert!(layer.is_free(IVec3::ZERO));
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn test_plane_index() {
        let mut layer = VoxelLayer::new(LayerId(0), "base");
        layer.insert(VoxelId(1), IVec3::new(0, 0, 5));
        layer.insert(VoxelId(2), IVec3::new(1, 0, 5));
        layer.insert(VoxelId(3), IVec3::new(1, 0, 6));

        assert_eq!(layer.plane(Axis::Z, 5).collect::<Vec<_>>(), vec![VoxelId(1), VoxelId(2)]);
        assert_eq!(layer.plane(Axis::X, 1).count(), 2);
        assert_eq!(layer.plane(Axis::Y, 7).count(), 0);

        layer.remove(VoxelId(3), IVec3::new(1, 0, 6));
        assert_eq!(layer.plane(Axis::Z, 6).count(), 0);
        assert_eq!(layer.plane(Axis::X, 1).count(), 1);
    }

    #[test]
    #[should_panic(expected = "already holds")]
    fn test_position_collision_panics() {
        let mut layer = VoxelLayer::new(LayerId(0), "base");
        layer.insert(VoxelId(1), IVec3::ZERO);
        layer.insert(VoxelId(2), IVec3::ZERO);
    }

    #[test]
    fn test_serde_skips_index() {
        let mut layer = VoxelLayer::new(LayerId(2), "top");
        layer.visible = false;
        layer.insert(VoxelId(1), IVec3::ZERO);

        let json = serde_json::to_string(&layer).unwrap();
        let restored: VoxelLayer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, "top");
        assert!(!restored.visible);
        assert!(restored.is_empty());
    }
}
