//! Cached voxel projections.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{Axis, IVec3, LayerId};
use crate::diff::{Channel, DiffRegistry};
use crate::history::{ChangeFlags, ChangeSet};
use crate::voxel::{Voxel, VoxelContainer};

use super::memo::{KeyedMemo, Memo};

/// Consumer id of the visible view in [`Channel::View`].
const VIEW_CONSUMER: &str = "visible";

/// Layer, slice, visible and selection views of the voxel model.
///
/// The composited visible view is not rebuilt on every edit: it polls its own
/// consumer in the diff registry and patches the changed positions.
#[derive(Debug, Default)]
pub struct VoxelViews {
    layers: Memo<LayerId>,
    layer_voxels: KeyedMemo<LayerId, Voxel>,
    planes: KeyedMemo<(Axis, i32), Voxel>,
    layer_planes: KeyedMemo<(LayerId, Axis, i32), Voxel>,
    visible_cells: HashMap<IVec3, Voxel>,
    visible: Memo<Voxel>,
    selected: Memo<Voxel>,
}

impl VoxelViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the views a change can affect.
    pub fn invalidate(&mut self, changes: &ChangeSet<IVec3>) {
        if changes.is_everything() {
            self.invalidate_all();
            return;
        }
        if changes.touches(ChangeFlags::LAYERS) {
            self.layers.invalidate();
        }
        if changes.touches(ChangeFlags::LAYERS | ChangeFlags::VOXELS) {
            self.layer_voxels.invalidate();
        }
        if changes.key_count() > 0 {
            for &position in changes.keys() {
                for axis in Axis::ALL {
                    self.planes.invalidate_key(&(axis, axis.coordinate(position)));
                }
            }
            self.layer_planes
                .invalidate_where(|(_, axis, coordinate)| changes.keys().any(|p| axis.coordinate(*p) == *coordinate));
        }
        // the visible view patches itself on the next read
        if changes.touches(ChangeFlags::VOXELS | ChangeFlags::SELECTION) {
            self.selected.invalidate();
        }
    }

    pub fn invalidate_all(&mut self) {
        self.layers.invalidate();
        self.layer_voxels.invalidate();
        self.planes.invalidate();
        self.layer_planes.invalidate();
        self.visible_cells.clear();
        self.visible.invalidate();
        self.selected.invalidate();
    }

    /// Layer ids, top to bottom.
    pub fn layers(&mut self, model: &VoxelContainer) -> Arc<[LayerId]> {
        self.layers.get_or_compute(|| model.layer_order().to_vec())
    }

    pub fn layer_voxels(&mut self, model: &VoxelContainer, layer: LayerId) -> Arc<[Voxel]> {
        self.layer_voxels
            .get_or_compute(layer, || model.layer_voxels(layer))
    }

    /// Visible voxels on one plane, top-most layer winning.
    pub fn plane(&mut self, model: &VoxelContainer, axis: Axis, coordinate: i32) -> Arc<[Voxel]> {
        self.planes
            .get_or_compute((axis, coordinate), || model.visible_plane(axis, coordinate))
    }

    pub fn layer_plane(
        &mut self,
        model: &VoxelContainer,
        layer: LayerId,
        axis: Axis,
        coordinate: i32,
    ) -> Arc<[Voxel]> {
        self.layer_planes.get_or_compute((layer, axis, coordinate), || {
            model.layer_plane(layer, axis, coordinate)
        })
    }

    /// Every visible voxel in id order.
    pub fn visible(&mut self, model: &VoxelContainer, diffs: &mut DiffRegistry) -> Arc<[Voxel]> {
        let diff = diffs.poll(
            Channel::View,
            VIEW_CONSUMER,
            |position| model.search_visible(position).cloned(),
            || model.visible_voxels(),
        );
        if !diff.is_empty() {
            if diff.reset {
                self.visible_cells.clear();
            }
            for position in diff.removed {
                self.visible_cells.remove(&position);
            }
            for voxel in diff.added {
                self.visible_cells.insert(voxel.position, voxel);
            }
            self.visible.invalidate();
        }
        self.visible.get_or_compute(|| {
            let mut voxels: Vec<Voxel> = self.visible_cells.values().cloned().collect();
            voxels.sort_unstable_by_key(|voxel| voxel.id);
            voxels
        })
    }

    /// Visible voxels that are selected, in id order.
    pub fn selected(&mut self, model: &VoxelContainer, diffs: &mut DiffRegistry) -> Arc<[Voxel]> {
        let visible = self.visible(model, diffs);
        self.selected
            .get_or_compute(|| visible.iter().filter(|voxel| voxel.selected).cloned().collect())
    }

    /// Generations of the visible and plane views.
    pub fn generations(&self) -> [u32; 2] {
        [self.visible.generation(), self.planes.generation()]
    }
}
