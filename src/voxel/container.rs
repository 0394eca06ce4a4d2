//! Voxel model: voxels, ordered layers and textures.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::Result;
use crate::core::{Axis, IVec3, IdAllocator, LayerId, TextureId, VoxelId};

use super::layer::VoxelLayer;
use super::texture::Texture;
use super::voxel::Voxel;

/// Voxel state owned by the voxel history.
///
/// Layer order runs top to bottom: index 0 is composited above every other
/// layer. Id allocators are runtime state and are not persisted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoxelContainer {
    voxels: BTreeMap<VoxelId, Voxel>,
    layers: BTreeMap<LayerId, VoxelLayer>,
    layer_order: Vec<LayerId>,
    selected_layer: Option<LayerId>,
    textures: BTreeMap<TextureId, Texture>,
    selected_texture: Option<TextureId>,
    #[serde(skip)]
    voxel_ids: IdAllocator,
    #[serde(skip)]
    layer_ids: IdAllocator,
    #[serde(skip)]
    texture_ids: IdAllocator,
}

impl PartialEq for VoxelContainer {
    fn eq(&self, other: &Self) -> bool {
        self.voxels == other.voxels
            && self.layers == other.layers
            && self.layer_order == other.layer_order
            && self.selected_layer == other.selected_layer
            && self.textures == other.textures
            && self.selected_texture == other.selected_texture
    }
}

impl VoxelContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild layer indices from the voxel table, checking consistency.
    ///
    /// Needed after deserialization, where indices are skipped.
    pub fn rebuild_indices(&mut self) -> Result<()> {
        if self.layer_order.len() != self.layers.len()
            || self.layer_order.iter().any(|id| !self.layers.contains_key(id))
        {
            return Err(Error::Snapshot("layer order does not match layer table".into()));
        }
        for layer in self.layers.values_mut() {
            layer.clear_index();
        }
        for voxel in self.voxels.values() {
            let Some(layer) = self.layers.get_mut(&voxel.layer) else {
                return Err(Error::Snapshot(format!(
                    "voxel {} references missing layer {}",
                    voxel.id, voxel.layer
                )));
            };
            if !layer.is_free(voxel.position) {
                return Err(Error::Snapshot(format!(
                    "layer {} has two voxels at {}",
                    voxel.layer, voxel.position
                )));
            }
            layer.insert(voxel.id, voxel.position);
        }
        if self.selected_layer.is_some_and(|id| !self.layers.contains_key(&id)) {
            self.selected_layer = None;
        }
        if self.selected_texture.is_some_and(|id| !self.textures.contains_key(&id)) {
            self.selected_texture = None;
        }
        Ok(())
    }

    // -- Id allocation -----------------------------------------------------

    pub(crate) fn allocate_voxel_id(&mut self) -> VoxelId {
        let voxels = &self.voxels;
        VoxelId(self.voxel_ids.allocate(|raw| voxels.contains_key(&VoxelId(raw))))
    }

    pub(crate) fn allocate_layer_id(&mut self) -> LayerId {
        let layers = &self.layers;
        LayerId(self.layer_ids.allocate(|raw| layers.contains_key(&LayerId(raw))))
    }

    pub(crate) fn allocate_texture_id(&mut self) -> TextureId {
        let textures = &self.textures;
        TextureId(self.texture_ids.allocate(|raw| textures.contains_key(&TextureId(raw))))
    }

    // -- Voxels ------------------------------------------------------------

    pub fn voxel(&self, id: VoxelId) -> Option<&Voxel> {
        self.voxels.get(&id)
    }

    pub fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    pub fn voxels(&self) -> impl Iterator<Item = &Voxel> {
        self.voxels.values()
    }

    pub(crate) fn voxel_mut(&mut self, id: VoxelId) -> &mut Voxel {
        match self.voxels.get_mut(&id) {
            Some(voxel) => voxel,
            None => panic!("voxel {id} edited but not present"),
        }
    }

    pub(crate) fn insert_voxel(&mut self, voxel: Voxel) {
        self.layer_mut(voxel.layer).insert(voxel.id, voxel.position);
        let previous = self.voxels.insert(voxel.id, voxel);
        assert!(previous.is_none(), "voxel id inserted twice");
    }

    pub(crate) fn remove_voxel(&mut self, id: VoxelId) -> Voxel {
        let Some(voxel) = self.voxels.remove(&id) else {
            panic!("voxel {id} removed but not present");
        };
        self.layer_mut(voxel.layer).remove(id, voxel.position);
        voxel
    }

    /// Voxel at `position` in one layer.
    pub fn search(&self, position: IVec3, layer: LayerId) -> Option<&Voxel> {
        let id = self.layers.get(&layer)?.search(position)?;
        self.voxels.get(&id)
    }

    /// Top-most voxel at `position` across visible layers.
    pub fn search_visible(&self, position: IVec3) -> Option<&Voxel> {
        self.visible_layers()
            .find_map(|layer| layer.search(position))
            .and_then(|id| self.voxels.get(&id))
    }

    /// Voxel at `position` in the selected layer, if that layer is visible.
    pub fn search_selected_layer(&self, position: IVec3) -> Option<&Voxel> {
        let layer = self.layers.get(&self.selected_layer?)?;
        if !layer.visible {
            return None;
        }
        self.voxels.get(&layer.search(position)?)
    }

    /// Composited view of every visible voxel, top-most layer winning.
    pub fn visible_voxels(&self) -> Vec<Voxel> {
        self.composite(|layer| Box::new(layer.voxel_ids()))
    }

    /// Composited view of the visible voxels on one plane.
    pub fn visible_plane(&self, axis: Axis, coordinate: i32) -> Vec<Voxel> {
        self.composite(|layer| Box::new(layer.plane(axis, coordinate)))
    }

    fn composite<'a>(
        &'a self,
        ids: impl Fn(&'a VoxelLayer) -> Box<dyn Iterator<Item = VoxelId> + 'a>,
    ) -> Vec<Voxel> {
        let mut taken = std::collections::HashSet::new();
        let mut result = Vec::new();
        for layer in self.visible_layers() {
            for id in ids(layer) {
                if let Some(voxel) = self.voxels.get(&id) {
                    if taken.insert(voxel.position) {
                        result.push(voxel.clone());
                    }
                }
            }
        }
        result
    }

    // -- Layers ------------------------------------------------------------

    pub fn layer(&self, id: LayerId) -> Option<&VoxelLayer> {
        self.layers.get(&id)
    }

    pub fn contains_layer(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }

    /// Layer ids, top to bottom.
    pub fn layer_order(&self) -> &[LayerId] {
        &self.layer_order
    }

    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layer_order.iter().position(|layer| *layer == id)
    }

    /// Visible layers, top to bottom.
    pub fn visible_layers(&self) -> impl Iterator<Item = &VoxelLayer> {
        self.layer_order
            .iter()
            .filter_map(|id| self.layers.get(id))
            .filter(|layer| layer.visible)
    }

    /// Voxels of one layer in id order.
    pub fn layer_voxels(&self, id: LayerId) -> Vec<Voxel> {
        self.layers
            .get(&id)
            .map(|layer| {
                layer
                    .voxel_ids()
                    .filter_map(|voxel| self.voxels.get(&voxel).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn layer_plane(&self, id: LayerId, axis: Axis, coordinate: i32) -> Vec<Voxel> {
        self.layers
            .get(&id)
            .map(|layer| {
                layer
                    .plane(axis, coordinate)
                    .filter_map(|voxel| self.voxels.get(&voxel).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn selected_layer(&self) -> Option<LayerId> {
        self.selected_layer
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> &mut VoxelLayer {
        match self.layers.get_mut(&id) {
            Some(layer) => layer,
            None => panic!("layer {id} edited but not present"),
        }
    }

    pub(crate) fn insert_layer(&mut self, index: usize, layer: VoxelLayer) {
        assert!(layer.is_empty(), "layer {} inserted with voxels", layer.id);
        self.layer_order.insert(index, layer.id);
        let previous = self.layers.insert(layer.id, layer);
        assert!(previous.is_none(), "layer id inserted twice");
    }

    /// Remove an empty layer, returning it and its order index.
    pub(crate) fn remove_layer(&mut self, id: LayerId) -> (usize, VoxelLayer) {
        let Some(index) = self.layer_index(id) else {
            panic!("layer {id} removed but not present");
        };
        self.layer_order.remove(index);
        let Some(layer) = self.layers.remove(&id) else {
            panic!("layer {id} missing from layer table");
        };
        assert!(layer.is_empty(), "layer {id} removed with voxels");
        (index, layer)
    }

    /// Swap a layer with its neighbour above (`up`) or below.
    pub(crate) fn shift_layer(&mut self, id: LayerId, up: bool) {
        let Some(index) = self.layer_index(id) else {
            panic!("layer {id} moved but not present");
        };
        let other = if up { index - 1 } else { index + 1 };
        self.layer_order.swap(index, other);
    }

    pub(crate) fn set_selected_layer(&mut self, id: Option<LayerId>) -> Option<LayerId> {
        std::mem::replace(&mut self.selected_layer, id)
    }

    // -- Textures ----------------------------------------------------------

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(&id)
    }

    pub fn texture_ids(&self) -> impl Iterator<Item = TextureId> + '_ {
        self.textures.keys().copied()
    }

    pub fn selected_texture(&self) -> Option<TextureId> {
        self.selected_texture
    }

    pub fn is_texture_used(&self, id: TextureId) -> bool {
        self.voxels.values().any(|voxel| voxel.uses_texture(id))
    }

    pub(crate) fn insert_texture(&mut self, id: TextureId, texture: Texture) {
        let previous = self.textures.insert(id, texture);
        assert!(previous.is_none(), "texture {id} inserted twice");
    }

    pub(crate) fn remove_texture(&mut self, id: TextureId) -> Texture {
        match self.textures.remove(&id) {
            Some(texture) => texture,
            None => panic!("texture {id} removed but not present"),
        }
    }

    pub(crate) fn replace_texture(&mut self, id: TextureId, texture: Texture) -> Texture {
        match self.textures.get_mut(&id) {
            Some(slot) => std::mem::replace(slot, texture),
            None => panic!("texture {id} replaced but not present"),
        }
    }

    pub(crate) fn set_selected_texture(&mut self, id: Option<TextureId>) -> Option<TextureId> {
        std::mem::replace(&mut self.selected_texture, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;
    use crate::voxel::voxel::VoxelSpec;

    fn put(model: &mut VoxelContainer, layer: LayerId, position: IVec3, color: Color) -> VoxelId {
        let id = model.allocate_voxel_id();
        model.insert_voxel(Voxel::from_spec(id, layer, &VoxelSpec::new(position, color)));
        id
    }

    fn two_layers() -> VoxelContainer {
        let mut model = VoxelContainer::new();
        model.insert_layer(0, VoxelLayer::new(LayerId(0), "bottom"));
        model.insert_layer(0, VoxelLayer::new(LayerId(1), "top"));
        model
    }

    #[test]
    fn test_search_visible_top_wins() {
        let mut model = two_layers();
        put(&mut model, LayerId(0), IVec3::ZERO, Color::new(255, 0, 0));
        put(&mut model, LayerId(1), IVec3::ZERO, Color::new(0, 0, 255));

        assert_eq!(model.layer_order(), &[LayerId(1), LayerId(0)]);
        assert_eq!(model.search_visible(IVec3::ZERO).unwrap().color, Color::new(0, 0, 255));

        model.layer_mut(LayerId(1)).visible = false;
        assert_eq!(model.search_visible(IVec3::ZERO).unwrap().color, Color::new(255, 0, 0));
    }

    #[test]
    fn test_visible_plane_composites() {
        let mut model = two_layers();
        put(&mut model, LayerId(0), IVec3::new(0, 0, 1), Color::new(1, 0, 0));
        put(&mut model, LayerId(0), IVec3::new(1, 0, 1), Color::new(1, 0, 0));
        put(&mut model, LayerId(1), IVec3::new(0, 0, 1), Color::new(2, 0, 0));
        put(&mut model, LayerId(1), IVec3::new(0, 0, 2), Color::new(2, 0, 0));

        let plane = model.visible_plane(Axis::Z, 1);
        assert_eq!(plane.len(), 2);
        assert!(plane.iter().any(|v| v.position == IVec3::new(0, 0, 1) && v.color.r == 2));
        assert_eq!(model.visible_voxels().len(), 3);
    }

    #[test]
    fn test_allocator_skips_live_ids() {
        let mut model = two_layers();
        assert_eq!(model.allocate_layer_id(), LayerId(2));
        let a = put(&mut model, LayerId(0), IVec3::ZERO, Color::default());
        let b = put(&mut model, LayerId(0), IVec3::X, Color::default());
        assert_ne!(a, b);
    }

    #[test]
    fn test_rebuild_indices_after_deserialize() {
        let mut model = two_layers();
        put(&mut model, LayerId(0), IVec3::ONE, Color::new(3, 3, 3));

        let json = serde_json::to_string(&model).unwrap();
        let mut restored: VoxelContainer = serde_json::from_str(&json).unwrap();
        assert!(restored.search(IVec3::ONE, LayerId(0)).is_none());

        restored.rebuild_indices().unwrap();
        assert_eq!(restored, model);
        assert!(restored.search(IVec3::ONE, LayerId(0)).is_some());
    }

    #[test]
    fn test_rebuild_rejects_orphan_voxel() {
        let mut model = two_layers();
        put(&mut model, LayerId(0), IVec3::ONE, Color::default());
        let mut json: serde_json::Value = serde_json::to_value(&model).unwrap();
        json["layer_order"] = serde_json::json!([1]);
        json["layers"].as_object_mut().unwrap().remove("0");

        let mut restored: VoxelContainer = serde_json::from_value(json).unwrap();
        assert!(matches!(restored.rebuild_indices(), Err(Error::Snapshot(_))));
    }

    #[test]
    fn test_shift_layer() {
        let mut model = two_layers();
        model.shift_layer(LayerId(0), true);
        assert_eq!(model.layer_order(), &[LayerId(0), LayerId(1)]);
        model.shift_layer(LayerId(0), false);
        assert_eq!(model.layer_order(), &[LayerId(1), LayerId(0)]);
    }
}
