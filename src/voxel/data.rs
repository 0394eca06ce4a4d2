//! Voxel editing operations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use image::RgbaImage;

use crate::cache::VoxelViews;
use crate::core::{Axis, Color, EngineConfig, IVec3, LayerId, TextureId, VoxelId};
use crate::diff::{Channel, Diff, DiffRegistry};
use crate::history::{ChangeFlags, HistoryAction, HistoryEvent, HistoryManager};
use crate::notify::Notice;

use super::container::VoxelContainer;
use super::intent::{VoxelIntent, assign_texture};
use super::layer::VoxelLayer;
use super::texture::{Texture, split_grid};
use super::voxel::{FACE_COUNT, Voxel, VoxelSpec};

/// The voxel domain: model, history, diff buffers and cached views.
///
/// Operations validate their preconditions and return `false`/`None`
/// without touching history when they fail.
pub struct VoxelData {
    model: VoxelContainer,
    history: HistoryManager<VoxelIntent>,
    diffs: DiffRegistry,
    views: VoxelViews,
    config: EngineConfig,
    outbox: Vec<Notice>,
}

impl VoxelData {
    /// Create a document holding one empty, selected default layer.
    pub fn new(config: &EngineConfig) -> Self {
        let mut data = Self {
            model: VoxelContainer::new(),
            history: HistoryManager::new().with_limit(config.history_limit),
            diffs: DiffRegistry::new(),
            views: VoxelViews::new(),
            config: config.clone(),
            outbox: Vec::new(),
        };
        data.fresh_start();
        data.outbox.clear();
        data
    }

    pub fn model(&self) -> &VoxelContainer {
        &self.model
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the document with an empty one holding a default layer.
    pub(crate) fn fresh_start(&mut self) {
        let mut model = VoxelContainer::new();
        let layer = model.allocate_layer_id();
        model.insert_layer(0, VoxelLayer::new(layer, self.config.default_layer_name.clone()));
        model.set_selected_layer(Some(layer));
        self.replace_model(model);
    }

    /// Swap in a whole model, dropping history and resetting every consumer.
    pub(crate) fn replace_model(&mut self, model: VoxelContainer) {
        self.model = model;
        self.history.clear();
        self.views.invalidate_all();
        self.reset_diffs();
        self.outbox.extend([Notice::VoxelChanged, Notice::LayerStateChanged, Notice::TextureChanged]);
    }

    pub(crate) fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn set_frozen(&mut self, frozen: bool) {
        self.history.set_frozen(frozen);
    }

    fn reset_diffs(&mut self) {
        let visible = self.model.visible_voxels();
        let selected: Vec<IVec3> = visible.iter().filter(|v| v.selected).map(|v| v.position).collect();
        self.diffs.reset(visible.iter().map(|v| v.position), selected);
    }

    fn submit(&mut self, intent: VoxelIntent) {
        let event = self.history.submit(&mut self.model, intent);
        self.settle(event);
    }

    fn settle(&mut self, event: HistoryEvent<IVec3>) {
        if event.action == HistoryAction::Clear {
            return;
        }
        let changes = &event.changes;
        if changes.is_everything() {
            self.reset_diffs();
        } else {
            let model = &self.model;
            self.diffs
                .record(changes, |position| model.search_visible(position).map(|v| v.selected));
        }
        self.views.invalidate(changes);

        match (event.frozen, event.action) {
            (true, HistoryAction::Apply) => self.outbox.push(Notice::FrozenAction),
            (true, HistoryAction::Undo) => self.outbox.push(Notice::FrozenUndo),
            (true, HistoryAction::Redo) => self.outbox.push(Notice::FrozenRedo),
            _ => {
                self.outbox.push(Notice::VoxelChanged);
                if changes.touches(ChangeFlags::LAYERS) {
                    self.outbox.push(Notice::LayerStateChanged);
                }
                if changes.touches(ChangeFlags::TEXTURES) {
                    self.outbox.push(Notice::TextureChanged);
                }
            }
        }
    }

    /// True if `layer` can take `extra` more voxels.
    fn has_room(&self, layer: LayerId, extra: usize) -> bool {
        let count = self.model.layer(layer).map_or(0, VoxelLayer::len);
        if count + extra > self.config.max_voxels_per_layer {
            log::warn!(
                "layer {layer} is full ({count} of {} voxels)",
                self.config.max_voxels_per_layer
            );
            return false;
        }
        true
    }

    /// Point a selection left on a removed layer at the top layer.
    ///
    /// Soft selections bypass history, so undo or redo can remove the layer
    /// they point at.
    fn repair_selected_layer(&mut self) {
        let Some(selected) = self.model.selected_layer() else {
            return;
        };
        if self.model.contains_layer(selected) {
            return;
        }
        let fallback = self.model.layer_order().first().copied();
        log::debug!("selected layer {selected} is gone, selecting {fallback:?}");
        self.model.set_selected_layer(fallback);
        if !self.outbox.contains(&Notice::LayerStateChanged) {
            self.outbox.push(Notice::LayerStateChanged);
        }
    }

    /// Keep one voxel per position, the one on the top-most layer.
    fn top_most_per_position(&self, ids: Vec<VoxelId>) -> Vec<VoxelId> {
        let depth = |voxel: &Voxel| self.model.layer_index(voxel.layer).unwrap_or(usize::MAX);
        let mut winners: HashMap<IVec3, &Voxel> = HashMap::new();
        for voxel in ids.iter().filter_map(|id| self.model.voxel(*id)) {
            winners
                .entry(voxel.position)
                .and_modify(|winner| {
                    if depth(voxel) < depth(winner) {
                        *winner = voxel;
                    }
                })
                .or_insert(voxel);
        }
        let kept: HashSet<VoxelId> = winners.values().map(|voxel| voxel.id).collect();
        ids.into_iter().filter(|id| kept.contains(id)).collect()
    }

    fn existing(&self, ids: &[VoxelId]) -> Vec<VoxelId> {
        let mut seen = HashSet::new();
        ids.iter()
            .copied()
            .filter(|id| self.model.voxel(*id).is_some() && seen.insert(*id))
            .collect()
    }

    // -- Layers ------------------------------------------------------------

    /// Create an empty layer on top and return its id.
    pub fn create_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = self.model.allocate_layer_id();
        self.submit(VoxelIntent::CreateLayer { id, name: name.into() });
        id
    }

    /// Delete a layer and every voxel on it.
    pub fn delete_layer(&mut self, id: LayerId) -> bool {
        if !self.model.contains_layer(id) {
            log::debug!("delete_layer rejected: unknown layer {id}");
            return false;
        }
        self.submit(VoxelIntent::DeleteLayer { id, removed: None });
        true
    }

    pub fn rename_layer(&mut self, id: LayerId, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.model.layer(id).is_none_or(|layer| layer.name == name) {
            log::debug!("rename_layer rejected: layer {id}");
            return false;
        }
        self.submit(VoxelIntent::RenameLayer { id, name, previous: None });
        true
    }

    pub fn select_layer(&mut self, layer: Option<LayerId>) -> bool {
        if !self.can_select_layer(layer) {
            log::debug!("select_layer rejected: {layer:?}");
            return false;
        }
        self.submit(VoxelIntent::select_layer(layer));
        true
    }

    /// Select a layer without recording history.
    pub fn select_layer_soft(&mut self, layer: Option<LayerId>) -> bool {
        if !self.can_select_layer(layer) {
            return false;
        }
        self.model.set_selected_layer(layer);
        self.outbox.push(Notice::LayerStateChanged);
        true
    }

    fn can_select_layer(&self, layer: Option<LayerId>) -> bool {
        layer.is_none_or(|id| self.model.contains_layer(id)) && self.model.selected_layer() != layer
    }

    pub fn selected_layer(&self) -> Option<LayerId> {
        self.model.selected_layer()
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool {
        if self.model.layer(id).is_none_or(|layer| layer.visible == visible) {
            log::debug!("set_layer_visible rejected: layer {id}");
            return false;
        }
        self.submit(VoxelIntent::SetLayerVisible {
            id,
            visible,
            previous: None,
            positions: Vec::new(),
        });
        true
    }

    pub fn layer_visible(&self, id: LayerId) -> bool {
        self.model.layer(id).is_some_and(|layer| layer.visible)
    }

    pub fn layer_name(&self, id: LayerId) -> Option<String> {
        self.model.layer(id).map(|layer| layer.name.clone())
    }

    /// Layer ids, top to bottom.
    pub fn layers(&mut self) -> Arc<[LayerId]> {
        self.views.layers(&self.model)
    }

    pub fn layer_voxel_count(&self, id: LayerId) -> usize {
        self.model.layer(id).map_or(0, VoxelLayer::len)
    }

    pub fn can_move_layer_up(&self, id: LayerId) -> bool {
        self.model.layer_index(id).is_some_and(|index| index > 0)
    }

    pub fn can_move_layer_down(&self, id: LayerId) -> bool {
        self.model
            .layer_index(id)
            .is_some_and(|index| index + 1 < self.model.layer_order().len())
    }

    pub fn move_layer_up(&mut self, id: LayerId) -> bool {
        if !self.can_move_layer_up(id) {
            log::debug!("move_layer_up rejected: layer {id}");
            return false;
        }
        self.submit(VoxelIntent::MoveLayer { id, up: true, positions: Vec::new() });
        true
    }

    pub fn move_layer_down(&mut self, id: LayerId) -> bool {
        if !self.can_move_layer_down(id) {
            log::debug!("move_layer_down rejected: layer {id}");
            return false;
        }
        self.submit(VoxelIntent::MoveLayer { id, up: false, positions: Vec::new() });
        true
    }

    /// Merging needs at least two visible layers.
    pub fn can_merge_visible_layers(&self) -> bool {
        self.model.visible_layers().nth(1).is_some()
    }

    /// Flatten every visible layer into a new selected layer.
    pub fn merge_visible_layers(&mut self) -> Option<LayerId> {
        if !self.can_merge_visible_layers() {
            log::debug!("merge_visible_layers rejected: fewer than two visible layers");
            return None;
        }
        let id = self.model.allocate_layer_id();
        let name = self.config.merged_layer_name.clone();
        self.submit(VoxelIntent::MergeVisibleLayers { id, name });
        Some(id)
    }

    /// Remove every voxel of a layer, keeping the layer.
    pub fn clear_layer(&mut self, id: LayerId) -> bool {
        if self.model.layer(id).is_none_or(VoxelLayer::is_empty) {
            log::debug!("clear_layer rejected: layer {id}");
            return false;
        }
        self.submit(VoxelIntent::ClearLayer { layer: id });
        true
    }

    /// Move voxels into a new selected layer, keeping their ids.
    ///
    /// Where several of the voxels share a position only the one on the
    /// top-most layer moves.
    pub fn migrate_voxels(&mut self, ids: &[VoxelId]) -> Option<LayerId> {
        let ids = self.top_most_per_position(self.existing(ids));
        if ids.is_empty() {
            log::debug!("migrate_voxels rejected: no known voxels");
            return None;
        }
        let layer = self.model.allocate_layer_id();
        let name = self.config.migrated_layer_name.clone();
        self.submit(VoxelIntent::Migrate { ids, layer, name });
        Some(layer)
    }

    // -- Voxels ------------------------------------------------------------

    /// Add a voxel to the selected layer.
    pub fn add_voxel(&mut self, spec: VoxelSpec) -> Option<VoxelId> {
        let layer = self.model.selected_layer()?;
        self.add_voxel_to_layer(layer, spec)
    }

    pub fn add_voxel_to_layer(&mut self, layer: LayerId, spec: VoxelSpec) -> Option<VoxelId> {
        if !self.model.layer(layer).is_some_and(|l| l.is_free(spec.position)) {
            log::debug!("add_voxel rejected: {} taken or layer {layer} missing", spec.position);
            return None;
        }
        if !self.spec_is_valid(&spec) || !self.has_room(layer, 1) {
            return None;
        }
        let id = self.model.allocate_voxel_id();
        self.submit(VoxelIntent::AddVoxel { id, layer, spec });
        Some(id)
    }

    /// Add many voxels to the selected layer in one step.
    ///
    /// Positions already taken (or repeated) are skipped.
    pub fn mass_add_voxels(&mut self, specs: &[VoxelSpec]) -> bool {
        let Some(layer) = self.model.selected_layer() else {
            return false;
        };
        let Some(target) = self.model.layer(layer) else {
            return false;
        };
        let mut seen = HashSet::new();
        let specs: Vec<VoxelSpec> = specs
            .iter()
            .filter(|spec| target.is_free(spec.position) && seen.insert(spec.position))
            .copied()
            .collect();
        if specs.is_empty() || !specs.iter().all(|spec| self.spec_is_valid(spec)) {
            log::debug!("mass_add_voxels rejected: nothing to add");
            return false;
        }
        if !self.has_room(layer, specs.len()) {
            return false;
        }
        self.submit(VoxelIntent::MassAdd { layer, specs });
        true
    }

    fn spec_is_valid(&self, spec: &VoxelSpec) -> bool {
        let textures_known = spec.faces.is_none_or(|faces| {
            faces.iter().all(|face| self.model.texture(face.texture).is_some() && face.rotation < 4)
        });
        if !textures_known {
            log::debug!("voxel at {} references an unknown texture", spec.position);
        }
        textures_known
    }

    pub fn remove_voxel(&mut self, id: VoxelId) -> bool {
        if self.model.voxel(id).is_none() {
            log::debug!("remove_voxel rejected: unknown voxel {id}");
            return false;
        }
        self.submit(VoxelIntent::remove(id));
        true
    }

    pub fn mass_remove_voxels(&mut self, ids: &[VoxelId]) -> bool {
        let ids = self.existing(ids);
        if ids.is_empty() {
            return false;
        }
        self.submit(VoxelIntent::MassRemove { ids });
        true
    }

    /// Move a voxel within its layer, replacing whatever occupies `target`.
    pub fn move_voxel(&mut self, id: VoxelId, target: IVec3) -> bool {
        if self.model.voxel(id).is_none_or(|voxel| voxel.position == target) {
            log::debug!("move_voxel rejected: voxel {id} to {target}");
            return false;
        }
        self.submit(VoxelIntent::MoveVoxel { id, target });
        true
    }

    /// Move voxels to `position - shift`.
    pub fn mass_move_voxels(&mut self, ids: &[VoxelId], shift: IVec3) -> bool {
        let ids = self.existing(ids);
        if ids.is_empty() || shift == IVec3::ZERO {
            return false;
        }
        self.submit(VoxelIntent::MassMove { ids, shift });
        true
    }

    /// Rotate voxels by quarter turns around their bounding-box centre.
    pub fn rotate_voxels_around_center(&mut self, ids: &[VoxelId], axis: Axis, quarter_turns: u8) -> bool {
        let ids = self.existing(ids);
        if ids.is_empty() || quarter_turns % 4 == 0 {
            return false;
        }
        self.submit(VoxelIntent::RotateAroundCenter { ids, axis, quarter_turns });
        true
    }

    /// Reflect voxels across their bounding-box centre.
    pub fn mirror_voxels(&mut self, ids: &[VoxelId], axis: Axis) -> bool {
        let ids = self.existing(ids);
        if ids.is_empty() {
            return false;
        }
        self.submit(VoxelIntent::Mirror { ids, axis });
        true
    }

    pub fn set_color(&mut self, id: VoxelId, color: Color) -> bool {
        let Some(voxel) = self.model.voxel(id).filter(|v| v.color != color) else {
            log::debug!("set_color rejected: voxel {id}");
            return false;
        };
        let intent = VoxelIntent::set_color(voxel, color);
        self.submit(intent);
        true
    }

    pub fn mass_set_color(&mut self, ids: &[VoxelId], color: Color) -> bool {
        let ids = self.existing(ids);
        if !ids.iter().any(|id| self.model.voxel(*id).is_some_and(|v| v.color != color)) {
            return false;
        }
        self.submit(VoxelIntent::MassColor { ids, color });
        true
    }

    /// Offset colors in HSB space.
    pub fn mass_shift_color(&mut self, ids: &[VoxelId], offset: [f32; 3]) -> bool {
        let ids = self.existing(ids);
        if ids.is_empty() || offset == [0.0; 3] {
            return false;
        }
        self.submit(VoxelIntent::MassShiftColor { ids, offset });
        true
    }

    pub fn set_alpha(&mut self, id: VoxelId, alpha: Option<u8>) -> bool {
        let Some(voxel) = self.model.voxel(id).filter(|v| v.alpha != alpha) else {
            log::debug!("set_alpha rejected: voxel {id}");
            return false;
        };
        let intent = VoxelIntent::set_alpha(voxel, alpha);
        self.submit(intent);
        true
    }

    pub fn set_selected(&mut self, id: VoxelId, selected: bool) -> bool {
        let Some(voxel) = self.model.voxel(id).filter(|v| v.selected != selected) else {
            return false;
        };
        let intent = VoxelIntent::set_selected(voxel, selected);
        self.submit(intent);
        true
    }

    pub fn mass_set_selected(&mut self, ids: &[VoxelId], selected: bool) -> bool {
        let ids = self.existing(ids);
        if !ids.iter().any(|id| self.model.voxel(*id).is_some_and(|v| v.selected != selected)) {
            return false;
        }
        self.submit(VoxelIntent::MassSelect { ids, selected });
        true
    }

    pub fn get_voxel(&self, id: VoxelId) -> Option<Voxel> {
        self.model.voxel(id).cloned()
    }

    pub fn search_voxel(&self, position: IVec3, layer: LayerId) -> Option<Voxel> {
        self.model.search(position, layer).cloned()
    }

    /// Top-most visible voxel at `position`.
    pub fn get_visible_layer_voxel(&self, position: IVec3) -> Option<Voxel> {
        self.model.search_visible(position).cloned()
    }

    /// Top-most visible voxel at `position`, or only the selected layer's.
    pub fn search_visible_voxel(&self, position: IVec3, only_current_layer: bool) -> Option<Voxel> {
        if only_current_layer {
            self.model.search_selected_layer(position).cloned()
        } else {
            self.model.search_visible(position).cloned()
        }
    }

    pub fn get_layer_voxels(&mut self, layer: LayerId) -> Arc<[Voxel]> {
        self.views.layer_voxels(&self.model, layer)
    }

    /// Every visible voxel, top-most layer winning, in id order.
    pub fn get_visible_layer_voxels(&mut self) -> Arc<[Voxel]> {
        self.views.visible(&self.model, &mut self.diffs)
    }

    pub fn any_visible_voxel(&mut self) -> bool {
        !self.get_visible_layer_voxels().is_empty()
    }

    pub fn get_voxels_on_plane(&mut self, axis: Axis, coordinate: i32) -> Arc<[Voxel]> {
        self.views.plane(&self.model, axis, coordinate)
    }

    pub fn get_layer_voxels_on_plane(&mut self, layer: LayerId, axis: Axis, coordinate: i32) -> Arc<[Voxel]> {
        self.views.layer_plane(&self.model, layer, axis, coordinate)
    }

    /// Visible voxels that are selected.
    pub fn get_selected_voxels(&mut self) -> Arc<[Voxel]> {
        self.views.selected(&self.model, &mut self.diffs)
    }

    // -- Textures ----------------------------------------------------------

    /// Add a texture and select it.
    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        let id = self.model.allocate_texture_id();
        self.submit(VoxelIntent::AddTexture { id, texture });
        id
    }

    /// Cut an image into square tiles and add each as a texture.
    pub fn add_texture_grid(&mut self, image: &RgbaImage) -> bool {
        let tiles: Vec<Texture> = split_grid(image, self.config.texture_tile_size)
            .into_iter()
            .map(Texture::new)
            .collect();
        if tiles.is_empty() {
            log::debug!("add_texture_grid rejected: empty image");
            return false;
        }
        log::debug!("adding {} texture tiles", tiles.len());
        self.submit(VoxelIntent::AddTextureGrid { tiles });
        true
    }

    /// Remove a texture no voxel uses.
    pub fn remove_texture(&mut self, id: TextureId) -> bool {
        if self.model.texture(id).is_none() || self.model.is_texture_used(id) {
            log::debug!("remove_texture rejected: texture {id} missing or in use");
            return false;
        }
        self.submit(VoxelIntent::RemoveTexture { id, removed: None });
        true
    }

    pub fn remove_all_unused_textures(&mut self) -> bool {
        if !self.model.texture_ids().any(|id| !self.model.is_texture_used(id)) {
            return false;
        }
        self.submit(VoxelIntent::RemoveUnusedTextures);
        true
    }

    pub fn replace_texture(&mut self, id: TextureId, texture: Texture) -> bool {
        if self.model.texture(id).is_none_or(|current| *current == texture) {
            log::debug!("replace_texture rejected: texture {id}");
            return false;
        }
        self.submit(VoxelIntent::ReplaceTexture {
            id,
            texture,
            previous: None,
            positions: Vec::new(),
        });
        true
    }

    pub fn select_texture(&mut self, texture: Option<TextureId>) -> bool {
        let known = texture.is_none_or(|id| self.model.texture(id).is_some());
        if !known || self.model.selected_texture() == texture {
            return false;
        }
        self.submit(VoxelIntent::select_texture(texture));
        true
    }

    /// Texture one face (or all faces with `face = None`); `None` clears.
    pub fn set_texture(&mut self, id: VoxelId, face: Option<usize>, texture: Option<TextureId>) -> bool {
        if face.is_some_and(|f| f >= FACE_COUNT) || texture.is_some_and(|t| self.model.texture(t).is_none()) {
            log::debug!("set_texture rejected: face {face:?} texture {texture:?}");
            return false;
        }
        let Some(voxel) = self
            .model
            .voxel(id)
            .filter(|v| assign_texture(v.faces, face, texture) != v.faces)
        else {
            return false;
        };
        let intent = VoxelIntent::set_texture(voxel, face, texture);
        self.submit(intent);
        true
    }

    pub fn mass_set_texture(&mut self, ids: &[VoxelId], texture: Option<TextureId>) -> bool {
        if texture.is_some_and(|t| self.model.texture(t).is_none()) {
            return false;
        }
        let ids: Vec<VoxelId> = self
            .existing(ids)
            .into_iter()
            .filter(|id| {
                self.model
                    .voxel(*id)
                    .is_some_and(|v| assign_texture(v.faces, None, texture) != v.faces)
            })
            .collect();
        if ids.is_empty() {
            return false;
        }
        self.submit(VoxelIntent::MassSetTexture { ids, texture });
        true
    }

    /// Turn a textured face (or every face) a quarter turn.
    pub fn rotate_texture(&mut self, id: VoxelId, face: Option<usize>) -> bool {
        let Some(voxel) = self.textured_voxel(id, face) else {
            return false;
        };
        let intent = VoxelIntent::RotateTexture {
            id,
            position: voxel.position,
            face,
            previous: None,
        };
        self.submit(intent);
        true
    }

    pub fn flip_texture(&mut self, id: VoxelId, face: Option<usize>) -> bool {
        let Some(voxel) = self.textured_voxel(id, face) else {
            return false;
        };
        let intent = VoxelIntent::FlipTexture {
            id,
            position: voxel.position,
            face,
            previous: None,
        };
        self.submit(intent);
        true
    }

    fn textured_voxel(&self, id: VoxelId, face: Option<usize>) -> Option<&Voxel> {
        if face.is_some_and(|f| f >= FACE_COUNT) {
            return None;
        }
        self.model.voxel(id).filter(|v| v.faces.is_some())
    }

    pub fn texture_ids(&self) -> Vec<TextureId> {
        self.model.texture_ids().collect()
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.model.texture(id)
    }

    /// Content hash of a texture, computed on first request.
    pub fn texture_hash(&self, id: TextureId) -> Option<String> {
        self.model.texture(id).map(|texture| texture.hash().to_owned())
    }

    pub fn selected_texture(&self) -> Option<TextureId> {
        self.model.selected_texture()
    }

    pub fn is_texture_used(&self, id: TextureId) -> bool {
        self.model.is_texture_used(id)
    }

    // -- Diffs -------------------------------------------------------------

    /// Visible changes since `consumer` last polled.
    pub fn get_new_since(&mut self, consumer: &str) -> Diff<Voxel> {
        let model = &self.model;
        self.diffs.poll(
            Channel::Visible,
            consumer,
            |position| model.search_visible(position).cloned(),
            || model.visible_voxels(),
        )
    }

    /// Selection changes since `consumer` last polled.
    pub fn get_new_selected_since(&mut self, consumer: &str) -> Diff<Voxel> {
        let model = &self.model;
        self.diffs.poll(
            Channel::Selected,
            consumer,
            |position| model.search_visible(position).filter(|v| v.selected).cloned(),
            || model.visible_voxels().into_iter().filter(|v| v.selected).collect(),
        )
    }

    /// Visible changes on one plane since `consumer` last polled it.
    pub fn get_new_on_plane_since(&mut self, consumer: &str, axis: Axis, coordinate: i32) -> Diff<Voxel> {
        let model = &self.model;
        self.diffs.poll(
            Channel::Plane(axis, coordinate),
            consumer,
            |position| model.search_visible(position).cloned(),
            || model.visible_plane(axis, coordinate),
        )
    }

    /// Force the next plane poll of `consumer` to return the full slice.
    pub fn invalidate_plane_buffer(&mut self, consumer: &str, axis: Axis, coordinate: i32) {
        self.diffs.invalidate(Channel::Plane(axis, coordinate), consumer);
    }

    // -- History -----------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&mut self.model) {
            Some(event) => {
                self.settle(event);
                self.repair_selected_layer();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&mut self.model) {
            Some(event) => {
                self.settle(event);
                self.repair_selected_layer();
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
        log::info!("voxel history cleared");
        self.settle(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> VoxelData {
        VoxelData::new(&EngineConfig::default())
    }

    fn red() -> Color {
        Color::new(255, 0, 0)
    }

    fn blue() -> Color {
        Color::new(0, 0, 255)
    }

    #[test]
    fn test_new_document_has_selected_layer() {
        let mut voxels = data();
        let layers = voxels.layers();
        assert_eq!(layers.len(), 1);
        assert_eq!(voxels.selected_layer(), Some(layers[0]));
        assert_eq!(voxels.layer_name(layers[0]).as_deref(), Some("Layer"));
        assert!(!voxels.can_undo());
        assert!(voxels.take_notices().is_empty());
    }

    #[test]
    fn test_add_rejects_taken_position() {
        let mut voxels = data();
        assert!(voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, red())).is_some());
        assert!(voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, blue())).is_none());
        assert_eq!(voxels.get_visible_layer_voxels().len(), 1);
    }

    #[test]
    fn test_capacity_limit() {
        let config = EngineConfig::default().with_max_voxels_per_layer(2);
        let mut voxels = VoxelData::new(&config);
        assert!(voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, red())).is_some());
        assert!(voxels.add_voxel(VoxelSpec::new(IVec3::X, red())).is_some());
        assert!(voxels.add_voxel(VoxelSpec::new(IVec3::Y, red())).is_none());

        let specs = [VoxelSpec::new(IVec3::Z, red())];
        assert!(!voxels.mass_add_voxels(&specs));
    }

    #[test]
    fn test_merge_visible_layers_top_wins() {
        let mut voxels = data();
        let l1 = voxels.selected_layer().unwrap();
        voxels.add_voxel_to_layer(l1, VoxelSpec::new(IVec3::ZERO, red())).unwrap();
        let l2 = voxels.create_layer("upper");
        voxels.add_voxel_to_layer(l2, VoxelSpec::new(IVec3::ZERO, blue())).unwrap();
        let before = voxels.model().clone();

        let merged = voxels.merge_visible_layers().unwrap();
        assert_eq!(&*voxels.layers(), &[merged]);
        let merged_voxels = voxels.get_layer_voxels(merged);
        assert_eq!(merged_voxels.len(), 1);
        assert_eq!(merged_voxels[0].color, blue());
        assert_eq!(voxels.selected_layer(), Some(merged));

        assert!(voxels.undo());
        assert_eq!(voxels.model(), &before);
        assert_eq!(&*voxels.layers(), &[l2, l1]);
    }

    #[test]
    fn test_hidden_layers_survive_merge() {
        let mut voxels = data();
        let l1 = voxels.selected_layer().unwrap();
        let l2 = voxels.create_layer("a");
        let l3 = voxels.create_layer("hidden");
        voxels.set_layer_visible(l3, false);
        assert!(voxels.can_merge_visible_layers());

        let merged = voxels.merge_visible_layers().unwrap();
        assert_eq!(&*voxels.layers(), &[merged, l3]);
        assert!(voxels.layer_name(l1).is_none());
        assert!(voxels.layer_name(l2).is_none());
        assert!(!voxels.can_merge_visible_layers());
    }

    #[test]
    fn test_layer_moves() {
        let mut voxels = data();
        let bottom = voxels.selected_layer().unwrap();
        let top = voxels.create_layer("top");
        assert!(!voxels.can_move_layer_up(top));
        assert!(voxels.can_move_layer_down(top));
        assert!(voxels.move_layer_down(top));
        assert_eq!(&*voxels.layers(), &[bottom, top]);
        assert!(voxels.undo());
        assert_eq!(&*voxels.layers(), &[top, bottom]);
    }

    #[test]
    fn test_visibility_change_feeds_diffs() {
        let mut voxels = data();
        let layer = voxels.selected_layer().unwrap();
        voxels.add_voxel(VoxelSpec::new(IVec3::ONE, red())).unwrap();
        voxels.get_new_since("view");

        voxels.set_layer_visible(layer, false);
        let diff = voxels.get_new_since("view");
        assert_eq!(diff.removed, vec![IVec3::ONE]);
        assert!(voxels.search_visible_voxel(IVec3::ONE, true).is_none());
        assert!(voxels.get_visible_layer_voxel(IVec3::ONE).is_none());
        assert!(voxels.search_voxel(IVec3::ONE, layer).is_some());
    }

    #[test]
    fn test_selected_diff_and_view() {
        let mut voxels = data();
        let a = voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, red())).unwrap();
        let b = voxels.add_voxel(VoxelSpec::new(IVec3::X, red())).unwrap();
        assert!(voxels.get_new_selected_since("sel").reset);

        assert!(voxels.mass_set_selected(&[a, b], true));
        let diff = voxels.get_new_selected_since("sel");
        assert_eq!(diff.added.len(), 2);
        assert_eq!(voxels.get_selected_voxels().len(), 2);

        assert!(voxels.set_color(a, blue()));
        assert!(voxels.get_new_selected_since("sel").is_empty());
    }

    #[test]
    fn test_plane_diff_and_invalidate() {
        let mut voxels = data();
        voxels.add_voxel(VoxelSpec::new(IVec3::new(0, 0, 3), red())).unwrap();
        let first = voxels.get_new_on_plane_since("side", Axis::Z, 3);
        assert!(first.reset);
        assert_eq!(first.added.len(), 1);

        voxels.add_voxel(VoxelSpec::new(IVec3::new(1, 0, 3), red())).unwrap();
        voxels.add_voxel(VoxelSpec::new(IVec3::new(1, 0, 4), red())).unwrap();
        let next = voxels.get_new_on_plane_since("side", Axis::Z, 3);
        assert!(!next.reset);
        assert_eq!(next.added.len(), 1);

        voxels.invalidate_plane_buffer("side", Axis::Z, 3);
        let full = voxels.get_new_on_plane_since("side", Axis::Z, 3);
        assert!(full.reset);
        assert_eq!(full.added.len(), 2);
    }

    #[test]
    fn test_rotate_and_mirror_undo() {
        let mut voxels = data();
        let a = voxels.add_voxel(VoxelSpec::new(IVec3::new(0, 0, 0), red())).unwrap();
        let b = voxels.add_voxel(VoxelSpec::new(IVec3::new(2, 0, 0), blue())).unwrap();
        let before = voxels.model().clone();

        assert!(voxels.rotate_voxels_around_center(&[a, b], Axis::Z, 1));
        assert_eq!(voxels.get_voxel(a).unwrap().position, IVec3::new(1, -1, 0));
        assert_eq!(voxels.get_voxel(b).unwrap().position, IVec3::new(1, 1, 0));
        assert!(voxels.undo());
        assert_eq!(voxels.model(), &before);

        assert!(voxels.mirror_voxels(&[a, b], Axis::X));
        assert_eq!(voxels.get_voxel(a).unwrap().position, IVec3::new(2, 0, 0));
        assert_eq!(voxels.get_voxel(b).unwrap().position, IVec3::ZERO);
        assert!(!voxels.rotate_voxels_around_center(&[a], Axis::Y, 4));
    }

    #[test]
    fn test_texture_lifecycle() {
        let mut voxels = data();
        let texture = voxels.add_texture(Texture::new(RgbaImage::new(4, 4)));
        assert_eq!(voxels.selected_texture(), Some(texture));
        assert!(voxels.texture_hash(texture).is_some());

        let id = voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, red())).unwrap();
        assert!(voxels.set_texture(id, None, Some(texture)));
        assert!(!voxels.set_texture(id, None, Some(texture)));
        assert!(voxels.is_texture_used(texture));
        assert!(!voxels.remove_texture(texture));

        assert!(voxels.rotate_texture(id, Some(1)));
        assert!(voxels.flip_texture(id, None));
        let faces = voxels.get_voxel(id).unwrap().faces.unwrap();
        assert_eq!(faces[1].rotation, 1);
        assert!(faces.iter().all(|f| f.flipped));

        assert!(voxels.set_texture(id, None, None));
        assert!(voxels.remove_all_unused_textures());
        assert!(voxels.texture_ids().is_empty());
        assert_eq!(voxels.selected_texture(), None);

        assert!(voxels.undo());
        assert_eq!(voxels.selected_texture(), Some(texture));
    }

    #[test]
    fn test_texture_grid() {
        let config = EngineConfig {
            texture_tile_size: 2,
            ..EngineConfig::default()
        };
        let mut voxels = VoxelData::new(&config);
        assert!(voxels.add_texture_grid(&RgbaImage::new(4, 3)));
        assert_eq!(voxels.texture_ids().len(), 4);
        assert!(voxels.undo());
        assert!(voxels.texture_ids().is_empty());
        assert!(voxels.redo());
        assert_eq!(voxels.texture_ids().len(), 4);
    }

    #[test]
    fn test_notices_for_layer_and_texture_edits() {
        let mut voxels = data();
        voxels.create_layer("x");
        assert_eq!(voxels.take_notices(), vec![Notice::VoxelChanged, Notice::LayerStateChanged]);
        voxels.add_texture(Texture::new(RgbaImage::new(1, 1)));
        assert_eq!(voxels.take_notices(), vec![Notice::VoxelChanged, Notice::TextureChanged]);

        voxels.set_frozen(true);
        voxels.create_layer("y");
        assert_eq!(voxels.take_notices(), vec![Notice::FrozenAction]);
    }

    #[test]
    fn test_migrate_keeps_ids() {
        let mut voxels = data();
        let a = voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, red())).unwrap();
        let layer = voxels.migrate_voxels(&[a]).unwrap();
        assert_eq!(voxels.get_voxel(a).unwrap().layer, layer);
        assert_eq!(voxels.selected_layer(), Some(layer));
        assert!(voxels.undo());
        assert_ne!(voxels.get_voxel(a).unwrap().layer, layer);
    }

    #[test]
    fn test_migrate_overlapping_keeps_top_most() {
        let mut voxels = data();
        let bottom = voxels.selected_layer().unwrap();
        let a = voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, red())).unwrap();
        let top = voxels.create_layer("top");
        let b = voxels.add_voxel_to_layer(top, VoxelSpec::new(IVec3::ZERO, blue())).unwrap();

        let layer = voxels.migrate_voxels(&[a, b]).unwrap();
        assert_eq!(voxels.get_voxel(b).unwrap().layer, layer);
        assert_eq!(voxels.get_voxel(a).unwrap().layer, bottom);
        assert_eq!(voxels.layer_voxel_count(layer), 1);
        assert_eq!(voxels.get_visible_layer_voxel(IVec3::ZERO).unwrap().id, b);

        assert!(voxels.undo());
        assert_eq!(voxels.get_voxel(b).unwrap().layer, top);
        assert_eq!(voxels.get_voxel(a).unwrap().layer, bottom);
    }

    #[test]
    fn test_undo_repairs_soft_selected_layer() {
        let mut voxels = data();
        let base = voxels.selected_layer().unwrap();
        let two = voxels.create_layer("two");
        assert!(voxels.select_layer_soft(Some(two)));

        assert!(voxels.undo());
        assert!(!voxels.layers().contains(&two));
        assert_eq!(voxels.selected_layer(), Some(base));
        assert!(voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, red())).is_some());
    }

    #[test]
    fn test_clear_history_is_silent() {
        let mut voxels = data();
        voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, red())).unwrap();
        voxels.take_notices();

        voxels.clear_history();
        assert!(!voxels.can_undo());
        assert!(voxels.take_notices().is_empty());
    }

    #[test]
    fn test_reserved_looking_consumer_leaves_view_intact() {
        let mut voxels = data();
        voxels.get_visible_layer_voxels();
        voxels.add_voxel(VoxelSpec::new(IVec3::ZERO, red())).unwrap();

        let diff = voxels.get_new_since("__visible_view__");
        assert!(diff.reset);
        assert_eq!(voxels.get_visible_layer_voxels().len(), 1);
    }
}
