//! Reversible voxel, layer and texture edits.
//!
//! Leaf intents mutate the container directly and capture prior state on
//! their first application. Composite intents (moves, mass edits, merges)
//! have no mutation of their own: they submit leaf children and are
//! reversed entirely through them.

use crate::core::{Axis, Color, IVec3, LayerId, TextureId, VoxelId};
use crate::history::{ChangeFlags, ChangeSet, Intent, Scope};

use super::container::VoxelContainer;
use super::layer::VoxelLayer;
use super::texture::Texture;
use super::voxel::{Face, Faces, Voxel, VoxelSpec, uniform_faces};

#[derive(Clone, Debug)]
pub enum VoxelIntent {
    // -- Layers --
    /// Inserts an empty, visible layer on top.
    CreateLayer {
        id: LayerId,
        name: String,
    },
    /// Removes every voxel of the layer, then the layer itself.
    DeleteLayer {
        id: LayerId,
        removed: Option<(usize, VoxelLayer)>,
    },
    RenameLayer {
        id: LayerId,
        name: String,
        previous: Option<String>,
    },
    SelectLayer {
        layer: Option<LayerId>,
        previous: Option<Option<LayerId>>,
    },
    SetLayerVisible {
        id: LayerId,
        visible: bool,
        previous: Option<bool>,
        positions: Vec<IVec3>,
    },
    /// Swaps a layer with its neighbour above (`up`) or below.
    MoveLayer {
        id: LayerId,
        up: bool,
        positions: Vec<IVec3>,
    },

    // -- Single voxels --
    AddVoxel {
        id: VoxelId,
        layer: LayerId,
        spec: VoxelSpec,
    },
    RemoveVoxel {
        id: VoxelId,
        removed: Option<Voxel>,
    },
    /// Relocates a voxel, evicting any occupant of the target cell.
    MoveVoxel {
        id: VoxelId,
        target: IVec3,
    },
    SetColor {
        id: VoxelId,
        position: IVec3,
        color: Color,
        previous: Option<Color>,
    },
    SetAlpha {
        id: VoxelId,
        position: IVec3,
        alpha: Option<u8>,
        previous: Option<Option<u8>>,
    },
    SetSelected {
        id: VoxelId,
        position: IVec3,
        selected: bool,
        previous: Option<bool>,
    },
    /// Assigns `texture` to one face or to all faces. `None` clears texturing.
    SetTexture {
        id: VoxelId,
        position: IVec3,
        face: Option<usize>,
        texture: Option<TextureId>,
        previous: Option<Option<Faces>>,
    },
    /// Turns one face (or all faces) a quarter turn.
    RotateTexture {
        id: VoxelId,
        position: IVec3,
        face: Option<usize>,
        previous: Option<Option<Faces>>,
    },
    FlipTexture {
        id: VoxelId,
        position: IVec3,
        face: Option<usize>,
        previous: Option<Option<Faces>>,
    },

    // -- Composites --
    ClearLayer {
        layer: LayerId,
    },
    /// Flattens every visible layer into a new layer, top-most voxel winning.
    MergeVisibleLayers {
        id: LayerId,
        name: String,
    },
    /// Moves voxels into a new layer, keeping their ids.
    Migrate {
        ids: Vec<VoxelId>,
        layer: LayerId,
        name: String,
    },
    MassAdd {
        layer: LayerId,
        specs: Vec<VoxelSpec>,
    },
    MassRemove {
        ids: Vec<VoxelId>,
    },
    MassSelect {
        ids: Vec<VoxelId>,
        selected: bool,
    },
    MassColor {
        ids: Vec<VoxelId>,
        color: Color,
    },
    /// Offsets colors in HSB space.
    MassShiftColor {
        ids: Vec<VoxelId>,
        offset: [f32; 3],
    },
    /// Moves every voxel to `position - shift`.
    MassMove {
        ids: Vec<VoxelId>,
        shift: IVec3,
    },
    MassSetTexture {
        ids: Vec<VoxelId>,
        texture: Option<TextureId>,
    },
    /// Quarter turns around the centre of the voxels' bounding box.
    RotateAroundCenter {
        ids: Vec<VoxelId>,
        axis: Axis,
        quarter_turns: u8,
    },
    /// Reflection across the centre of the voxels' bounding box.
    Mirror {
        ids: Vec<VoxelId>,
        axis: Axis,
    },

    // -- Textures --
    /// Adds a texture and selects it.
    AddTexture {
        id: TextureId,
        texture: Texture,
    },
    /// Adds each tile as its own texture. Tiles are consumed on first apply.
    AddTextureGrid {
        tiles: Vec<Texture>,
    },
    /// Removes an unused texture, deselecting it first.
    RemoveTexture {
        id: TextureId,
        removed: Option<Texture>,
    },
    RemoveUnusedTextures,
    ReplaceTexture {
        id: TextureId,
        texture: Texture,
        previous: Option<Texture>,
        positions: Vec<IVec3>,
    },
    SelectTexture {
        texture: Option<TextureId>,
        previous: Option<Option<TextureId>>,
    },
}

impl VoxelIntent {
    pub(crate) fn remove(id: VoxelId) -> Self {
        VoxelIntent::RemoveVoxel { id, removed: None }
    }

    pub(crate) fn set_color(voxel: &Voxel, color: Color) -> Self {
        VoxelIntent::SetColor {
            id: voxel.id,
            position: voxel.position,
            color,
            previous: None,
        }
    }

    pub(crate) fn set_alpha(voxel: &Voxel, alpha: Option<u8>) -> Self {
        VoxelIntent::SetAlpha {
            id: voxel.id,
            position: voxel.position,
            alpha,
            previous: None,
        }
    }

    pub(crate) fn set_selected(voxel: &Voxel, selected: bool) -> Self {
        VoxelIntent::SetSelected {
            id: voxel.id,
            position: voxel.position,
            selected,
            previous: None,
        }
    }

    pub(crate) fn set_texture(voxel: &Voxel, face: Option<usize>, texture: Option<TextureId>) -> Self {
        VoxelIntent::SetTexture {
            id: voxel.id,
            position: voxel.position,
            face,
            texture,
            previous: None,
        }
    }

    pub(crate) fn select_layer(layer: Option<LayerId>) -> Self {
        VoxelIntent::SelectLayer { layer, previous: None }
    }

    pub(crate) fn select_texture(texture: Option<TextureId>) -> Self {
        VoxelIntent::SelectTexture { texture, previous: None }
    }
}

fn captured<T: Clone>(slot: &Option<T>, what: &str) -> T {
    match slot {
        Some(value) => value.clone(),
        None => panic!("{what} unapplied before it was applied"),
    }
}

/// Faces after assigning `texture` to `face` (or every face).
///
/// Rotation and flip of replaced faces are kept.
pub(crate) fn assign_texture(
    faces: Option<Faces>,
    face: Option<usize>,
    texture: Option<TextureId>,
) -> Option<Faces> {
    let texture = texture?;
    let mut faces = faces.unwrap_or_else(|| uniform_faces(texture));
    match face {
        Some(index) => faces[index].texture = texture,
        None => faces.iter_mut().for_each(|f| f.texture = texture),
    }
    Some(faces)
}

fn edit_faces(faces: Option<Faces>, face: Option<usize>, edit: impl Fn(&mut Face)) -> Option<Faces> {
    let mut faces = faces?;
    match face {
        Some(index) => edit(&mut faces[index]),
        None => faces.iter_mut().for_each(edit),
    }
    Some(faces)
}

fn replace_faces(model: &mut VoxelContainer, id: VoxelId, faces: Option<Faces>) -> Option<Faces> {
    std::mem::replace(&mut model.voxel_mut(id).faces, faces)
}

/// Position components spanning the plane a rotation about `axis` turns in.
fn rotation_plane(axis: Axis) -> (usize, usize) {
    match axis {
        Axis::X => (1, 2),
        Axis::Y => (2, 0),
        Axis::Z => (0, 1),
    }
}

/// Smallest box holding every position.
pub(crate) fn bounds(positions: impl IntoIterator<Item = IVec3>) -> Option<(IVec3, IVec3)> {
    positions.into_iter().fold(None, |acc, p| match acc {
        None => Some((p, p)),
        Some((min, max)) => Some((min.min(p), max.max(p))),
    })
}

/// Rotate `position` by quarter turns about the centre `(min + max) / 2`.
///
/// Works in doubled coordinates so half-voxel centres stay exact. Results
/// that land between cells round half up.
pub(crate) fn rotate_quarter(position: IVec3, min: IVec3, max: IVec3, axis: Axis, turns: u8) -> IVec3 {
    let sum = min + max;
    let (u, v) = rotation_plane(axis);
    let mut doubled = position * 2 - sum;
    for _ in 0..turns % 4 {
        let (a, b) = (doubled[u], doubled[v]);
        doubled[u] = -b;
        doubled[v] = a;
    }
    let shifted = doubled + sum + IVec3::ONE;
    IVec3::new(
        shifted.x.div_euclid(2),
        shifted.y.div_euclid(2),
        shifted.z.div_euclid(2),
    )
}

/// Reflect `position` across the centre plane of `min..=max` on `axis`.
pub(crate) fn mirror(position: IVec3, min: IVec3, max: IVec3, axis: Axis) -> IVec3 {
    let i = axis.index();
    let mut result = position;
    result[i] = min[i] + max[i] - position[i];
    result
}

/// Remove every moving voxel, evict occupants of the targets, then re-add
/// the moving voxels at their targets with their original ids.
fn submit_relocation(
    model: &mut VoxelContainer,
    scope: &mut Scope<'_, VoxelIntent>,
    moves: &[(VoxelId, IVec3)],
) {
    let mut placed = Vec::with_capacity(moves.len());
    for &(id, target) in moves {
        let Some(voxel) = model.voxel(id) else {
            continue;
        };
        placed.push((id, voxel.layer, voxel.spec().at(target)));
        scope.submit(model, VoxelIntent::remove(id));
    }
    for (id, layer, spec) in placed {
        let occupant = model.layer(layer).and_then(|l| l.search(spec.position));
        if let Some(occupant) = occupant {
            scope.submit(model, VoxelIntent::remove(occupant));
        }
        scope.submit(model, VoxelIntent::AddVoxel { id, layer, spec });
    }
}

fn existing<'a>(model: &'a VoxelContainer, ids: &'a [VoxelId]) -> impl Iterator<Item = Voxel> + 'a {
    ids.iter().filter_map(|id| model.voxel(*id).cloned())
}

fn layer_positions(model: &VoxelContainer, id: LayerId) -> Vec<IVec3> {
    model
        .layer_voxels(id)
        .into_iter()
        .map(|voxel| voxel.position)
        .collect()
}

impl Intent for VoxelIntent {
    type Target = VoxelContainer;
    type Key = IVec3;

    fn apply(&mut self, model: &mut VoxelContainer, scope: &mut Scope<'_, Self>) {
        match self {
            VoxelIntent::CreateLayer { id, name } => {
                model.insert_layer(0, VoxelLayer::new(*id, name.clone()));
            }
            VoxelIntent::DeleteLayer { id, removed } => {
                if scope.is_first_call() {
                    if model.selected_layer() == Some(*id) {
                        scope.submit(model, VoxelIntent::select_layer(None));
                    }
                    for voxel in model.layer_voxels(*id) {
                        scope.submit(model, VoxelIntent::remove(voxel.id));
                    }
                }
                let layer = model.remove_layer(*id);
                removed.get_or_insert(layer);
            }
            VoxelIntent::RenameLayer { id, name, previous } => {
                let old = std::mem::replace(&mut model.layer_mut(*id).name, name.clone());
                previous.get_or_insert(old);
            }
            VoxelIntent::SelectLayer { layer, previous } => {
                let old = model.set_selected_layer(*layer);
                previous.get_or_insert(old);
            }
            VoxelIntent::SetLayerVisible { id, visible, previous, positions } => {
                if scope.is_first_call() {
                    *positions = layer_positions(model, *id);
                }
                let old = std::mem::replace(&mut model.layer_mut(*id).visible, *visible);
                previous.get_or_insert(old);
            }
            VoxelIntent::MoveLayer { id, up, positions } => {
                if scope.is_first_call() {
                    let index = model.layer_index(*id).unwrap_or_default();
                    let neighbour = if *up { index.checked_sub(1) } else { Some(index + 1) };
                    let neighbour = neighbour.and_then(|i| model.layer_order().get(i).copied());
                    *positions = layer_positions(model, *id);
                    if let Some(other) = neighbour {
                        positions.extend(layer_positions(model, other));
                    }
                }
                model.shift_layer(*id, *up);
            }

            VoxelIntent::AddVoxel { id, layer, spec } => {
                model.insert_voxel(Voxel::from_spec(*id, *layer, spec));
            }
            VoxelIntent::RemoveVoxel { id, removed } => {
                let voxel = model.remove_voxel(*id);
                removed.get_or_insert(voxel);
            }
            VoxelIntent::MoveVoxel { id, target } => {
                if scope.is_first_call() {
                    submit_relocation(model, scope, &[(*id, *target)]);
                }
            }
            VoxelIntent::SetColor { id, color, previous, .. } => {
                let old = std::mem::replace(&mut model.voxel_mut(*id).color, *color);
                previous.get_or_insert(old);
            }
            VoxelIntent::SetAlpha { id, alpha, previous, .. } => {
                let old = std::mem::replace(&mut model.voxel_mut(*id).alpha, *alpha);
                previous.get_or_insert(old);
            }
            VoxelIntent::SetSelected { id, selected, previous, .. } => {
                let old = std::mem::replace(&mut model.voxel_mut(*id).selected, *selected);
                previous.get_or_insert(old);
            }
            VoxelIntent::SetTexture { id, face, texture, previous, .. } => {
                let current = model.voxel_mut(*id).faces;
                let old = replace_faces(model, *id, assign_texture(current, *face, *texture));
                previous.get_or_insert(old);
            }
            VoxelIntent::RotateTexture { id, face, previous, .. } => {
                let current = model.voxel_mut(*id).faces;
                let turned = edit_faces(current, *face, |f| f.rotation = (f.rotation + 1) % 4);
                let old = replace_faces(model, *id, turned);
                previous.get_or_insert(old);
            }
            VoxelIntent::FlipTexture { id, face, previous, .. } => {
                let current = model.voxel_mut(*id).faces;
                let flipped = edit_faces(current, *face, |f| f.flipped = !f.flipped);
                let old = replace_faces(model, *id, flipped);
                previous.get_or_insert(old);
            }

            VoxelIntent::ClearLayer { layer } => {
                if scope.is_first_call() {
                    for voxel in model.layer_voxels(*layer) {
                        scope.submit(model, VoxelIntent::remove(voxel.id));
                    }
                }
            }
            VoxelIntent::MergeVisibleLayers { id, name } => {
                if scope.is_first_call() {
                    let merged = model.visible_voxels();
                    let sources: Vec<LayerId> = model.visible_layers().map(|l| l.id).collect();
                    scope.submit(model, VoxelIntent::CreateLayer { id: *id, name: name.clone() });
                    for voxel in &merged {
                        let voxel_id = model.allocate_voxel_id();
                        scope.submit(model, VoxelIntent::AddVoxel {
                            id: voxel_id,
                            layer: *id,
                            spec: voxel.spec(),
                        });
                    }
                    for source in sources {
                        scope.submit(model, VoxelIntent::DeleteLayer { id: source, removed: None });
                    }
                    scope.submit(model, VoxelIntent::select_layer(Some(*id)));
                }
            }
            VoxelIntent::Migrate { ids, layer, name } => {
                if scope.is_first_call() {
                    let voxels: Vec<Voxel> = existing(model, ids).collect();
                    scope.submit(model, VoxelIntent::CreateLayer { id: *layer, name: name.clone() });
                    for voxel in voxels {
                        // a voxel already moved owns this position
                        if !model.layer(*layer).is_some_and(|l| l.is_free(voxel.position)) {
                            continue;
                        }
                        scope.submit(model, VoxelIntent::remove(voxel.id));
                        scope.submit(model, VoxelIntent::AddVoxel {
                            id: voxel.id,
                            layer: *layer,
                            spec: voxel.spec(),
                        });
                    }
                    scope.submit(model, VoxelIntent::select_layer(Some(*layer)));
                }
            }
            VoxelIntent::MassAdd { layer, specs } => {
                if scope.is_first_call() {
                    for spec in specs.iter() {
                        if model.layer(*layer).is_some_and(|l| l.is_free(spec.position)) {
                            let id = model.allocate_voxel_id();
                            scope.submit(model, VoxelIntent::AddVoxel { id, layer: *layer, spec: *spec });
                        }
                    }
                }
            }
            VoxelIntent::MassRemove { ids } => {
                if scope.is_first_call() {
                    let voxels: Vec<Voxel> = existing(model, ids).collect();
                    for voxel in voxels {
                        scope.submit(model, VoxelIntent::remove(voxel.id));
                    }
                }
            }
            VoxelIntent::MassSelect { ids, selected } => {
                if scope.is_first_call() {
                    let voxels: Vec<Voxel> = existing(model, ids).filter(|v| v.selected != *selected).collect();
                    for voxel in voxels {
                        scope.submit(model, VoxelIntent::set_selected(&voxel, *selected));
                    }
                }
            }
            VoxelIntent::MassColor { ids, color } => {
                if scope.is_first_call() {
                    let voxels: Vec<Voxel> = existing(model, ids).filter(|v| v.color != *color).collect();
                    for voxel in voxels {
                        scope.submit(model, VoxelIntent::set_color(&voxel, *color));
                    }
                }
            }
            VoxelIntent::MassShiftColor { ids, offset } => {
                if scope.is_first_call() {
                    let voxels: Vec<Voxel> = existing(model, ids).collect();
                    for voxel in voxels {
                        let color = voxel.color.shifted(*offset);
                        if color != voxel.color {
                            scope.submit(model, VoxelIntent::set_color(&voxel, color));
                        }
                    }
                }
            }
            VoxelIntent::MassMove { ids, shift } => {
                if scope.is_first_call() {
                    let moves: Vec<(VoxelId, IVec3)> = existing(model, ids)
                        .map(|v| (v.id, v.position - *shift))
                        .collect();
                    submit_relocation(model, scope, &moves);
                }
            }
            VoxelIntent::MassSetTexture { ids, texture } => {
                if scope.is_first_call() {
                    let voxels: Vec<Voxel> = existing(model, ids).collect();
                    for voxel in voxels {
                        scope.submit(model, VoxelIntent::set_texture(&voxel, None, *texture));
                    }
                }
            }
            VoxelIntent::RotateAroundCenter { ids, axis, quarter_turns } => {
                if scope.is_first_call() {
                    let voxels: Vec<Voxel> = existing(model, ids).collect();
                    if let Some((min, max)) = bounds(voxels.iter().map(|v| v.position)) {
                        let moves: Vec<(VoxelId, IVec3)> = voxels
                            .iter()
                            .map(|v| (v.id, rotate_quarter(v.position, min, max, *axis, *quarter_turns)))
                            .collect();
                        submit_relocation(model, scope, &moves);
                    }
                }
            }
            VoxelIntent::Mirror { ids, axis } => {
                if scope.is_first_call() {
                    let voxels: Vec<Voxel> = existing(model, ids).collect();
                    if let Some((min, max)) = bounds(voxels.iter().map(|v| v.position)) {
                        let moves: Vec<(VoxelId, IVec3)> = voxels
                            .iter()
                            .map(|v| (v.id, mirror(v.position, min, max, *axis)))
                            .collect();
                        submit_relocation(model, scope, &moves);
                    }
                }
            }

            VoxelIntent::AddTexture { id, texture } => {
                model.insert_texture(*id, texture.clone());
                if scope.is_first_call() {
                    scope.submit(model, VoxelIntent::select_texture(Some(*id)));
                }
            }
            VoxelIntent::AddTextureGrid { tiles } => {
                if scope.is_first_call() {
                    for texture in std::mem::take(tiles) {
                        let id = model.allocate_texture_id();
                        scope.submit(model, VoxelIntent::AddTexture { id, texture });
                    }
                }
            }
            VoxelIntent::RemoveTexture { id, removed } => {
                if scope.is_first_call() && model.selected_texture() == Some(*id) {
                    scope.submit(model, VoxelIntent::select_texture(None));
                }
                let texture = model.remove_texture(*id);
                removed.get_or_insert(texture);
            }
            VoxelIntent::RemoveUnusedTextures => {
                if scope.is_first_call() {
                    let unused: Vec<TextureId> = model
                        .texture_ids()
                        .filter(|id| !model.is_texture_used(*id))
                        .collect();
                    for id in unused {
                        scope.submit(model, VoxelIntent::RemoveTexture { id, removed: None });
                    }
                }
            }
            VoxelIntent::ReplaceTexture { id, texture, previous, positions } => {
                if scope.is_first_call() {
                    *positions = model
                        .voxels()
                        .filter(|v| v.uses_texture(*id))
                        .map(|v| v.position)
                        .collect();
                }
                let old = model.replace_texture(*id, texture.clone());
                previous.get_or_insert(old);
            }
            VoxelIntent::SelectTexture { texture, previous } => {
                let old = model.set_selected_texture(*texture);
                previous.get_or_insert(old);
            }
        }
    }

    fn unapply(&mut self, model: &mut VoxelContainer) {
        match self {
            VoxelIntent::CreateLayer { id, .. } => {
                model.remove_layer(*id);
            }
            VoxelIntent::DeleteLayer { removed, .. } => {
                let (index, layer) = captured(removed, "layer deletion");
                model.insert_layer(index, layer);
            }
            VoxelIntent::RenameLayer { id, previous, .. } => {
                model.layer_mut(*id).name = captured(previous, "layer rename");
            }
            VoxelIntent::SelectLayer { previous, .. } => {
                model.set_selected_layer(captured(previous, "layer selection"));
            }
            VoxelIntent::SetLayerVisible { id, previous, .. } => {
                model.layer_mut(*id).visible = captured(previous, "layer visibility");
            }
            VoxelIntent::MoveLayer { id, up, .. } => model.shift_layer(*id, !*up),

            VoxelIntent::AddVoxel { id, .. } => {
                model.remove_voxel(*id);
            }
            VoxelIntent::RemoveVoxel { removed, .. } => {
                model.insert_voxel(captured(removed, "voxel removal"));
            }
            VoxelIntent::SetColor { id, previous, .. } => {
                model.voxel_mut(*id).color = captured(previous, "voxel color");
            }
            VoxelIntent::SetAlpha { id, previous, .. } => {
                model.voxel_mut(*id).alpha = captured(previous, "voxel alpha");
            }
            VoxelIntent::SetSelected { id, previous, .. } => {
                model.voxel_mut(*id).selected = captured(previous, "voxel selection");
            }
            VoxelIntent::SetTexture { id, previous, .. }
            | VoxelIntent::RotateTexture { id, previous, .. }
            | VoxelIntent::FlipTexture { id, previous, .. } => {
                model.voxel_mut(*id).faces = captured(previous, "voxel faces");
            }

            VoxelIntent::MoveVoxel { .. }
            | VoxelIntent::ClearLayer { .. }
            | VoxelIntent::MergeVisibleLayers { .. }
            | VoxelIntent::Migrate { .. }
            | VoxelIntent::MassAdd { .. }
            | VoxelIntent::MassRemove { .. }
            | VoxelIntent::MassSelect { .. }
            | VoxelIntent::MassColor { .. }
            | VoxelIntent::MassShiftColor { .. }
            | VoxelIntent::MassMove { .. }
            | VoxelIntent::MassSetTexture { .. }
            | VoxelIntent::RotateAroundCenter { .. }
            | VoxelIntent::Mirror { .. }
            | VoxelIntent::AddTextureGrid { .. }
            | VoxelIntent::RemoveUnusedTextures => {}

            VoxelIntent::AddTexture { id, .. } => {
                model.remove_texture(*id);
            }
            VoxelIntent::RemoveTexture { id, removed } => {
                model.insert_texture(*id, captured(removed, "texture removal"));
            }
            VoxelIntent::ReplaceTexture { id, previous, .. } => {
                model.replace_texture(*id, captured(previous, "texture replacement"));
            }
            VoxelIntent::SelectTexture { previous, .. } => {
                model.set_selected_texture(captured(previous, "texture selection"));
            }
        }
    }

    fn record(&self, changes: &mut ChangeSet<IVec3>) {
        match self {
            VoxelIntent::CreateLayer { .. }
            | VoxelIntent::DeleteLayer { .. }
            | VoxelIntent::RenameLayer { .. }
            | VoxelIntent::SelectLayer { .. } => changes.mark(ChangeFlags::LAYERS),
            VoxelIntent::SetLayerVisible { positions, .. } | VoxelIntent::MoveLayer { positions, .. } => {
                changes.extend(positions.iter().copied());
                changes.mark(ChangeFlags::LAYERS | ChangeFlags::VOXELS);
            }

            VoxelIntent::AddVoxel { spec, .. } => {
                changes.insert(spec.position);
                changes.mark(ChangeFlags::VOXELS);
                if spec.selected {
                    changes.mark(ChangeFlags::SELECTION);
                }
            }
            VoxelIntent::RemoveVoxel { removed, .. } => {
                if let Some(voxel) = removed {
                    changes.insert(voxel.position);
                    if voxel.selected {
                        changes.mark(ChangeFlags::SELECTION);
                    }
                }
                changes.mark(ChangeFlags::VOXELS);
            }
            VoxelIntent::SetColor { position, .. }
            | VoxelIntent::SetAlpha { position, .. }
            | VoxelIntent::SetTexture { position, .. }
            | VoxelIntent::RotateTexture { position, .. }
            | VoxelIntent::FlipTexture { position, .. } => {
                changes.insert(*position);
                changes.mark(ChangeFlags::VOXELS);
            }
            VoxelIntent::SetSelected { position, .. } => {
                changes.insert(*position);
                changes.mark(ChangeFlags::VOXELS | ChangeFlags::SELECTION);
            }

            VoxelIntent::MoveVoxel { .. }
            | VoxelIntent::ClearLayer { .. }
            | VoxelIntent::MergeVisibleLayers { .. }
            | VoxelIntent::Migrate { .. }
            | VoxelIntent::MassAdd { .. }
            | VoxelIntent::MassRemove { .. }
            | VoxelIntent::MassSelect { .. }
            | VoxelIntent::MassColor { .. }
            | VoxelIntent::MassShiftColor { .. }
            | VoxelIntent::MassMove { .. }
            | VoxelIntent::MassSetTexture { .. }
            | VoxelIntent::RotateAroundCenter { .. }
            | VoxelIntent::Mirror { .. }
            | VoxelIntent::AddTextureGrid { .. }
            | VoxelIntent::RemoveUnusedTextures => {}

            VoxelIntent::AddTexture { .. }
            | VoxelIntent::RemoveTexture { .. }
            | VoxelIntent::SelectTexture { .. } => changes.mark(ChangeFlags::TEXTURES),
            VoxelIntent::ReplaceTexture { positions, .. } => {
                changes.extend(positions.iter().copied());
                changes.mark(ChangeFlags::TEXTURES | ChangeFlags::VOXELS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Transaction;

    fn model_with_layer() -> VoxelContainer {
        let mut model = VoxelContainer::new();
        model.insert_layer(0, VoxelLayer::new(LayerId(0), "base"));
        model
    }

    fn add(model: &mut VoxelContainer, layer: LayerId, position: IVec3, color: Color) -> VoxelId {
        let id = model.allocate_voxel_id();
        Transaction::run(model, VoxelIntent::AddVoxel {
            id,
            layer,
            spec: VoxelSpec::new(position, color),
        });
        id
    }

    #[test]
    fn test_rotate_quarter_around_odd_centre() {
        let (min, max) = (IVec3::ZERO, IVec3::new(2, 0, 0));
        // centre (1, 0, 0): (2,0,0) turns to (1,1,0)
        assert_eq!(rotate_quarter(IVec3::new(2, 0, 0), min, max, Axis::Z, 1), IVec3::new(1, 1, 0));
        assert_eq!(rotate_quarter(IVec3::new(2, 0, 0), min, max, Axis::Z, 2), IVec3::new(0, 0, 0));
        assert_eq!(rotate_quarter(IVec3::new(2, 0, 0), min, max, Axis::Z, 4), IVec3::new(2, 0, 0));
    }

    #[test]
    fn test_rotate_quarter_half_cell_rounds_up() {
        let (min, max) = (IVec3::ZERO, IVec3::new(1, 0, 0));
        // centre (0.5, 0, 0): (1,0,0) -> (0.5, 0.5, 0) -> (1, 1, 0)
        assert_eq!(rotate_quarter(IVec3::new(1, 0, 0), min, max, Axis::Z, 1), IVec3::new(1, 1, 0));
        assert_eq!(rotate_quarter(IVec3::new(0, 0, 0), min, max, Axis::Z, 1), IVec3::new(1, 0, 0));
    }

    #[test]
    fn test_mirror() {
        let (min, max) = (IVec3::new(0, 0, 0), IVec3::new(3, 5, 1));
        assert_eq!(mirror(IVec3::new(1, 2, 0), min, max, Axis::X), IVec3::new(2, 2, 0));
        assert_eq!(mirror(IVec3::new(1, 2, 0), min, max, Axis::Y), IVec3::new(1, 3, 0));
    }

    #[test]
    fn test_assign_texture_keeps_rotation() {
        let mut faces = uniform_faces(TextureId(1));
        faces[2].rotation = 3;
        let updated = assign_texture(Some(faces), Some(2), Some(TextureId(5))).unwrap();
        assert_eq!(updated[2].texture, TextureId(5));
        assert_eq!(updated[2].rotation, 3);
        assert_eq!(updated[0].texture, TextureId(1));

        assert_eq!(assign_texture(Some(faces), None, None), None);
        let fresh = assign_texture(None, Some(0), Some(TextureId(2))).unwrap();
        assert!(fresh.iter().all(|f| f.texture == TextureId(2)));
    }

    #[test]
    fn test_move_voxel_evicts_occupant() {
        let mut model = model_with_layer();
        let a = add(&mut model, LayerId(0), IVec3::ZERO, Color::new(1, 0, 0));
        let b = add(&mut model, LayerId(0), IVec3::X, Color::new(2, 0, 0));
        let before = model.clone();

        let mut tx = Transaction::run(&mut model, VoxelIntent::MoveVoxel { id: a, target: IVec3::X });
        assert!(model.voxel(b).is_none());
        assert_eq!(model.voxel(a).unwrap().position, IVec3::X);
        assert_eq!(model.voxel_count(), 1);

        let changes = tx.changes();
        assert!(changes.contains(&IVec3::ZERO) && changes.contains(&IVec3::X));

        tx.revert(&mut model);
        assert_eq!(model, before);
        tx.replay(&mut model);
        assert_eq!(model.voxel(a).unwrap().position, IVec3::X);
    }

    #[test]
    fn test_mass_move_swaps_cells() {
        let mut model = model_with_layer();
        let a = add(&mut model, LayerId(0), IVec3::ZERO, Color::new(1, 0, 0));
        let b = add(&mut model, LayerId(0), IVec3::X, Color::new(2, 0, 0));

        // shift by -1 on x: a -> (1,0,0) which b vacates -> (2,0,0)
        Transaction::run(&mut model, VoxelIntent::MassMove {
            ids: vec![a, b],
            shift: IVec3::new(-1, 0, 0),
        });
        assert_eq!(model.voxel(a).unwrap().position, IVec3::X);
        assert_eq!(model.voxel(b).unwrap().position, IVec3::new(2, 0, 0));
    }

    #[test]
    fn test_delete_layer_restores_order_and_voxels() {
        let mut model = model_with_layer();
        Transaction::run(&mut model, VoxelIntent::CreateLayer { id: LayerId(1), name: "top".into() });
        Transaction::run(&mut model, VoxelIntent::select_layer(Some(LayerId(0))));
        add(&mut model, LayerId(0), IVec3::ONE, Color::new(9, 9, 9));
        model.layer_mut(LayerId(0)).visible = false;
        let before = model.clone();

        let mut tx = Transaction::run(&mut model, VoxelIntent::DeleteLayer { id: LayerId(0), removed: None });
        assert!(!model.contains_layer(LayerId(0)));
        assert_eq!(model.selected_layer(), None);
        assert_eq!(model.voxel_count(), 0);

        tx.revert(&mut model);
        assert_eq!(model, before);
        assert_eq!(model.layer_order(), &[LayerId(1), LayerId(0)]);
        assert!(!model.layer(LayerId(0)).unwrap().visible);
    }

    #[test]
    fn test_migrate_skips_taken_positions() {
        let mut model = model_with_layer();
        Transaction::run(&mut model, VoxelIntent::CreateLayer { id: LayerId(1), name: "top".into() });
        let a = add(&mut model, LayerId(1), IVec3::ZERO, Color::new(1, 1, 1));
        let b = add(&mut model, LayerId(0), IVec3::ZERO, Color::new(2, 2, 2));
        let before = model.clone();

        let mut tx = Transaction::run(&mut model, VoxelIntent::Migrate {
            ids: vec![a, b],
            layer: LayerId(2),
            name: "moved".into(),
        });
        assert_eq!(model.voxel(a).unwrap().layer, LayerId(2));
        assert_eq!(model.voxel(b).unwrap().layer, LayerId(0));

        tx.revert(&mut model);
        assert_eq!(model, before);
    }

    #[test]
    fn test_layer_visibility_records_positions() {
        let mut model = model_with_layer();
        add(&mut model, LayerId(0), IVec3::ONE, Color::default());
        let tx = Transaction::run(&mut model, VoxelIntent::SetLayerVisible {
            id: LayerId(0),
            visible: false,
            previous: None,
            positions: Vec::new(),
        });
        let changes = tx.changes();
        assert!(changes.contains(&IVec3::ONE));
        assert!(changes.touches(ChangeFlags::LAYERS));
    }

    #[test]
    fn test_add_texture_selects_and_undo_deselects() {
        let mut model = model_with_layer();
        let texture = Texture::new(image::RgbaImage::new(2, 2));
        let mut tx = Transaction::run(&mut model, VoxelIntent::AddTexture { id: TextureId(0), texture });
        assert_eq!(model.selected_texture(), Some(TextureId(0)));
        assert!(tx.changes().touches(ChangeFlags::TEXTURES));

        tx.revert(&mut model);
        assert_eq!(model.selected_texture(), None);
        assert!(model.texture(TextureId(0)).is_none());
    }
}
