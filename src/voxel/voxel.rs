//! Voxel data type

use serde::{Deserialize, Serialize};

use crate::core::{Color, IVec3, LayerId, TextureId, VoxelId};

/// Number of faces on a voxel.
pub const FACE_COUNT: usize = 6;

/// Texture placement on one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Face {
    pub texture: TextureId,
    /// Quarter turns, 0..4
    pub rotation: u8,
    pub flipped: bool,
}

impl Face {
    pub fn new(texture: TextureId) -> Self {
        Self {
            texture,
            rotation: 0,
            flipped: false,
        }
    }
}

/// Per-face texturing. `None` on a voxel means plain color.
pub type Faces = [Face; FACE_COUNT];

/// Build faces that all show `texture`.
pub fn uniform_faces(texture: TextureId) -> Faces {
    [Face::new(texture); FACE_COUNT]
}

/// Single placed voxel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Voxel {
    pub id: VoxelId,
    pub position: IVec3,
    pub color: Color,
    /// Opacity override, `None` when fully opaque
    pub alpha: Option<u8>,
    pub layer: LayerId,
    pub faces: Option<Faces>,
    pub selected: bool,
}

impl Voxel {
    /// Create a voxel from a template.
    pub fn from_spec(id: VoxelId, layer: LayerId, spec: &VoxelSpec) -> Self {
        Self {
            id,
            position: spec.position,
            color: spec.color,
            alpha: spec.alpha,
            layer,
            faces: spec.faces,
            selected: spec.selected,
        }
    }

    /// Template reproducing this voxel's appearance.
    pub fn spec(&self) -> VoxelSpec {
        VoxelSpec {
            position: self.position,
            color: self.color,
            alpha: self.alpha,
            faces: self.faces,
            selected: self.selected,
        }
    }

    /// Texture ids per face, if textured.
    pub fn texture_ids(&self) -> Option<[TextureId; FACE_COUNT]> {
        self.faces.map(|faces| faces.map(|face| face.texture))
    }

    pub fn uses_texture(&self, texture: TextureId) -> bool {
        self.faces
            .is_some_and(|faces| faces.iter().any(|face| face.texture == texture))
    }
}

/// Appearance of a voxel that has not been placed yet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoxelSpec {
    pub position: IVec3,
    pub color: Color,
    pub alpha: Option<u8>,
    pub faces: Option<Faces>,
    pub selected: bool,
}

impl VoxelSpec {
    pub fn new(position: IVec3, color: Color) -> Self {
        Self {
            position,
            color,
            alpha: None,
            faces: None,
            selected: false,
        }
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.faces = Some(uniform_faces(texture));
        self
    }

    pub fn with_faces(mut self, faces: Option<Faces>) -> Self {
        self.faces = faces;
        self
    }

    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Copy of this template at another position.
    pub fn at(mut self, position: IVec3) -> Self {
        self.position = position;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_roundtrip() {
        let spec = VoxelSpec::new(IVec3::new(1, 2, 3), Color::new(10, 20, 30))
            .with_texture(TextureId(4))
            .with_alpha(128)
            .selected();
        let voxel = Voxel::from_spec(VoxelId(9), LayerId(1), &spec);
        assert_eq!(voxel.spec(), spec);
        assert_eq!(voxel.texture_ids(), Some([TextureId(4); FACE_COUNT]));
    }

    #[test]
    fn test_uses_texture() {
        let mut voxel = Voxel::from_spec(VoxelId(0), LayerId(0), &VoxelSpec::new(IVec3::ZERO, Color::default()));
        assert!(!voxel.uses_texture(TextureId(1)));

        let mut faces = uniform_faces(TextureId(2));
        faces[3].texture = TextureId(1);
        voxel.faces = Some(faces);
        assert!(voxel.uses_texture(TextureId(1)));
        assert!(voxel.uses_texture(TextureId(2)));
        assert!(!voxel.uses_texture(TextureId(3)));
    }

    #[test]
    fn test_at_moves_template() {
        let spec = VoxelSpec::new(IVec3::ZERO, Color::new(1, 1, 1));
        assert_eq!(spec.at(IVec3::X).position, IVec3::X);
        assert_eq!(spec.at(IVec3::X).color, spec.color);
    }
}
