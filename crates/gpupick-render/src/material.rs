//! The parts of a host material that affect where a mesh lands on screen.

use gpupick_core::{MaterialTraits, Side};

/// A host mesh material, reduced to its vertex-stage settings.
///
/// Color, textures and lighting never reach the pick pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshMaterial {
    /// Which faces are drawn.
    pub side: Side,
    /// Whether morph targets are enabled for meshes using this material.
    pub morph_targets: bool,
}

impl MeshMaterial {
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self {
            side,
            morph_targets: false,
        }
    }

    #[must_use]
    pub fn with_morph_targets(mut self, enabled: bool) -> Self {
        self.morph_targets = enabled;
        self
    }

    /// Maps the side to wgpu culling; triangles are counter-clockwise when front-facing.
    #[must_use]
    pub fn cull_mode(side: Side) -> Option<wgpu::Face> {
        match side {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Double => None,
        }
    }
}

impl From<MeshMaterial> for MaterialTraits {
    fn from(material: MeshMaterial) -> Self {
        Self {
            side: material.side,
            morph_targets: material.morph_targets,
        }
    }
}
