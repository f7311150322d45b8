//! Draw items as the host renderer produces them each frame.

use std::sync::Arc;

use glam::Mat4;
use gpupick_core::{DrawItem, GeometryTraits, MaterialTraits, ObjectId};

use crate::geometry::{GpuGeometry, InstanceSet, Skeleton};
use crate::material::MeshMaterial;
use crate::override_program::OverrideProgram;

/// One entry of the host's opaque or transparent list.
#[derive(Debug, Clone)]
pub struct RenderItem {
    pub object_id: ObjectId,
    pub geometry: Option<Arc<GpuGeometry>>,
    pub material: Option<MeshMaterial>,
    pub world_transform: Mat4,
    /// Bone palette for skinned meshes.
    pub skeleton: Option<Arc<Skeleton>>,
    /// Per-instance transforms for instanced meshes.
    pub instances: Option<Arc<InstanceSet>>,
    /// Current morph target weights.
    pub morph_influences: Vec<f32>,
    /// Program to pick with instead of the cached override.
    pub pick_program: Option<Arc<OverrideProgram>>,
}

impl RenderItem {
    #[must_use]
    pub fn new(object_id: ObjectId, geometry: Arc<GpuGeometry>, material: MeshMaterial) -> Self {
        Self {
            object_id,
            geometry: Some(geometry),
            material: Some(material),
            world_transform: Mat4::IDENTITY,
            skeleton: None,
            instances: None,
            morph_influences: Vec::new(),
            pick_program: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, world_transform: Mat4) -> Self {
        self.world_transform = world_transform;
        self
    }

    #[must_use]
    pub fn with_skeleton(mut self, skeleton: Arc<Skeleton>) -> Self {
        self.skeleton = Some(skeleton);
        self
    }

    #[must_use]
    pub fn with_instances(mut self, instances: Arc<InstanceSet>) -> Self {
        self.instances = Some(instances);
        self
    }

    #[must_use]
    pub fn with_morph_influences(mut self, influences: Vec<f32>) -> Self {
        self.morph_influences = influences;
        self
    }

    #[must_use]
    pub fn with_pick_program(mut self, program: Arc<OverrideProgram>) -> Self {
        self.pick_program = Some(program);
        self
    }
}

impl DrawItem for RenderItem {
    type Program = Arc<OverrideProgram>;

    fn object_id(&self) -> ObjectId {
        self.object_id
    }

    fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    fn geometry(&self) -> Option<GeometryTraits> {
        self.geometry.as_ref().map(|geometry| GeometryTraits {
            morph_targets: geometry.morph_target_count(),
        })
    }

    fn material(&self) -> Option<MaterialTraits> {
        self.material.map(MaterialTraits::from)
    }

    // A skeleton without skin attributes cannot be skinned; draw it rigid.
    fn is_skinned(&self) -> bool {
        self.skeleton.is_some()
            && self
                .geometry
                .as_ref()
                .is_some_and(|geometry| geometry.skin.is_some())
    }

    fn is_instanced(&self) -> bool {
        self.instances.is_some()
    }

    fn pick_program(&self) -> Option<&Arc<OverrideProgram>> {
        self.pick_program.as_ref()
    }
}
