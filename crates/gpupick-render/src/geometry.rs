//! GPU geometry shared by the host's draw items.
//!
//! The picker draws items with their original buffers, so everything a
//! vertex stage can need lives here: positions, optional skin attributes,
//! optional morph target deltas, and per-instance transforms.

use glam::Mat4;
use wgpu::util::DeviceExt;

/// Most morph targets blended per draw.
pub const MAX_MORPH_TARGETS: usize = 8;

/// CPU-side mesh data to upload.
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Vertex positions in object space.
    pub positions: Vec<[f32; 3]>,
    /// Triangle list indices. `None` draws positions in order.
    pub indices: Option<Vec<u32>>,
    /// Four bone indices per vertex.
    pub joints: Option<Vec<[u32; 4]>>,
    /// Four bone weights per vertex.
    pub weights: Option<Vec<[f32; 4]>>,
    /// Position deltas, one list per morph target, each as long as `positions`.
    pub morph_targets: Vec<Vec<[f32; 3]>>,
}

impl GeometryData {
    /// Triangle list geometry without skinning or morphing.
    #[must_use]
    pub fn triangles(positions: Vec<[f32; 3]>, indices: Option<Vec<u32>>) -> Self {
        Self {
            positions,
            indices,
            ..Self::default()
        }
    }

    /// Adds skin attributes.
    #[must_use]
    pub fn with_skin(mut self, joints: Vec<[u32; 4]>, weights: Vec<[f32; 4]>) -> Self {
        self.joints = Some(joints);
        self.weights = Some(weights);
        self
    }

    /// Adds a morph target.
    #[must_use]
    pub fn with_morph_target(mut self, deltas: Vec<[f32; 3]>) -> Self {
        self.morph_targets.push(deltas);
        self
    }
}

/// Bone indices and weights as vertex buffers.
#[derive(Debug)]
pub struct SkinBuffers {
    pub joints: wgpu::Buffer,
    pub weights: wgpu::Buffer,
}

/// Morph deltas laid out target-major in a storage buffer.
#[derive(Debug)]
pub struct MorphBuffer {
    pub deltas: wgpu::Buffer,
    pub target_count: u32,
}

/// Uploaded mesh geometry.
#[derive(Debug)]
pub struct GpuGeometry {
    pub positions: wgpu::Buffer,
    pub vertex_count: u32,
    pub indices: Option<(wgpu::Buffer, u32)>,
    pub skin: Option<SkinBuffers>,
    pub morph: Option<MorphBuffer>,
}

impl GpuGeometry {
    /// Uploads mesh data.
    ///
    /// Skin attributes and morph targets whose length does not match the
    /// position count are dropped with a warning; the mesh still draws rigidly.
    pub fn upload(device: &wgpu::Device, data: &GeometryData, label: &str) -> Self {
        let vertex_count = u32::try_from(data.positions.len()).unwrap_or(u32::MAX);

        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} positions")),
            contents: bytemuck::cast_slice(&data.positions),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let indices = data.indices.as_ref().filter(|i| !i.is_empty()).map(|indices| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} indices")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, u32::try_from(indices.len()).unwrap_or(u32::MAX))
        });

        let skin = match (&data.joints, &data.weights) {
            (Some(joints), Some(weights))
                if joints.len() == data.positions.len() && weights.len() == data.positions.len() =>
            {
                Some(SkinBuffers {
                    joints: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{label} joints")),
                        contents: bytemuck::cast_slice(joints),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                    weights: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{label} weights")),
                        contents: bytemuck::cast_slice(weights),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                })
            }
            (None, None) => None,
            _ => {
                log::warn!("{label}: skin attributes do not match vertex count, ignoring");
                None
            }
        };

        let valid_targets: Vec<&Vec<[f32; 3]>> = data
            .morph_targets
            .iter()
            .filter(|target| target.len() == data.positions.len())
            .collect();
        if valid_targets.len() != data.morph_targets.len() {
            log::warn!("{label}: dropped morph targets with mismatched vertex count");
        }
        let morph = (!valid_targets.is_empty() && !data.positions.is_empty()).then(|| {
            let deltas: Vec<[f32; 4]> = valid_targets
                .iter()
                .flat_map(|target| target.iter().map(|d| [d[0], d[1], d[2], 0.0]))
                .collect();
            MorphBuffer {
                deltas: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{label} morph deltas")),
                    contents: bytemuck::cast_slice(&deltas),
                    usage: wgpu::BufferUsages::STORAGE,
                }),
                target_count: u32::try_from(valid_targets.len()).unwrap_or(u32::MAX),
            }
        });

        Self {
            positions,
            vertex_count,
            indices,
            skin,
            morph,
        }
    }

    /// Number of morph targets available on this geometry.
    #[must_use]
    pub fn morph_target_count(&self) -> usize {
        self.morph
            .as_ref()
            .map_or(0, |morph| morph.target_count as usize)
    }
}

/// Bone matrices of a skinned object, already multiplied by their inverse bind matrices.
#[derive(Debug)]
pub struct Skeleton {
    pub bones: wgpu::Buffer,
    pub bone_count: usize,
}

impl Skeleton {
    /// Uploads bone matrices. An empty skeleton gets one identity bone.
    pub fn new(device: &wgpu::Device, bones: &[Mat4], label: &str) -> Self {
        let matrices = bone_matrices(bones);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} bones")),
            contents: bytemuck::cast_slice(&matrices),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            bones: buffer,
            bone_count: matrices.len(),
        }
    }

    /// Writes the current pose. Extra bones beyond the allocated count are ignored.
    pub fn update(&self, queue: &wgpu::Queue, bones: &[Mat4]) {
        let mut matrices = bone_matrices(bones);
        matrices.truncate(self.bone_count);
        queue.write_buffer(&self.bones, 0, bytemuck::cast_slice(&matrices));
    }
}

fn bone_matrices(bones: &[Mat4]) -> Vec<[[f32; 4]; 4]> {
    if bones.is_empty() {
        return vec![Mat4::IDENTITY.to_cols_array_2d()];
    }
    bones.iter().map(Mat4::to_cols_array_2d).collect()
}

/// Per-instance model matrices of an instanced object.
#[derive(Debug)]
pub struct InstanceSet {
    pub transforms: wgpu::Buffer,
    pub count: u32,
}

impl InstanceSet {
    pub fn new(device: &wgpu::Device, transforms: &[Mat4], label: &str) -> Self {
        let matrices: Vec<[[f32; 4]; 4]> = transforms.iter().map(Mat4::to_cols_array_2d).collect();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} instances")),
            contents: bytemuck::cast_slice(&matrices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            transforms: buffer,
            count: u32::try_from(matrices.len()).unwrap_or(u32::MAX),
        }
    }
}
