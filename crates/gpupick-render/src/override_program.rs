//! Override pipelines for the pick pass.
//!
//! One WGSL template covers every variant. Morphing, skinning and instancing
//! are switched on by `#ifdef` blocks; the face side only changes culling, so
//! eight source variants serve all 24 reachable signatures.

use std::num::NonZeroU64;

use glam::Mat4;
use gpupick_core::{FeatureSignature, PickerOptions};

use crate::error::RenderResult;
use crate::geometry::MAX_MORPH_TARGETS;
use crate::material::MeshMaterial;
use crate::shader::ShaderBuilder;

/// Color format of pick targets.
pub const PICK_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Depth format of pick targets.
pub const PICK_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

const TEMPLATE: &str = include_str!("shaders/pick_override.wgsl");

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const JOINT_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Uint32x4];
const WEIGHT_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x4];
const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    3 => Float32x4,
    4 => Float32x4,
    5 => Float32x4,
    6 => Float32x4,
];

/// Camera uniforms for the pick pass (matches `PickCamera` in the shader).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PickCameraUniforms {
    pub view_proj: [[f32; 4]; 4],
}

impl PickCameraUniforms {
    #[must_use]
    pub fn new(view_proj: Mat4) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
        }
    }
}

/// Per-draw uniforms (matches `PickObject` in the shader).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PickObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub id_color: [f32; 4],
    pub morph_weights: [[f32; 4]; 2],
    pub morph_count: u32,
    pub vertex_count: u32,
    pub _padding: [u32; 2],
}

impl PickObjectUniforms {
    /// Packs the draw's transform, id color and morph weights.
    ///
    /// At most `available_targets` and [`MAX_MORPH_TARGETS`] weights are used.
    #[must_use]
    pub fn new(
        model: Mat4,
        id_color: [f32; 4],
        influences: &[f32],
        available_targets: usize,
        vertex_count: u32,
    ) -> Self {
        let count = influences
            .len()
            .min(available_targets)
            .min(MAX_MORPH_TARGETS);
        let mut morph_weights = [[0.0; 4]; 2];
        for (index, weight) in influences.iter().take(count).enumerate() {
            morph_weights[index / 4][index % 4] = *weight;
        }
        Self {
            model: model.to_cols_array_2d(),
            id_color,
            morph_weights,
            morph_count: u32::try_from(count).unwrap_or(0),
            vertex_count,
            _padding: [0; 2],
        }
    }
}

/// Bind group layouts shared by every override pipeline.
#[derive(Debug)]
pub struct PickLayouts {
    /// Group 0: camera uniforms.
    pub camera: wgpu::BindGroupLayout,
    /// Group 1: per-draw uniforms at a dynamic offset.
    pub object: wgpu::BindGroupLayout,
    /// Group 2: bone palette and morph deltas.
    pub deformation: wgpu::BindGroupLayout,
    pub pipeline: wgpu::PipelineLayout,
}

impl PickLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Pick Camera Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(
                        std::mem::size_of::<PickCameraUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });

        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Pick Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(
                        std::mem::size_of::<PickObjectUniforms>() as u64
                    ),
                },
                count: None,
            }],
        });

        let storage_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let deformation = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Pick Deformation Bind Group Layout"),
            entries: &[storage_entry(0), storage_entry(1)],
        });

        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Pick Override Pipeline Layout"),
            bind_group_layouts: &[&camera, &object, &deformation],
            push_constant_ranges: &[],
        });

        Self {
            camera,
            object,
            deformation,
            pipeline,
        }
    }
}

/// Preprocessed shader sources, one per combination of vertex features.
#[derive(Debug, Clone)]
pub struct VariantSources {
    sources: Vec<String>,
}

impl VariantSources {
    const FEATURE_MASK: u8 = FeatureSignature::MORPH_TARGETS
        | FeatureSignature::SKINNING
        | FeatureSignature::INSTANCING;

    /// Resolves every variant of the override template.
    pub fn new() -> RenderResult<Self> {
        let sources = (0..=Self::FEATURE_MASK)
            .map(|bits| {
                let signature = FeatureSignature::new(
                    bits & FeatureSignature::MORPH_TARGETS != 0,
                    bits & FeatureSignature::SKINNING != 0,
                    bits & FeatureSignature::INSTANCING != 0,
                    gpupick_core::Side::Front,
                );
                ShaderBuilder::new()
                    .with_source(TEMPLATE)
                    .with_defines(signature.shader_defines())
                    .source()
            })
            .collect::<RenderResult<Vec<_>>>()?;
        Ok(Self { sources })
    }

    /// Resolved source for a signature.
    #[must_use]
    pub fn get(&self, signature: FeatureSignature) -> &str {
        let index = usize::from(signature.bits() & Self::FEATURE_MASK);
        self.sources.get(index).map_or(TEMPLATE, String::as_str)
    }
}

/// A compiled override pipeline.
#[derive(Debug)]
pub struct OverrideProgram {
    signature: FeatureSignature,
    pipeline: wgpu::RenderPipeline,
}

impl OverrideProgram {
    /// Compiles the pipeline for `signature` from an already resolved source.
    pub fn new(
        device: &wgpu::Device,
        layouts: &PickLayouts,
        source: &str,
        signature: FeatureSignature,
        options: &PickerOptions,
    ) -> Self {
        let label = format!("{} override {:#08b}", options.label, signature.bits());
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let buffers = vertex_layouts(signature);
        let (depth_write_enabled, depth_compare) = if options.depth_test {
            (true, wgpu::CompareFunction::Less)
        } else {
            (false, wgpu::CompareFunction::Always)
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&layouts.pipeline),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: PICK_COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: MeshMaterial::cull_mode(signature.side()),
                ..wgpu::PrimitiveState::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: PICK_DEPTH_FORMAT,
                depth_write_enabled,
                depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            signature,
            pipeline,
        }
    }

    /// The signature this pipeline was built for.
    #[must_use]
    pub fn signature(&self) -> FeatureSignature {
        self.signature
    }

    #[must_use]
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}

/// Vertex buffer slots in bind order: positions, then joints and weights
/// when skinned, then the instance matrix when instanced.
fn vertex_layouts(signature: FeatureSignature) -> Vec<wgpu::VertexBufferLayout<'static>> {
    let mut layouts = vec![wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &POSITION_ATTRIBUTES,
    }];
    if signature.uses_skinning() {
        layouts.push(wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[u32; 4]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &JOINT_ATTRIBUTES,
        });
        layouts.push(wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 4]>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &WEIGHT_ATTRIBUTES,
        });
    }
    if signature.uses_instancing() {
        layouts.push(wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[[f32; 4]; 4]>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &INSTANCE_ATTRIBUTES,
        });
    }
    layouts
}
