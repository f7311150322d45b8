//! wgpu backend for gpupick.
//!
//! This crate implements [`gpupick_core::PickBackend`] on a wgpu device:
//! - Override pipelines specialised per feature signature from one WGSL template
//! - 1x1 pick targets with depth, cleared and drawn in direct passes
//! - Single pixel readback through a mapped staging buffer
//! - GPU geometry, skeletons and instance sets for the host's draw items

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Buffer sizes and offsets move between usize, u32 and u64
#![allow(clippy::cast_possible_truncation)]

pub mod engine;
pub mod error;
pub mod geometry;
pub mod item;
pub mod material;
pub mod override_program;
pub mod shader;

pub use engine::{RenderEngine, RenderTarget, TargetId};
pub use error::{RenderError, RenderResult};
pub use geometry::{GeometryData, GpuGeometry, InstanceSet, Skeleton, MAX_MORPH_TARGETS};
pub use item::RenderItem;
pub use material::MeshMaterial;
pub use override_program::{
    OverrideProgram, PickCameraUniforms, PickObjectUniforms, PICK_COLOR_FORMAT, PICK_DEPTH_FORMAT,
};
pub use shader::ShaderBuilder;
