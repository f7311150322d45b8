//! gpupick: find the object under a pixel by rendering it.
//!
//! The picker redraws the host's current draw lists into a 1x1 offscreen
//! target, with each object's identifier encoded in its flat output color,
//! then reads that single pixel back.
//!
//! # Quick Start
//!
//! ```no_run
//! use gpupick::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut engine = create_headless_engine(800, 600)?;
//!     let mut picker = create_picker(&mut engine, PickerOptions::default())?;
//!
//!     let quad = GeometryData::triangles(
//!         vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]],
//!         Some(vec![0, 1, 2, 0, 2, 3]),
//!     );
//!     let geometry = engine.upload_geometry(&quad, "quad");
//!     let id = ObjectId::new(17).expect("non-zero id");
//!
//!     let mut lists = DrawLists::new();
//!     lists.opaque.push(RenderItem::new(id, geometry, MeshMaterial::default()));
//!
//!     let mut camera = Camera::new(800.0 / 600.0);
//!     camera.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
//!
//!     let hit = picker.pick(&mut engine, &mut camera, &lists, &PickRequest::new(400, 300))?;
//!     assert_eq!(hit, Some(id));
//!     Ok(())
//! }
//! ```

// Re-export core types
pub use gpupick_core::{
    decode_pixel, resolve_pick_root, Camera, ClearColor, DrawItem, DrawLists, FeatureSignature,
    Mat4, ObjectHierarchy, ObjectId, ParentMap, PickBackend, PickError, PickRequest, Picker,
    PickerOptions, ProjectionMode, Result, Side, Vec2, Vec3, Vec4, ViewOffset,
};

// Re-export render types
pub use gpupick_render::{
    GeometryData, GpuGeometry, InstanceSet, MeshMaterial, OverrideProgram, RenderEngine,
    RenderError, RenderItem, Skeleton, TargetId,
};

pub use wgpu;

use pollster::FutureExt;

/// A picker driving the wgpu engine.
pub type GpuPicker = Picker<RenderEngine>;

/// Initializes `env_logger` once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Creates a headless engine with a `width` x `height` drawing buffer.
///
/// Fails with [`PickError::RenderingUnavailable`] when no adapter or device
/// can be created.
pub fn create_headless_engine(width: u32, height: u32) -> Result<RenderEngine> {
    let engine = RenderEngine::new_headless(width, height).block_on()?;
    log::info!("gpupick engine ready");
    Ok(engine)
}

/// Creates a picker on `engine`.
pub fn create_picker(engine: &mut RenderEngine, options: PickerOptions) -> Result<GpuPicker> {
    Picker::new(engine, options)
}

/// Picks at a pixel and resolves the hit to its pick root in `hierarchy`.
///
/// Returns `Ok(None)` on a miss and when the hit object is no longer part
/// of the hierarchy.
pub fn pick_object<H: ObjectHierarchy + ?Sized>(
    picker: &mut GpuPicker,
    engine: &mut RenderEngine,
    camera: &mut Camera,
    lists: &DrawLists<RenderItem>,
    request: &PickRequest<'_, RenderItem>,
    hierarchy: &H,
) -> Result<Option<ObjectId>> {
    let hit = picker.pick(engine, camera, lists, request)?;
    Ok(hit.and_then(|id| resolve_pick_root(hierarchy, id)))
}
