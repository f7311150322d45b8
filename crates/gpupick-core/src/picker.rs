//! The picker controller.
//!
//! A pick renders the host's already sorted draw lists into a 1x1 target,
//! with the camera narrowed to the requested pixel and every item drawn in a
//! flat color encoding its identifier, then reads that one pixel back.

use crate::adapter::DrawItemAdapter;
use crate::backend::{ClearColor, DirectDraw, PickBackend};
use crate::camera::{Camera, ViewOffset};
use crate::draw_item::{DrawItem, DrawLists};
use crate::error::Result;
use crate::id::{decode_pixel, ObjectId};
use crate::options::PickerOptions;

/// Clear color of the pick target. Transparent black decodes to the no-hit sentinel.
pub const PICK_CLEAR_COLOR: ClearColor = ClearColor::TRANSPARENT;

/// Where to pick, and which objects may be hit.
pub struct PickRequest<'f, T> {
    pixel: Option<(u32, u32)>,
    filter: Option<&'f dyn Fn(&T) -> bool>,
}

impl<'f, T> PickRequest<'f, T> {
    /// Picks at a pixel in backend framebuffer space (device pixel ratio already applied).
    #[must_use]
    pub fn new(x: u32, y: u32) -> Self {
        Self {
            pixel: Some((x, y)),
            filter: None,
        }
    }

    /// Picks at fractional backend pixel coordinates, truncated toward negative infinity.
    ///
    /// Negative or non-finite coordinates produce a request that never hits.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_physical(x: f32, y: f32) -> Self {
        let to_pixel = |v: f32| {
            let v = v.floor();
            (v.is_finite() && v >= 0.0 && v < u32::MAX as f32).then(|| v as u32)
        };
        Self {
            pixel: to_pixel(x).zip(to_pixel(y)),
            filter: None,
        }
    }

    /// Picks at window (logical) coordinates scaled by the device pixel ratio.
    #[must_use]
    pub fn from_logical(x: f32, y: f32, device_pixel_ratio: f32) -> Self {
        Self::from_physical(x * device_pixel_ratio, y * device_pixel_ratio)
    }

    /// Only objects for which `filter` returns true can be hit.
    #[must_use]
    pub fn with_filter(mut self, filter: &'f dyn Fn(&T) -> bool) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The target pixel, if the coordinates were representable.
    #[must_use]
    pub fn pixel(&self) -> Option<(u32, u32)> {
        self.pixel
    }

    fn accepts(&self, item: &T) -> bool {
        self.filter.is_none_or(|filter| filter(item))
    }
}

/// Exclusive hold on the renderer and camera state a pick changes.
///
/// Saves the render target, clear color and view offset on acquisition and
/// puts them back when dropped, whichever way the pick exits.
struct PickScope<'a, B: PickBackend> {
    backend: &'a mut B,
    camera: &'a mut Camera,
    render_target: Option<B::Target>,
    clear_color: ClearColor,
    view_offset: Option<ViewOffset>,
}

impl<'a, B: PickBackend> PickScope<'a, B> {
    fn acquire(backend: &'a mut B, camera: &'a mut Camera) -> Self {
        let render_target = backend.render_target();
        let clear_color = backend.clear_color();
        let view_offset = camera.view_offset();
        Self {
            backend,
            camera,
            render_target,
            clear_color,
            view_offset,
        }
    }
}

impl<B: PickBackend> Drop for PickScope<'_, B> {
    fn drop(&mut self) {
        self.backend.set_render_target(self.render_target);
        self.backend.set_clear_color(self.clear_color);
        self.camera.set_view_offset_state(self.view_offset);
    }
}

/// GPU picker bound to one backend.
///
/// Owns the 1x1 pick target and the override program cache. Picks against the
/// same backend must not interleave; `pick` takes `&mut` on everything it touches.
pub struct Picker<B: PickBackend> {
    target: B::Target,
    adapter: DrawItemAdapter<B::Program>,
    options: PickerOptions,
}

impl<B: PickBackend> Picker<B> {
    /// Creates a picker, allocating its pick target on `backend`.
    pub fn new(backend: &mut B, options: PickerOptions) -> Result<Self> {
        let target = backend.create_pick_target(&format!("{} pick target", options.label))?;
        log::debug!("created pick target {target:?}");
        Ok(Self {
            target,
            adapter: DrawItemAdapter::new(),
            options,
        })
    }

    /// Returns the identifier of the object drawn at the requested pixel.
    ///
    /// `lists` are the host's current frame lists; opaque items are drawn
    /// first, then transparent ones. Returns `Ok(None)` when nothing pickable
    /// covers the pixel or the pixel lies outside the drawing buffer.
    ///
    /// The backend's render target and clear color and the camera's view
    /// offset are restored before returning, on success and on error.
    pub fn pick(
        &mut self,
        backend: &mut B,
        camera: &mut Camera,
        lists: &DrawLists<B::Item>,
        request: &PickRequest<'_, B::Item>,
    ) -> Result<Option<ObjectId>> {
        let (width, height) = backend.drawing_buffer_size();
        let Some((x, y)) = request.pixel().filter(|&(x, y)| x < width && y < height) else {
            log::trace!("pick request {:?} outside {width}x{height}", request.pixel());
            return Ok(None);
        };

        let draws = self.prepare_draws(backend, lists, request);

        let scope = PickScope::acquire(backend, camera);
        scope.camera.set_view_offset(width, height, x, y, 1, 1);
        scope.backend.set_render_target(Some(self.target));
        scope.backend.set_clear_color(PICK_CLEAR_COLOR);
        scope.backend.clear()?;
        scope.backend.render_direct(scope.camera, &draws)?;
        let pixel = scope
            .backend
            .read_pixel(self.target)
            .inspect_err(|err| log::warn!("pick readback failed: {err}"))?;
        drop(scope);

        let hit = decode_pixel(pixel);
        log::debug!("pick at ({x}, {y}) over {} items: {hit:?}", draws.len());
        Ok(hit)
    }

    /// Pairs every accepted item with its override program and id color.
    fn prepare_draws<'l>(
        &mut self,
        backend: &mut B,
        lists: &'l DrawLists<B::Item>,
        request: &PickRequest<'_, B::Item>,
    ) -> Vec<DirectDraw<'l, B::Item, B::Program>> {
        let count = if self.options.pick_transparent {
            lists.len()
        } else {
            lists.opaque.len()
        };

        let mut draws = Vec::with_capacity(count);
        for item in lists.iter().take(count) {
            if !request.accepts(item) {
                log::trace!("filter rejected object {}", item.object_id());
                continue;
            }
            draws.push(DirectDraw {
                item,
                program: self.adapter.material_for(backend, item, &self.options),
                id_color: item.object_id().to_normalized(),
            });
        }
        draws
    }

    /// Number of override programs built so far.
    #[must_use]
    pub fn cached_programs(&self) -> usize {
        self.adapter.cache().len()
    }

    /// The pick target handle.
    #[must_use]
    pub fn target(&self) -> B::Target {
        self.target
    }

    #[must_use]
    pub fn options(&self) -> &PickerOptions {
        &self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw_item::MaterialTraits;
    use crate::error::PickError;
    use crate::signature::{FeatureSignature, Side};
    use crate::software::{SoftItem, SoftProgram, SoftwareBackend};
    use glam::{Mat4, Vec3};

    const SIZE: u32 = 100;

    fn camera() -> Camera {
        let mut camera = Camera::new(1.0);
        camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        camera
    }

    /// World point on the z = `z` plane under the center of pixel (px, py).
    #[allow(clippy::cast_precision_loss)]
    fn world_at_pixel(camera: &Camera, px: u32, py: u32, z: f32) -> Vec3 {
        let ndc_x = (px as f32 + 0.5) / SIZE as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - (py as f32 + 0.5) / SIZE as f32 * 2.0;
        let distance = camera.position.z - z;
        let half = (camera.fov * 0.5).tan() * distance;
        Vec3::new(ndc_x * half * camera.aspect_ratio, ndc_y * half, z)
    }

    fn scene(camera: &Camera) -> DrawLists<SoftItem> {
        let mut lists = DrawLists::new();
        lists
            .opaque
            .push(SoftItem::quad(17, world_at_pixel(camera, 10, 10, 0.0), 0.3));
        lists
            .opaque
            .push(SoftItem::quad(4096, world_at_pixel(camera, 50, 50, 0.0), 0.3));
        lists
    }

    fn setup() -> (SoftwareBackend, Picker<SoftwareBackend>, Camera) {
        let mut backend = SoftwareBackend::new(SIZE, SIZE);
        let picker = Picker::new(&mut backend, PickerOptions::default()).unwrap();
        (backend, picker, camera())
    }

    #[test]
    fn test_two_object_scenario() {
        let (mut backend, mut picker, mut camera) = setup();
        let lists = scene(&camera);

        let mut pick = |x, y| {
            picker
                .pick(&mut backend, &mut camera, &lists, &PickRequest::new(x, y))
                .unwrap()
                .map(ObjectId::get)
        };
        assert_eq!(pick(10, 10), Some(17));
        assert_eq!(pick(50, 50), Some(4096));
        assert_eq!(pick(0, 0), None);
    }

    #[test]
    fn test_empty_lists_never_hit() {
        let (mut backend, mut picker, mut camera) = setup();
        let lists = DrawLists::new();
        let hit = picker
            .pick(&mut backend, &mut camera, &lists, &PickRequest::new(50, 50))
            .unwrap();
        assert_eq!(hit, None);
    }

    #[test]
    fn test_filter_excludes_object() {
        let (mut backend, mut picker, mut camera) = setup();
        let lists = scene(&camera);
        let not_17 = |item: &SoftItem| item.id.get() != 17;

        let request = PickRequest::new(10, 10).with_filter(&not_17);
        let hit = picker.pick(&mut backend, &mut camera, &lists, &request).unwrap();
        assert_eq!(hit, None);
        assert!(!backend.submitted.contains(&17));

        let request = PickRequest::new(50, 50).with_filter(&not_17);
        let hit = picker.pick(&mut backend, &mut camera, &lists, &request).unwrap();
        assert_eq!(hit.map(ObjectId::get), Some(4096));
    }

    #[test]
    fn test_state_restored_after_success() {
        let (mut backend, mut picker, mut camera) = setup();
        let lists = scene(&camera);
        let other = backend.create_pick_target("host target").unwrap();
        backend.set_render_target(Some(other));
        backend.set_clear_color(ClearColor::new(0.2, 0.3, 0.4, 1.0));
        camera.set_view_offset(SIZE, SIZE, 5, 5, 20, 20);
        let camera_before = camera.clone();

        picker
            .pick(&mut backend, &mut camera, &lists, &PickRequest::new(10, 10))
            .unwrap();

        assert_eq!(backend.render_target(), Some(other));
        assert_eq!(backend.clear_color(), ClearColor::new(0.2, 0.3, 0.4, 1.0));
        assert_eq!(camera, camera_before);
        assert_eq!(
            camera.projection_matrix().to_cols_array(),
            camera_before.projection_matrix().to_cols_array()
        );
    }

    #[test]
    fn test_state_restored_after_readback_failure() {
        let (mut backend, mut picker, mut camera) = setup();
        let lists = scene(&camera);
        backend.fail_readback = true;
        let camera_before = camera.clone();

        let err = picker
            .pick(&mut backend, &mut camera, &lists, &PickRequest::new(10, 10))
            .unwrap_err();

        assert!(err.is_rendering_unavailable());
        assert_eq!(backend.render_target(), None);
        assert_eq!(backend.clear_color(), ClearColor::WHITE);
        assert_eq!(camera, camera_before);
        assert_eq!(camera.view_offset(), None);
    }

    #[test]
    fn test_missing_context_fails_construction() {
        let mut backend = SoftwareBackend::new(SIZE, SIZE);
        backend.fail_target = true;
        let result = Picker::new(&mut backend, PickerOptions::default());
        assert!(matches!(result, Err(PickError::RenderingUnavailable(_))));
    }

    #[test]
    fn test_nearest_opaque_wins() {
        let (mut backend, mut picker, mut camera) = setup();
        let mut lists = DrawLists::new();
        let target = world_at_pixel(&camera, 40, 40, 0.0);
        // Far object listed last must not overwrite the near one.
        lists.opaque.push(SoftItem::quad(1, target + Vec3::Z * 2.0, 1.0));
        lists.opaque.push(SoftItem::quad(2, target, 1.0));

        let hit = picker
            .pick(&mut backend, &mut camera, &lists, &PickRequest::new(40, 40))
            .unwrap();
        assert_eq!(hit.map(ObjectId::get), Some(1));
    }

    #[test]
    fn test_opaque_then_transparent_order() {
        let (mut backend, mut picker, mut camera) = setup();
        let mut lists = scene(&camera);
        lists.transparent.push(SoftItem::quad(99, Vec3::ZERO, 0.1));
        lists.opaque.push(SoftItem::quad(5, Vec3::new(3.0, 0.0, 0.0), 0.1));

        picker
            .pick(&mut backend, &mut camera, &lists, &PickRequest::new(50, 50))
            .unwrap();
        assert_eq!(backend.submitted, vec![17, 4096, 5, 99]);
    }

    #[test]
    fn test_transparent_can_be_excluded() {
        let mut backend = SoftwareBackend::new(SIZE, SIZE);
        let options = PickerOptions {
            pick_transparent: false,
            ..PickerOptions::default()
        };
        let mut picker = Picker::new(&mut backend, options).unwrap();
        assert!(!picker.options().pick_transparent);
        let mut camera = camera();
        let mut lists = DrawLists::new();
        lists
            .transparent
            .push(SoftItem::quad(7, world_at_pixel(&camera, 30, 30, 0.0), 0.5));

        let hit = picker
            .pick(&mut backend, &mut camera, &lists, &PickRequest::new(30, 30))
            .unwrap();
        assert_eq!(hit, None);
        assert!(backend.submitted.is_empty());
    }

    #[test]
    fn test_pick_target_is_private_to_picker() {
        let (mut backend, mut picker, mut camera) = setup();
        assert!(picker.options().pick_transparent);
        let lists = scene(&camera);
        let host = backend.create_pick_target("host target").unwrap();
        assert_ne!(host, picker.target());
        backend.set_render_target(Some(host));

        picker
            .pick(&mut backend, &mut camera, &lists, &PickRequest::new(50, 50))
            .unwrap();
        assert_eq!(backend.render_target(), Some(host));
        assert_ne!(backend.render_target(), Some(picker.target()));
    }

    #[test]
    fn test_culling_follows_material_side() {
        let (mut backend, mut picker, mut camera) = setup();
        let facing_away = |side| {
            let mut item = SoftItem::quad(8, Vec3::ZERO, 1.0).with_side(side);
            item.transform = Mat4::from_rotation_y(std::f32::consts::PI);
            item
        };

        for (side, expected) in [(Side::Front, None), (Side::Back, Some(8)), (Side::Double, Some(8))] {
            let mut lists = DrawLists::new();
            lists.opaque.push(facing_away(side));
            let hit = picker
                .pick(&mut backend, &mut camera, &lists, &PickRequest::new(50, 50))
                .unwrap();
            assert_eq!(hit.map(ObjectId::get), expected, "side {side:?}");
        }
    }

    #[test]
    fn test_cache_bounded_across_picks() {
        let (mut backend, mut picker, mut camera) = setup();
        let mut lists = DrawLists::new();
        let mut next_id = 1;
        for side in [Side::Front, Side::Back, Side::Double] {
            for flags in 0u8..8 {
                for _ in 0..5 {
                    let mut item = SoftItem::quad(next_id, Vec3::new(0.0, 0.0, -50.0), 0.1);
                    item.material = Some(MaterialTraits {
                        side,
                        morph_targets: true,
                    });
                    item.morph_targets = usize::from(flags & 1);
                    item.skinned = flags & 2 != 0;
                    item.instanced = flags & 4 != 0;
                    lists.opaque.push(item);
                    next_id += 1;
                }
            }
        }

        for _ in 0..4 {
            picker
                .pick(&mut backend, &mut camera, &lists, &PickRequest::new(3, 97))
                .unwrap();
        }
        assert_eq!(picker.cached_programs(), 24);
        assert_eq!(backend.programs_built, 24);
        assert!(picker.cached_programs() <= FeatureSignature::CARDINALITY);
    }

    #[test]
    fn test_item_program_bypasses_cache() {
        let (mut backend, mut picker, mut camera) = setup();
        let mut lists = scene(&camera);
        for item in &mut lists.opaque {
            item.program = Some(SoftProgram {
                signature: FeatureSignature::new(false, false, false, Side::Double),
                depth_test: true,
            });
        }

        let hit = picker
            .pick(&mut backend, &mut camera, &lists, &PickRequest::new(10, 10))
            .unwrap();
        assert_eq!(hit.map(ObjectId::get), Some(17));
        assert_eq!(backend.programs_built, 0);
        assert_eq!(picker.cached_programs(), 0);
    }

    #[test]
    fn test_malformed_item_is_drawn_with_default_program() {
        let (mut backend, mut picker, mut camera) = setup();
        let mut lists = scene(&camera);
        for item in &mut lists.opaque {
            item.material = None;
        }
        let hit = picker
            .pick(&mut backend, &mut camera, &lists, &PickRequest::new(50, 50))
            .unwrap();
        assert_eq!(hit.map(ObjectId::get), Some(4096));
        assert_eq!(picker.cached_programs(), 1);
    }

    #[test]
    fn test_out_of_bounds_request_leaves_state_alone() {
        let (mut backend, mut picker, mut camera) = setup();
        let lists = scene(&camera);
        for request in [
            PickRequest::new(SIZE, 0),
            PickRequest::new(0, SIZE),
            PickRequest::from_physical(-0.5, 3.0),
            PickRequest::from_physical(f32::NAN, 3.0),
        ] {
            let hit = picker.pick(&mut backend, &mut camera, &lists, &request).unwrap();
            assert_eq!(hit, None);
        }
        assert!(backend.submitted.is_empty());
    }

    #[test]
    fn test_fractional_coordinates_truncate() {
        let request = PickRequest::<SoftItem>::from_physical(10.99, 10.01);
        assert_eq!(request.pixel(), Some((10, 10)));
        let request = PickRequest::<SoftItem>::from_logical(5.7, 5.2, 2.0);
        assert_eq!(request.pixel(), Some((11, 10)));
    }
}
