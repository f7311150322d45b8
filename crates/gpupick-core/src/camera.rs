//! Camera and view management.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionMode {
    /// Perspective projection.
    #[default]
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// A sub-rectangle of a larger framebuffer that the projection is narrowed to.
///
/// Coordinates are in backend pixels with the origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOffset {
    pub full_width: u32,
    pub full_height: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewOffset {
    /// Matrix applied after the projection that maps the sub-rectangle onto all of clip space.
    ///
    /// Works on clip coordinates, so it is valid for both projection modes:
    /// `x_ndc' = sx * (x_ndc - cx)` becomes `x_clip' = sx * x_clip - sx * cx * w_clip`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn clip_transform(&self) -> Mat4 {
        let full_w = self.full_width.max(1) as f32;
        let full_h = self.full_height.max(1) as f32;
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;

        let center_x = (self.x as f32 + w * 0.5) / full_w * 2.0 - 1.0;
        let center_y = 1.0 - (self.y as f32 + h * 0.5) / full_h * 2.0;
        let scale_x = full_w / w;
        let scale_y = full_h / h;

        Mat4::from_cols(
            Vec4::new(scale_x, 0.0, 0.0, 0.0),
            Vec4::new(0.0, scale_y, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(-scale_x * center_x, -scale_y * center_y, 0.0, 1.0),
        )
    }
}

/// A 3D camera for viewing the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Projection mode.
    pub projection_mode: ProjectionMode,
    /// Orthographic half-height (used when `projection_mode` is Orthographic).
    pub ortho_scale: f32,
    view_offset: Option<ViewOffset>,
}

impl Camera {
    /// Creates a new camera with default settings.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
            projection_mode: ProjectionMode::Perspective,
            ortho_scale: 1.0,
            view_offset: None,
        }
    }

    /// Moves the camera and points it at `target`.
    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    /// Narrows the projection to a sub-rectangle of a `full_width` x `full_height` view.
    ///
    /// Rendering into a `width` x `height` target then shows exactly that
    /// region of the full view, at full-view scale.
    pub fn set_view_offset(
        &mut self,
        full_width: u32,
        full_height: u32,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) {
        self.view_offset = Some(ViewOffset {
            full_width,
            full_height,
            x,
            y,
            width,
            height,
        });
    }

    /// Removes any sub-rectangle override.
    pub fn clear_view_offset(&mut self) {
        self.view_offset = None;
    }

    /// The current sub-rectangle override, if any.
    #[must_use]
    pub fn view_offset(&self) -> Option<ViewOffset> {
        self.view_offset
    }

    /// Restores a previously read override (`None` clears it).
    pub fn set_view_offset_state(&mut self, view_offset: Option<ViewOffset>) {
        self.view_offset = view_offset;
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix, narrowed by the view offset when one is set.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        let base = match self.projection_mode {
            ProjectionMode::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_height = self.ortho_scale;
                let half_width = half_height * self.aspect_ratio;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        };
        match self.view_offset {
            Some(offset) => offset.clip_transform() * base,
            None => base,
        }
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}
