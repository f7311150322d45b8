//! The renderer interface the picker drives.

use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::draw_item::DrawItem;
use crate::error::Result;
use crate::options::PickerOptions;
use crate::signature::FeatureSignature;

/// An RGBA clear color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ClearColor {
    /// Transparent black. Decodes to the no-hit sentinel.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

/// One direct submission: an item drawn with an override program and id color.
#[derive(Debug)]
pub struct DirectDraw<'a, T, P> {
    /// The host's draw item, supplying geometry and transform.
    pub item: &'a T,
    /// Override program from the adapter.
    pub program: P,
    /// Normalized identifier color written by the fragment stage.
    pub id_color: [f32; 4],
}

/// A renderer that can host a pick pass.
///
/// The render target binding and clear color are shared with the host's own
/// rendering; the picker saves and restores them around every pick.
pub trait PickBackend {
    /// The host's draw item type.
    type Item: DrawItem<Program = Self::Program>;
    /// A compiled override shader program. Cheap to clone.
    type Program: Clone;
    /// Handle of a render target.
    type Target: Copy + PartialEq + std::fmt::Debug;

    /// Full drawing-buffer size in backend pixels.
    fn drawing_buffer_size(&self) -> (u32, u32);

    /// Currently bound render target (`None` is the default framebuffer).
    fn render_target(&self) -> Option<Self::Target>;

    /// Binds a render target (`None` is the default framebuffer).
    fn set_render_target(&mut self, target: Option<Self::Target>);

    /// Current clear color.
    fn clear_color(&self) -> ClearColor;

    /// Sets the clear color used by [`Self::clear`].
    fn set_clear_color(&mut self, color: ClearColor);

    /// Allocates a 1x1 color target for picking.
    fn create_pick_target(&mut self, label: &str) -> Result<Self::Target>;

    /// Clears the bound target's color to the clear color and its depth to the far plane.
    fn clear(&mut self) -> Result<()>;

    /// Builds an override program for a feature signature.
    ///
    /// The program keeps the vertex stage features of the signature and writes
    /// a uniform color from the fragment stage.
    fn build_override_program(
        &mut self,
        signature: FeatureSignature,
        options: &PickerOptions,
    ) -> Self::Program;

    /// Draws each item into the bound target with its override program,
    /// bypassing the normal material and lighting setup.
    fn render_direct(
        &mut self,
        camera: &Camera,
        draws: &[DirectDraw<'_, Self::Item, Self::Program>],
    ) -> Result<()>;

    /// Reads pixel (0, 0) of a target as RGBA8.
    fn read_pixel(&mut self, target: Self::Target) -> Result<[u8; 4]>;
}
