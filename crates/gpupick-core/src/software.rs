//! CPU reference backend for picker tests.
//!
//! Rasterizes only the center of the bound 1x1 target, which is all a pick pass covers.

use glam::{Mat4, Vec2, Vec3};

use crate::backend::{ClearColor, DirectDraw, PickBackend};
use crate::camera::Camera;
use crate::draw_item::{DrawItem, GeometryTraits, MaterialTraits};
use crate::error::{PickError, Result};
use crate::id::ObjectId;
use crate::options::PickerOptions;
use crate::signature::{FeatureSignature, Side};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Texel {
    color: [u8; 4],
    depth: f32,
}

impl Default for Texel {
    fn default() -> Self {
        Self {
            color: [0; 4],
            depth: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SoftTarget(usize);

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SoftProgram {
    pub signature: FeatureSignature,
    pub depth_test: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct SoftItem {
    pub id: ObjectId,
    pub triangles: Vec<[Vec3; 3]>,
    pub transform: Mat4,
    pub material: Option<MaterialTraits>,
    pub morph_targets: usize,
    pub skinned: bool,
    pub instanced: bool,
    pub program: Option<SoftProgram>,
}

impl SoftItem {
    /// An axis-aligned square in the XY plane, counter-clockwise when seen from +Z.
    pub fn quad(id: u32, center: Vec3, half_size: f32) -> Self {
        let h = half_size;
        let a = center + Vec3::new(-h, -h, 0.0);
        let b = center + Vec3::new(h, -h, 0.0);
        let c = center + Vec3::new(h, h, 0.0);
        let d = center + Vec3::new(-h, h, 0.0);
        Self {
            id: ObjectId::new(id).expect("test ids are non-zero"),
            triangles: vec![[a, b, c], [a, c, d]],
            transform: Mat4::IDENTITY,
            material: Some(MaterialTraits::default()),
            morph_targets: 0,
            skinned: false,
            instanced: false,
            program: None,
        }
    }

    pub fn with_side(mut self, side: Side) -> Self {
        if let Some(material) = self.material.as_mut() {
            material.side = side;
        }
        self
    }
}

impl DrawItem for SoftItem {
    type Program = SoftProgram;

    fn object_id(&self) -> ObjectId {
        self.id
    }

    fn world_transform(&self) -> Mat4 {
        self.transform
    }

    fn geometry(&self) -> Option<GeometryTraits> {
        (!self.triangles.is_empty()).then_some(GeometryTraits {
            morph_targets: self.morph_targets,
        })
    }

    fn material(&self) -> Option<MaterialTraits> {
        self.material
    }

    fn is_skinned(&self) -> bool {
        self.skinned
    }

    fn is_instanced(&self) -> bool {
        self.instanced
    }

    fn pick_program(&self) -> Option<&SoftProgram> {
        self.program.as_ref()
    }
}

#[derive(Debug)]
pub(crate) struct SoftwareBackend {
    pub size: (u32, u32),
    pub bound: Option<SoftTarget>,
    pub clear_color: ClearColor,
    targets: Vec<Texel>,
    framebuffer: Texel,
    pub programs_built: usize,
    pub submitted: Vec<u32>,
    pub fail_target: bool,
    pub fail_readback: bool,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            bound: None,
            clear_color: ClearColor::WHITE,
            targets: Vec::new(),
            framebuffer: Texel::default(),
            programs_built: 0,
            submitted: Vec::new(),
            fail_target: false,
            fail_readback: false,
        }
    }

    fn bound_texel(&mut self) -> &mut Texel {
        match self.bound {
            Some(SoftTarget(index)) => &mut self.targets[index],
            None => &mut self.framebuffer,
        }
    }
}

fn quantize(channel: f32) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let byte = (channel.clamp(0.0, 1.0) * 255.0).round() as u8;
    byte
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

impl PickBackend for SoftwareBackend {
    type Item = SoftItem;
    type Program = SoftProgram;
    type Target = SoftTarget;

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn render_target(&self) -> Option<SoftTarget> {
        self.bound
    }

    fn set_render_target(&mut self, target: Option<SoftTarget>) {
        self.bound = target;
    }

    fn clear_color(&self) -> ClearColor {
        self.clear_color
    }

    fn set_clear_color(&mut self, color: ClearColor) {
        self.clear_color = color;
    }

    fn create_pick_target(&mut self, _label: &str) -> Result<SoftTarget> {
        if self.fail_target {
            return Err(PickError::RenderingUnavailable("no context".into()));
        }
        self.targets.push(Texel::default());
        Ok(SoftTarget(self.targets.len() - 1))
    }

    fn clear(&mut self) -> Result<()> {
        let c = self.clear_color;
        #[allow(clippy::cast_possible_truncation)]
        let color = [c.r, c.g, c.b, c.a].map(|channel| quantize(channel as f32));
        *self.bound_texel() = Texel { color, depth: 1.0 };
        Ok(())
    }

    fn build_override_program(
        &mut self,
        signature: FeatureSignature,
        options: &PickerOptions,
    ) -> SoftProgram {
        self.programs_built += 1;
        SoftProgram {
            signature,
            depth_test: options.depth_test,
        }
    }

    fn render_direct(
        &mut self,
        camera: &Camera,
        draws: &[DirectDraw<'_, SoftItem, SoftProgram>],
    ) -> Result<()> {
        let view_proj = camera.view_projection_matrix();
        for draw in draws {
            self.submitted.push(draw.item.id.get());
            let mvp = view_proj * draw.item.transform;
            for triangle in &draw.item.triangles {
                let clip = triangle.map(|p| mvp * p.extend(1.0));
                if clip.iter().any(|c| c.w <= 0.0) {
                    continue;
                }
                let ndc = clip.map(|c| c.truncate() / c.w);
                let [a, b, c] = ndc.map(|p| p.truncate());
                let area = edge(a, b, c);
                if area == 0.0 {
                    continue;
                }
                let culled = match draw.program.signature.side() {
                    Side::Front => area < 0.0,
                    Side::Back => area > 0.0,
                    Side::Double => false,
                };
                if culled {
                    continue;
                }

                let center = Vec2::ZERO;
                let w0 = edge(b, c, center) / area;
                let w1 = edge(c, a, center) / area;
                let w2 = edge(a, b, center) / area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let depth = w0 * ndc[0].z + w1 * ndc[1].z + w2 * ndc[2].z;
                if !(0.0..=1.0).contains(&depth) {
                    continue;
                }

                let color = draw.id_color.map(quantize);
                let depth_test = draw.program.depth_test;
                let texel = self.bound_texel();
                if !depth_test || depth < texel.depth {
                    *texel = Texel { color, depth };
                }
            }
        }
        Ok(())
    }

    fn read_pixel(&mut self, target: SoftTarget) -> Result<[u8; 4]> {
        if self.fail_readback {
            return Err(PickError::RenderingUnavailable("map failed".into()));
        }
        Ok(self.targets[target.0].color)
    }
}
