//! The wgpu rendering engine hosting the pick pass.

mod pick;

use std::sync::Arc;

use glam::Mat4;
use gpupick_core::ClearColor;
use wgpu::util::DeviceExt;

use crate::error::{RenderError, RenderResult};
use crate::geometry::{GeometryData, GpuGeometry, InstanceSet, Skeleton};
use crate::override_program::{
    PickCameraUniforms, PickLayouts, PickObjectUniforms, VariantSources, PICK_COLOR_FORMAT,
    PICK_DEPTH_FORMAT,
};

/// Handle of an offscreen render target owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A color and depth attachment pair.
#[derive(Debug)]
pub struct RenderTarget {
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub size: (u32, u32),
}

impl RenderTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label} color")),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label} depth")),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            color,
            color_view,
            depth_view,
            size: (width, height),
        }
    }
}

/// The main rendering engine.
pub struct RenderEngine {
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
    /// Stand-in for the window's framebuffer, bound when no target is.
    framebuffer: RenderTarget,
    targets: Vec<RenderTarget>,
    current_target: Option<TargetId>,
    clear_color: ClearColor,
    layouts: PickLayouts,
    variants: VariantSources,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_stride: u64,
    object_capacity: u64,
    /// Bound in place of a bone palette or morph deltas an item lacks.
    empty_storage: wgpu::Buffer,
    /// Group 2 for items with neither skinning nor morph targets.
    empty_deformation: wgpu::BindGroup,
}

impl RenderEngine {
    /// Creates a headless engine with a `width` x `height` framebuffer.
    pub async fn new_headless(width: u32, height: u32) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("gpupick device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        log::info!(
            "gpupick headless engine on {} ({width}x{height})",
            adapter.get_info().name
        );

        Self::from_device(device, queue, width, height)
    }

    /// Creates an engine on an existing device.
    pub fn from_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        width: u32,
        height: u32,
    ) -> RenderResult<Self> {
        let variants = VariantSources::new()?;
        let layouts = PickLayouts::new(&device);
        let framebuffer = RenderTarget::new(&device, width.max(1), height.max(1), "framebuffer");

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pick camera uniforms"),
            contents: bytemuck::cast_slice(&[PickCameraUniforms::new(Mat4::IDENTITY)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Pick Camera Bind Group"),
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let object_stride = aligned_stride(std::mem::size_of::<PickObjectUniforms>() as u64, alignment);
        let object_capacity = 16;
        let (object_buffer, object_bind_group) =
            Self::create_object_buffer(&device, &layouts, object_stride, object_capacity);

        let empty_storage = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pick empty storage"),
            size: 64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let empty_deformation =
            deformation_bind_group(&device, &layouts, &empty_storage, &empty_storage);

        Ok(Self {
            device,
            queue,
            framebuffer,
            targets: Vec::new(),
            current_target: None,
            clear_color: ClearColor::WHITE,
            layouts,
            variants,
            camera_buffer,
            camera_bind_group,
            object_buffer,
            object_bind_group,
            object_stride,
            object_capacity,
            empty_storage,
            empty_deformation,
        })
    }

    fn create_object_buffer(
        device: &wgpu::Device,
        layouts: &PickLayouts,
        stride: u64,
        capacity: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pick object uniforms"),
            size: stride * capacity,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Pick Object Bind Group"),
            layout: &layouts.object,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<PickObjectUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Grows the per-draw uniform buffer to hold `count` draws.
    fn ensure_object_capacity(&mut self, count: u64) {
        if count <= self.object_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        log::debug!("growing pick object uniforms to {capacity} draws");
        let (buffer, bind_group) =
            Self::create_object_buffer(&self.device, &self.layouts, self.object_stride, capacity);
        self.object_buffer = buffer;
        self.object_bind_group = bind_group;
        self.object_capacity = capacity;
    }

    /// Resizes the framebuffer.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.framebuffer.size == (width, height) || width == 0 || height == 0 {
            return;
        }
        self.framebuffer = RenderTarget::new(&self.device, width, height, "framebuffer");
    }

    /// Uploads mesh data for use by draw items.
    pub fn upload_geometry(&self, data: &GeometryData, label: &str) -> Arc<GpuGeometry> {
        Arc::new(GpuGeometry::upload(&self.device, data, label))
    }

    /// Uploads a bone palette.
    pub fn create_skeleton(&self, bones: &[Mat4], label: &str) -> Arc<Skeleton> {
        Arc::new(Skeleton::new(&self.device, bones, label))
    }

    /// Uploads per-instance transforms.
    pub fn create_instances(&self, transforms: &[Mat4], label: &str) -> Arc<InstanceSet> {
        Arc::new(InstanceSet::new(&self.device, transforms, label))
    }

    /// Number of offscreen targets created so far.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    fn target(&self, id: Option<TargetId>) -> RenderResult<&RenderTarget> {
        match id {
            None => Ok(&self.framebuffer),
            Some(id) => self
                .targets
                .get(id.0)
                .ok_or(RenderError::UnknownTarget(id.0)),
        }
    }

    fn wgpu_clear_color(&self) -> wgpu::Color {
        let ClearColor { r, g, b, a } = self.clear_color;
        wgpu::Color { r, g, b, a }
    }

    /// Copies one pixel of a target to a staging buffer and maps it.
    ///
    /// Each read owns its staging buffer; nothing stays mapped or pending
    /// after a failed read.
    fn read_target_pixel(&self, id: Option<TargetId>, x: u32, y: u32) -> RenderResult<[u8; 4]> {
        let target = self.target(id)?;

        // Rows must be aligned to COPY_BYTES_PER_ROW_ALIGNMENT.
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pick Staging Buffer"),
            size: u64::from(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Readback Encoder"),
            });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.color,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..4);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.device.poll(wgpu::PollType::wait_indefinitely())?;
        rx.recv().map_err(|_| RenderError::Timeout)??;

        let data = buffer_slice.get_mapped_range();
        let pixel = [data[0], data[1], data[2], data[3]];
        drop(data);
        staging_buffer.unmap();

        Ok(pixel)
    }

    /// Reads a pixel of the framebuffer, e.g. to check a pick left it untouched.
    pub fn read_framebuffer_pixel(&self, x: u32, y: u32) -> RenderResult<[u8; 4]> {
        let (width, height) = self.framebuffer.size;
        if x >= width || y >= height {
            return Err(RenderError::PixelOutOfBounds { x, y });
        }
        self.read_target_pixel(None, x, y)
    }
}

fn deformation_bind_group(
    device: &wgpu::Device,
    layouts: &PickLayouts,
    bones: &wgpu::Buffer,
    morph_deltas: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Pick Deformation Bind Group"),
        layout: &layouts.deformation,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: bones.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: morph_deltas.as_entire_binding(),
            },
        ],
    })
}

fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}
