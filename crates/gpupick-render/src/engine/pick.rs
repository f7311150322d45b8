use std::sync::Arc;

use gpupick_core::{
    Camera, ClearColor, DirectDraw, FeatureSignature, PickBackend, PickerOptions, Result,
};

use super::{deformation_bind_group, RenderEngine, RenderTarget, TargetId};
use crate::geometry::GpuGeometry;
use crate::item::RenderItem;
use crate::override_program::{OverrideProgram, PickCameraUniforms, PickObjectUniforms};

type PickDraw<'a> = DirectDraw<'a, RenderItem, Arc<OverrideProgram>>;

/// A draw that passed validation, with everything the pass binds for it.
struct PreparedDraw<'a> {
    draw: &'a PickDraw<'a>,
    geometry: &'a GpuGeometry,
    deformation: Option<wgpu::BindGroup>,
    instance_count: u32,
}

impl RenderEngine {
    /// Checks that an item carries the buffers its program reads.
    fn prepare_draw<'a>(&self, draw: &'a PickDraw<'a>) -> Option<PreparedDraw<'a>> {
        let item = draw.item;
        let signature = draw.program.signature();

        let Some(geometry) = item.geometry.as_deref() else {
            log::trace!("object {} has no geometry, skipping", item.object_id);
            return None;
        };
        if geometry.vertex_count == 0 {
            log::trace!("object {} has no vertices, skipping", item.object_id);
            return None;
        }

        let bones = if signature.uses_skinning() {
            match (&item.skeleton, &geometry.skin) {
                (Some(skeleton), Some(_)) => Some(&skeleton.bones),
                _ => {
                    log::warn!(
                        "object {} is drawn with skinning but lacks a skeleton or skin attributes",
                        item.object_id
                    );
                    return None;
                }
            }
        } else {
            None
        };

        let morph_deltas = if signature.uses_morph_targets() {
            let Some(morph) = &geometry.morph else {
                log::warn!(
                    "object {} is drawn with morph targets but has none",
                    item.object_id
                );
                return None;
            };
            Some(&morph.deltas)
        } else {
            None
        };

        let instance_count = if signature.uses_instancing() {
            let Some(instances) = &item.instances else {
                log::warn!(
                    "object {} is drawn instanced but has no instances",
                    item.object_id
                );
                return None;
            };
            if instances.count == 0 {
                log::trace!("object {} has zero instances, skipping", item.object_id);
                return None;
            }
            instances.count
        } else {
            1
        };

        let deformation = (bones.is_some() || morph_deltas.is_some()).then(|| {
            deformation_bind_group(
                &self.device,
                &self.layouts,
                bones.unwrap_or(&self.empty_storage),
                morph_deltas.unwrap_or(&self.empty_storage),
            )
        });

        Some(PreparedDraw {
            draw,
            geometry,
            deformation,
            instance_count,
        })
    }

    fn bound_target(&self) -> Result<&RenderTarget> {
        Ok(self.target(self.current_target)?)
    }
}

impl PickBackend for RenderEngine {
    type Item = RenderItem;
    type Program = Arc<OverrideProgram>;
    type Target = TargetId;

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.framebuffer.size
    }

    fn render_target(&self) -> Option<TargetId> {
        self.current_target
    }

    fn set_render_target(&mut self, target: Option<TargetId>) {
        self.current_target = target;
    }

    fn clear_color(&self) -> ClearColor {
        self.clear_color
    }

    fn set_clear_color(&mut self, color: ClearColor) {
        self.clear_color = color;
    }

    fn create_pick_target(&mut self, label: &str) -> Result<TargetId> {
        self.targets
            .push(RenderTarget::new(&self.device, 1, 1, label));
        let id = TargetId(self.targets.len() - 1);
        log::debug!("created pick target {label} ({id:?})");
        Ok(id)
    }

    fn clear(&mut self) -> Result<()> {
        let color = self.wgpu_clear_color();
        let target = self.bound_target()?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pick Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn build_override_program(
        &mut self,
        signature: FeatureSignature,
        options: &PickerOptions,
    ) -> Arc<OverrideProgram> {
        Arc::new(OverrideProgram::new(
            &self.device,
            &self.layouts,
            self.variants.get(signature),
            signature,
            options,
        ))
    }

    fn render_direct(&mut self, camera: &Camera, draws: &[PickDraw<'_>]) -> Result<()> {
        self.ensure_object_capacity(draws.len() as u64);

        let prepared: Vec<PreparedDraw<'_>> =
            draws.iter().filter_map(|draw| self.prepare_draw(draw)).collect();
        if prepared.is_empty() {
            return Ok(());
        }

        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[PickCameraUniforms::new(camera.view_projection_matrix())]),
        );

        let stride = usize::try_from(self.object_stride).unwrap_or(usize::MAX);
        let mut object_bytes = vec![0u8; stride * prepared.len()];
        for (index, prepared) in prepared.iter().enumerate() {
            let item = prepared.draw.item;
            let uniforms = PickObjectUniforms::new(
                item.world_transform,
                prepared.draw.id_color,
                &item.morph_influences,
                prepared.geometry.morph_target_count(),
                prepared.geometry.vertex_count,
            );
            let offset = index * stride;
            let bytes = bytemuck::bytes_of(&uniforms);
            object_bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        self.queue.write_buffer(&self.object_buffer, 0, &object_bytes);

        let target = self.bound_target()?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Render Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pick Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.camera_bind_group, &[]);

            for (index, prepared) in prepared.iter().enumerate() {
                let signature = prepared.draw.program.signature();
                let geometry = prepared.geometry;
                let offset = u32::try_from(index as u64 * self.object_stride).unwrap_or(u32::MAX);

                log::trace!(
                    "pick draw object {} with signature {:#08b}",
                    prepared.draw.item.object_id,
                    signature.bits()
                );

                pass.set_pipeline(prepared.draw.program.pipeline());
                pass.set_bind_group(1, &self.object_bind_group, &[offset]);
                pass.set_bind_group(
                    2,
                    prepared
                        .deformation
                        .as_ref()
                        .unwrap_or(&self.empty_deformation),
                    &[],
                );

                let mut slot = 0;
                pass.set_vertex_buffer(slot, geometry.positions.slice(..));
                if let Some(skin) = geometry.skin.as_ref().filter(|_| signature.uses_skinning()) {
                    pass.set_vertex_buffer(slot + 1, skin.joints.slice(..));
                    pass.set_vertex_buffer(slot + 2, skin.weights.slice(..));
                    slot += 2;
                }
                if let Some(instances) = prepared
                    .draw
                    .item
                    .instances
                    .as_ref()
                    .filter(|_| signature.uses_instancing())
                {
                    pass.set_vertex_buffer(slot + 1, instances.transforms.slice(..));
                }

                let instances = 0..prepared.instance_count;
                match &geometry.indices {
                    Some((indices, count)) => {
                        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..*count, 0, instances);
                    }
                    None => pass.draw(0..geometry.vertex_count, instances),
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_pixel(&mut self, target: TargetId) -> Result<[u8; 4]> {
        Ok(self.read_target_pixel(Some(target), 0, 0)?)
    }
}
