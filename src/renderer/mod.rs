//! The render pass orchestrator.
//!
//! A frame is recorded in two phases. The prepare phase walks the
//! [`DrawList`], resolves the frame-global material override, bakes any
//! missing pipelines, and builds every per-draw resource (uniform buffer,
//! bind groups, lazily created geometry and instance buffers). The record
//! phase then opens a single render pass over the finished preparations, so
//! no GPU object is created while the pass is live.

use std::cell::Ref;

use cgmath::Matrix4;
use log::warn;
use wgpu::util::DeviceExt;

use crate::camera::{Camera, Projection};
use crate::framebuffer::RenderTarget;
use crate::geometry::GpuGeometry;
use crate::light::{AmbientLight, DirectionalLight};
use crate::material::{KindId, Material, MaterialKind, MaterialRef};
use crate::renderer::bank::{texture_count, ShaderBank};
use crate::renderer::frame::{DrawItem, DrawList, Drawable};
use crate::renderer::uniforms::{
    BasicUniforms, DepthUniforms, GrassUniforms, PhongUniforms, ScreenUniforms,
};
use crate::scene::Node;
use crate::texture::Texture;

pub mod bank;
pub mod frame;
pub mod uniforms;

/// How one draw resolves against the frame-global override: which kind
/// shades it, whether the uniforms come from the override, and whether the
/// draw consumes its instance buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ResolvedDraw {
    kind: KindId,
    use_override: bool,
    instanced_draw: bool,
}

/// Decide which material shades a draw while an override is set. The
/// override supplies shader and uniforms; the drawable's own material keeps
/// supplying pipeline state and its bucket. An instanced override cannot
/// shade a plain mesh (its shader reads a per-instance buffer the mesh does
/// not have), so such draws fall back to their own material; a plain
/// override on an instanced drawable collapses it to a single draw without
/// the instance buffer.
fn resolve_draw(
    own: KindId,
    override_kind: Option<KindId>,
    drawable_instanced: bool,
) -> ResolvedDraw {
    let (kind, use_override) = match override_kind {
        Some(over) if over.is_instanced() && !drawable_instanced => {
            warn!("instanced override material cannot shade a plain mesh, using its own");
            (own, false)
        }
        Some(over) => (over, true),
        None => (own, false),
    };
    ResolvedDraw {
        kind,
        use_override,
        instanced_draw: kind.is_instanced() && drawable_instanced,
    }
}

/// Everything one draw needs, assembled before the pass begins.
struct PreparedDraw<'a> {
    kind: KindId,
    state_key: crate::material::state::StateKey,
    stencil_reference: u32,
    uniform_group: wgpu::BindGroup,
    texture_group: wgpu::BindGroup,
    geometry: Ref<'a, GpuGeometry>,
    index_count: u32,
    instance_buffer: Option<Ref<'a, wgpu::Buffer>>,
    instance_count: u32,
}

pub struct Renderer {
    bank: ShaderBank,
    override_material: Option<MaterialRef>,
    clear_color: wgpu::Color,
    started: instant::Instant,
}

impl Renderer {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        Self {
            bank: ShaderBank::new(device, color_format),
            override_material: None,
            clear_color: wgpu::Color {
                r: 0.1,
                g: 0.2,
                b: 0.3,
                a: 1.0,
            },
            started: instant::Instant::now(),
        }
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    /// Set or clear the frame-global override material. While set, every
    /// drawable is shaded with the override's kind and uniforms; each
    /// drawable still keeps its own render states and bucket.
    pub fn set_override(&mut self, material: Option<MaterialRef>) {
        self.override_material = material;
    }

    /// Record and submit one frame of `scene` into `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Node,
        camera: &Camera,
        projection: &Projection,
        light: &DirectionalLight,
        ambient: &AmbientLight,
        target: RenderTarget,
        viewport: [u32; 2],
    ) {
        let view = camera.view_matrix();
        let proj = projection.matrix();
        let list = DrawList::build(scene, view);

        let prepared: Vec<PreparedDraw> = list
            .iter()
            .filter_map(|item| {
                self.prepare(device, queue, item, view, proj, camera, projection, light, ambient, viewport)
            })
            .collect();

        let (color_view, depth_view) = target.views();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in &prepared {
                let pipeline = self.bank.get(draw.kind, draw.state_key);
                pass.set_pipeline(pipeline);
                pass.set_stencil_reference(draw.stencil_reference);
                pass.set_bind_group(0, &draw.uniform_group, &[]);
                pass.set_bind_group(1, &draw.texture_group, &[]);
                pass.set_vertex_buffer(0, draw.geometry.vertex_buffer.slice(..));
                if let Some(instances) = &draw.instance_buffer {
                    pass.set_vertex_buffer(1, instances.slice(..));
                }
                pass.set_index_buffer(
                    draw.geometry.index_buffer.slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                pass.draw_indexed(0..draw.index_count, 0, 0..draw.instance_count);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Build every GPU resource one draw item needs. Returns `None` when
    /// the item cannot be drawn this frame.
    #[allow(clippy::too_many_arguments)]
    fn prepare<'a>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        item: &'a DrawItem<'a>,
        view: Matrix4<f32>,
        proj: Matrix4<f32>,
        camera: &Camera,
        projection: &Projection,
        light: &DirectionalLight,
        ambient: &AmbientLight,
        viewport: [u32; 2],
    ) -> Option<PreparedDraw<'a>> {
        let own = item.drawable.material().borrow();

        let override_guard = self.override_material.as_ref().map(|m| m.borrow());
        let resolved = resolve_draw(
            own.kind.id(),
            override_guard.as_deref().map(|m| m.kind.id()),
            matches!(item.drawable, Drawable::Instanced(_)),
        );
        let effective: &Material = match (&override_guard, resolved.use_override) {
            (Some(over), true) => over,
            _ => &own,
        };
        let kind = resolved.kind;
        let instanced_draw = resolved.instanced_draw;

        let world = item.world;
        let uniform_bytes: Vec<u8> = match &effective.kind {
            MaterialKind::Phong { shininess, .. }
            | MaterialKind::OpacityMask { shininess, .. }
            | MaterialKind::PhongInstanced { shininess, .. } => {
                bytemuck::bytes_of(&PhongUniforms::new(
                    world,
                    view,
                    proj,
                    light,
                    ambient,
                    camera.position,
                    *shininess,
                    own.opacity,
                ))
                .to_vec()
            }
            MaterialKind::White => {
                bytemuck::bytes_of(&BasicUniforms::new(world, view, proj)).to_vec()
            }
            MaterialKind::Depth => bytemuck::bytes_of(&DepthUniforms::new(
                world,
                view,
                proj,
                projection.znear,
                projection.zfar,
            ))
            .to_vec(),
            MaterialKind::Screen { screen } => bytemuck::bytes_of(&ScreenUniforms {
                texture_size: [screen.width as f32, screen.height as f32],
                surface_size: [viewport[0] as f32, viewport[1] as f32],
            })
            .to_vec(),
            MaterialKind::CubeEnv { .. } => {
                // The sky follows the camera: keep the node's rotation and
                // scale, replace its world translation for this draw only.
                let mut sky_world = world;
                sky_world.w.x = camera.position.x;
                sky_world.w.y = camera.position.y;
                sky_world.w.z = camera.position.z;
                bytemuck::bytes_of(&BasicUniforms::new(sky_world, view, proj)).to_vec()
            }
            MaterialKind::GrassInstanced(params) => {
                let lit = PhongUniforms::new(
                    world,
                    view,
                    proj,
                    light,
                    ambient,
                    camera.position,
                    params.shininess,
                    own.opacity,
                );
                bytemuck::bytes_of(&GrassUniforms {
                    lit,
                    wind_direction: params.wind_direction.into(),
                    wind_scale: params.wind_scale,
                    cloud_white_color: params.cloud_white.into(),
                    cloud_speed: params.cloud_speed,
                    cloud_black_color: params.cloud_black.into(),
                    cloud_lerp: params.cloud_lerp,
                    uv_scale: params.uv_scale,
                    brightness: params.brightness,
                    time: self.started.elapsed().as_secs_f32(),
                    phase_scale: params.phase_scale,
                    cloud_uv_scale: params.cloud_uv_scale,
                    _pad: [0.0; 3],
                })
                .to_vec()
            }
        };

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw Uniforms"),
            contents: &uniform_bytes,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let uniform_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &self.bank.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let textures: Vec<&Texture> = match &effective.kind {
            MaterialKind::White | MaterialKind::Depth => vec![],
            MaterialKind::Phong { diffuse, .. } | MaterialKind::PhongInstanced { diffuse, .. } => {
                vec![diffuse]
            }
            MaterialKind::Screen { screen } => vec![screen],
            MaterialKind::CubeEnv { sky } => vec![sky],
            MaterialKind::OpacityMask { diffuse, mask, .. } => vec![diffuse, mask],
            MaterialKind::GrassInstanced(params) => {
                vec![&params.diffuse, &params.opacity_mask, &params.cloud_mask]
            }
        };
        debug_assert_eq!(textures.len(), texture_count(kind));
        let mut entries = Vec::with_capacity(textures.len() * 2);
        for (i, texture) in textures.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: (i * 2) as u32,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: (i * 2 + 1) as u32,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            });
        }
        let texture_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("texture_bind_group"),
            layout: self.bank.texture_layout_for(kind),
            entries: &entries,
        });

        let state_key = own.states.key();
        let stencil_reference = own.states.stencil.reference as u32;
        self.bank.pipeline_for(device, kind, &own.states);

        let (geometry, instance_buffer, instance_count) = match &item.drawable {
            Drawable::Single(mesh) => (mesh.geometry.gpu(device), None, 1),
            Drawable::Instanced(mesh) => {
                if instanced_draw {
                    if matches!(kind, KindId::GrassInstanced) {
                        mesh.sort_by_view_depth(view);
                    }
                    let count = mesh.instance_count() as u32;
                    (
                        mesh.geometry.gpu(device),
                        Some(mesh.instance_buffer(device, queue)),
                        count,
                    )
                } else {
                    (mesh.geometry.gpu(device), None, 1)
                }
            }
        };
        let index_count = item.drawable.geometry().index_count();

        Some(PreparedDraw {
            kind,
            state_key,
            stencil_reference,
            uniform_group,
            texture_group,
            geometry,
            index_count,
            instance_buffer,
            instance_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_supplies_the_shader_kind() {
        let resolved = resolve_draw(KindId::Phong, Some(KindId::Depth), false);
        assert!(resolved.use_override);
        assert_eq!(resolved.kind, KindId::Depth);
        assert!(!resolved.instanced_draw);

        let untouched = resolve_draw(KindId::Phong, None, false);
        assert!(!untouched.use_override);
        assert_eq!(untouched.kind, KindId::Phong);
    }

    #[test]
    fn instanced_override_falls_back_on_plain_meshes() {
        let resolved = resolve_draw(KindId::Phong, Some(KindId::PhongInstanced), false);
        assert!(!resolved.use_override);
        assert_eq!(resolved.kind, KindId::Phong);
        assert!(!resolved.instanced_draw);
    }

    #[test]
    fn plain_override_collapses_instanced_drawables_to_one_draw() {
        let resolved = resolve_draw(KindId::GrassInstanced, Some(KindId::Depth), true);
        assert!(resolved.use_override);
        assert_eq!(resolved.kind, KindId::Depth);
        assert!(!resolved.instanced_draw);
    }

    #[test]
    fn instanced_override_keeps_instancing_on_instanced_drawables() {
        let resolved = resolve_draw(
            KindId::GrassInstanced,
            Some(KindId::PhongInstanced),
            true,
        );
        assert!(resolved.use_override);
        assert_eq!(resolved.kind, KindId::PhongInstanced);
        assert!(resolved.instanced_draw);
    }

    #[test]
    fn drawables_without_an_override_keep_their_instancing() {
        let resolved = resolve_draw(KindId::GrassInstanced, None, true);
        assert_eq!(resolved.kind, KindId::GrassInstanced);
        assert!(resolved.instanced_draw);
    }
}
