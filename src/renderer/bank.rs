//! Shader modules, bind group layouts, and the pipeline cache.
//!
//! Every material kind owns one WGSL module, compiled once at startup. The
//! render pipelines baked from those modules also depend on the material's
//! render states, so they are created lazily and cached by
//! `(kind, state key)`: two materials of the same kind with the same states
//! share one pipeline.

use std::collections::HashMap;

use log::debug;

use crate::geometry::{Vertex, VertexLayout};
use crate::material::state::{mk_blend, mk_depth_stencil, mk_primitive, RenderStates, StateKey};
use crate::material::KindId;
use crate::scene::transform::InstanceRaw;
use crate::texture::Texture;

const KINDS: [KindId; 8] = [
    KindId::Phong,
    KindId::White,
    KindId::Depth,
    KindId::OpacityMask,
    KindId::Screen,
    KindId::CubeEnv,
    KindId::PhongInstanced,
    KindId::GrassInstanced,
];

fn shader_source(kind: KindId) -> wgpu::ShaderModuleDescriptor<'static> {
    let (label, source) = match kind {
        KindId::Phong => ("Phong Shader", include_str!("../shaders/phong.wgsl")),
        KindId::White => ("White Shader", include_str!("../shaders/white.wgsl")),
        KindId::Depth => ("Depth Shader", include_str!("../shaders/depth.wgsl")),
        KindId::OpacityMask => (
            "Opacity Mask Shader",
            include_str!("../shaders/opacity_mask.wgsl"),
        ),
        KindId::Screen => ("Screen Shader", include_str!("../shaders/screen.wgsl")),
        KindId::CubeEnv => ("Sky Shader", include_str!("../shaders/cube_env.wgsl")),
        KindId::PhongInstanced => (
            "Phong Instance Shader",
            include_str!("../shaders/phong_instance.wgsl"),
        ),
        KindId::GrassInstanced => (
            "Grass Instance Shader",
            include_str!("../shaders/grass_instance.wgsl"),
        ),
    };
    wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }
}

/// How many sampled textures the kind's fragment shader binds in group 1.
pub fn texture_count(kind: KindId) -> usize {
    match kind {
        KindId::White | KindId::Depth => 0,
        KindId::Phong | KindId::Screen | KindId::CubeEnv | KindId::PhongInstanced => 1,
        KindId::OpacityMask => 2,
        KindId::GrassInstanced => 3,
    }
}

pub fn uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("uniform_bind_group_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// A group of `count` texture/sampler pairs at alternating bindings.
pub fn texture_layout(device: &wgpu::Device, count: usize) -> wgpu::BindGroupLayout {
    let mut entries = Vec::with_capacity(count * 2);
    for i in 0..count as u32 {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: i * 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: i * 2 + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("texture_bind_group_layout"),
        entries: &entries,
    })
}

pub struct ShaderBank {
    modules: HashMap<KindId, wgpu::ShaderModule>,
    pipelines: HashMap<(KindId, StateKey), wgpu::RenderPipeline>,
    pub uniform_layout: wgpu::BindGroupLayout,
    texture_layouts: [wgpu::BindGroupLayout; 4],
    color_format: wgpu::TextureFormat,
}

impl ShaderBank {
    /// Compile every kind's shader module up front so a broken shader fails
    /// at startup, not mid-frame.
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let modules = KINDS
            .iter()
            .map(|&kind| (kind, device.create_shader_module(shader_source(kind))))
            .collect();
        let texture_layouts = [
            texture_layout(device, 0),
            texture_layout(device, 1),
            texture_layout(device, 2),
            texture_layout(device, 3),
        ];

        Self {
            modules,
            pipelines: HashMap::new(),
            uniform_layout: uniform_layout(device),
            texture_layouts,
            color_format,
        }
    }

    pub fn texture_layout_for(&self, kind: KindId) -> &wgpu::BindGroupLayout {
        &self.texture_layouts[texture_count(kind)]
    }

    /// Ensure the pipeline for this kind and state combination exists,
    /// building it on first use.
    pub fn pipeline_for(&mut self, device: &wgpu::Device, kind: KindId, states: &RenderStates) {
        let key = (kind, states.key());
        if !self.pipelines.contains_key(&key) {
            debug!("baking pipeline for {:?}", kind);
            let pipeline = self.mk_pipeline(device, kind, states);
            self.pipelines.insert(key, pipeline);
        }
    }

    /// Look up a pipeline baked by [`pipeline_for`](Self::pipeline_for).
    pub(crate) fn get(&self, kind: KindId, key: StateKey) -> &wgpu::RenderPipeline {
        self.pipelines
            .get(&(kind, key))
            .expect("pipeline baked during the prepare phase")
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn mk_pipeline(
        &self,
        device: &wgpu::Device,
        kind: KindId,
        states: &RenderStates,
    ) -> wgpu::RenderPipeline {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&self.uniform_layout, self.texture_layout_for(kind)],
            push_constant_ranges: &[],
        });

        let instanced = matches!(kind, KindId::PhongInstanced | KindId::GrassInstanced);
        let vertex_layouts: &[wgpu::VertexBufferLayout] = if instanced {
            &[Vertex::desc(), InstanceRaw::desc()]
        } else {
            &[Vertex::desc()]
        };

        let module = &self.modules[&kind];

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some("Render Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: vertex_layouts,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: mk_blend(&states.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: mk_primitive(&states.cull),
            depth_stencil: Some(mk_depth_stencil(states, Texture::DEPTH_FORMAT)),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        })
    }
}
