//! Material-declared pipeline state.
//!
//! Every material carries five independent flag groups: depth, polygon
//! offset, stencil, blend and face culling. Each group maps to its wgpu
//! pipeline-descriptor counterpart through one pure `mk_*` function; since
//! wgpu bakes fixed-function state into pipelines, "applying" a material's
//! state means selecting (or building) the pipeline whose descriptor these
//! functions produce. The mappings are total functions of the flags, so
//! applying the same flags twice always yields the same pipeline.

/// Depth test and write flags. The default is the per-frame baseline:
/// test on with less-than compare, write on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthFlags {
    pub test: bool,
    pub compare: wgpu::CompareFunction,
    pub write: bool,
}

impl Default for DepthFlags {
    fn default() -> Self {
        Self {
            test: true,
            compare: wgpu::CompareFunction::Less,
            write: true,
        }
    }
}

/// Polygon offset (depth bias) flags. `factor` scales with polygon slope,
/// `units` is a constant bias in depth-buffer units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolygonOffsetFlags {
    pub enabled: bool,
    pub factor: f32,
    pub units: i32,
}

impl Default for PolygonOffsetFlags {
    fn default() -> Self {
        Self {
            enabled: false,
            factor: 0.0,
            units: 0,
        }
    }
}

/// Stencil test flags. The default keeps the test enabled with a no-op
/// op-triple, an always-passing compare and a full write mask, matching the
/// baseline state the renderer resets to each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StencilFlags {
    pub test: bool,
    pub fail_op: wgpu::StencilOperation,
    pub depth_fail_op: wgpu::StencilOperation,
    pub pass_op: wgpu::StencilOperation,
    pub compare: wgpu::CompareFunction,
    pub reference: u32,
    pub read_mask: u32,
    pub write_mask: u32,
}

impl Default for StencilFlags {
    fn default() -> Self {
        Self {
            test: true,
            fail_op: wgpu::StencilOperation::Keep,
            depth_fail_op: wgpu::StencilOperation::Keep,
            pass_op: wgpu::StencilOperation::Keep,
            compare: wgpu::CompareFunction::Always,
            reference: 0,
            read_mask: 0xFF,
            write_mask: 0xFF,
        }
    }
}

/// Blend flags. `enabled` doubles as the opaque/transparent bucket key
/// during scene traversal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendFlags {
    pub enabled: bool,
    pub src_factor: wgpu::BlendFactor,
    pub dst_factor: wgpu::BlendFactor,
}

impl Default for BlendFlags {
    fn default() -> Self {
        Self {
            enabled: false,
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        }
    }
}

/// Face culling flags.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CullFlags {
    pub enabled: bool,
    pub front_face: wgpu::FrontFace,
    pub cull_face: wgpu::Face,
}

impl Default for CullFlags {
    fn default() -> Self {
        Self {
            enabled: false,
            front_face: wgpu::FrontFace::Ccw,
            cull_face: wgpu::Face::Back,
        }
    }
}

/// The full set of pipeline state a material declares. `Default` is the
/// baseline every frame starts from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderStates {
    pub depth: DepthFlags,
    pub polygon_offset: PolygonOffsetFlags,
    pub stencil: StencilFlags,
    pub blend: BlendFlags,
    pub cull: CullFlags,
}

/// Depth flags to (compare function, write mask). A disabled test passes
/// every fragment and writes no depth, regardless of the write flag.
pub fn mk_depth(flags: &DepthFlags) -> (wgpu::CompareFunction, bool) {
    if flags.test {
        (flags.compare, flags.write)
    } else {
        (wgpu::CompareFunction::Always, false)
    }
}

/// Polygon offset flags to a wgpu depth bias.
pub fn mk_depth_bias(flags: &PolygonOffsetFlags) -> wgpu::DepthBiasState {
    if flags.enabled {
        wgpu::DepthBiasState {
            constant: flags.units,
            slope_scale: flags.factor,
            clamp: 0.0,
        }
    } else {
        wgpu::DepthBiasState::default()
    }
}

/// Stencil flags to a wgpu stencil descriptor (same ops on both faces).
pub fn mk_stencil(flags: &StencilFlags) -> wgpu::StencilState {
    if flags.test {
        let face = wgpu::StencilFaceState {
            compare: flags.compare,
            fail_op: flags.fail_op,
            depth_fail_op: flags.depth_fail_op,
            pass_op: flags.pass_op,
        };
        wgpu::StencilState {
            front: face,
            back: face,
            read_mask: flags.read_mask,
            write_mask: flags.write_mask,
        }
    } else {
        wgpu::StencilState::default()
    }
}

/// Blend flags to an optional wgpu blend state (None disables blending).
pub fn mk_blend(flags: &BlendFlags) -> Option<wgpu::BlendState> {
    if flags.enabled {
        let component = wgpu::BlendComponent {
            src_factor: flags.src_factor,
            dst_factor: flags.dst_factor,
            operation: wgpu::BlendOperation::Add,
        };
        Some(wgpu::BlendState {
            color: component,
            alpha: component,
        })
    } else {
        None
    }
}

/// Cull flags to the primitive state of the pipeline.
pub fn mk_primitive(flags: &CullFlags) -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: flags.front_face,
        cull_mode: flags.enabled.then_some(flags.cull_face),
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Assembles the depth-stencil descriptor from the depth, polygon-offset and
/// stencil groups.
pub fn mk_depth_stencil(states: &RenderStates, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    let (depth_compare, depth_write_enabled) = mk_depth(&states.depth);
    wgpu::DepthStencilState {
        format,
        depth_write_enabled,
        depth_compare,
        stencil: mk_stencil(&states.stencil),
        bias: mk_depth_bias(&states.polygon_offset),
    }
}

/// Hashable pipeline-cache key derived from a full state set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct StateKey {
    depth_compare: wgpu::CompareFunction,
    depth_write: bool,
    bias_constant: i32,
    bias_slope_bits: u32,
    stencil_face: wgpu::StencilFaceState,
    stencil_read_mask: u32,
    stencil_write_mask: u32,
    blend: Option<wgpu::BlendState>,
    front_face: wgpu::FrontFace,
    cull_mode: Option<wgpu::Face>,
}

impl RenderStates {
    pub(crate) fn key(&self) -> StateKey {
        let (depth_compare, depth_write) = mk_depth(&self.depth);
        let bias = mk_depth_bias(&self.polygon_offset);
        let stencil = mk_stencil(&self.stencil);
        let primitive = mk_primitive(&self.cull);
        StateKey {
            depth_compare,
            depth_write,
            bias_constant: bias.constant,
            bias_slope_bits: bias.slope_scale.to_bits(),
            stencil_face: stencil.front,
            stencil_read_mask: stencil.read_mask,
            stencil_write_mask: stencil.write_mask,
            blend: mk_blend(&self.blend),
            front_face: primitive.front_face,
            cull_mode: primitive.cull_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mappings_are_idempotent() {
        let states = RenderStates {
            depth: DepthFlags {
                test: true,
                compare: wgpu::CompareFunction::LessEqual,
                write: false,
            },
            polygon_offset: PolygonOffsetFlags {
                enabled: true,
                factor: 1.5,
                units: 2,
            },
            stencil: StencilFlags {
                test: true,
                pass_op: wgpu::StencilOperation::Replace,
                reference: 7,
                ..Default::default()
            },
            blend: BlendFlags {
                enabled: true,
                ..Default::default()
            },
            cull: CullFlags {
                enabled: true,
                front_face: wgpu::FrontFace::Cw,
                cull_face: wgpu::Face::Front,
            },
        };

        assert_eq!(mk_depth(&states.depth), mk_depth(&states.depth));
        assert_eq!(
            mk_depth_bias(&states.polygon_offset),
            mk_depth_bias(&states.polygon_offset)
        );
        assert_eq!(mk_stencil(&states.stencil), mk_stencil(&states.stencil));
        assert_eq!(mk_blend(&states.blend), mk_blend(&states.blend));
        assert_eq!(mk_primitive(&states.cull), mk_primitive(&states.cull));
        assert_eq!(states.key(), states.key());
    }

    #[test]
    fn disabled_depth_test_compares_always_and_stops_writes() {
        let flags = DepthFlags {
            test: false,
            compare: wgpu::CompareFunction::Less,
            write: true,
        };
        let (compare, write) = mk_depth(&flags);
        assert_eq!(compare, wgpu::CompareFunction::Always);
        assert!(!write);
    }

    #[test]
    fn disabled_blend_maps_to_none() {
        assert_eq!(mk_blend(&BlendFlags::default()), None);
        let enabled = BlendFlags {
            enabled: true,
            ..Default::default()
        };
        let blend = mk_blend(&enabled).unwrap();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn baseline_matches_frame_reset() {
        let baseline = RenderStates::default();
        let (compare, write) = mk_depth(&baseline.depth);
        assert_eq!(compare, wgpu::CompareFunction::Less);
        assert!(write);
        assert_eq!(mk_depth_bias(&baseline.polygon_offset), wgpu::DepthBiasState::default());
        let stencil = mk_stencil(&baseline.stencil);
        assert_eq!(stencil.front.pass_op, wgpu::StencilOperation::Keep);
        assert_eq!(stencil.write_mask, 0xFF);
        assert_eq!(mk_blend(&baseline.blend), None);
        assert_eq!(mk_primitive(&baseline.cull).cull_mode, None);
    }

    #[test]
    fn distinct_states_yield_distinct_keys() {
        let a = RenderStates::default();
        let mut b = RenderStates::default();
        b.blend.enabled = true;
        assert_ne!(a.key(), b.key());
        let mut c = RenderStates::default();
        c.depth.write = false;
        assert_ne!(a.key(), c.key());
    }
}
