//! Materials: one closed variant per shading kind plus shared pipeline state.
//!
//! A [`Material`] pairs a [`MaterialKind`] (the kind-specific textures and
//! uniform scalars) with the [`RenderStates`] flag groups every kind shares.
//! Materials are handed around as [`MaterialRef`]s so several drawables can
//! reference one instance and an overlay can edit fields between frames; the
//! renderer only ever reads them.
//!
//! Adding a kind means one new variant here, one uniform block in
//! `renderer::uniforms`, and one shader-bank entry; `match` exhaustiveness
//! flags every site that needs updating.

use std::cell::RefCell;
use std::rc::Rc;

use cgmath::Vector3;

use crate::texture::Texture;

pub mod state;

pub use state::{BlendFlags, CullFlags, DepthFlags, PolygonOffsetFlags, RenderStates, StencilFlags};

/// Shared handle to a material. Multiple drawables may hold the same
/// reference; the material lives as long as its longest holder.
pub type MaterialRef = Rc<RefCell<Material>>;

/// Discriminant of [`MaterialKind`], used as the shader-bank key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KindId {
    Phong,
    White,
    Depth,
    OpacityMask,
    Screen,
    CubeEnv,
    PhongInstanced,
    GrassInstanced,
}

/// Uniform payload of the grass-instanced kind. Every field is live-editable
/// between frames; the wind and cloud groups feed the vertex sway and the
/// scrolling cloud shadow in the shader.
#[derive(Clone, Debug)]
pub struct GrassParams {
    pub diffuse: Rc<Texture>,
    pub opacity_mask: Rc<Texture>,
    pub cloud_mask: Rc<Texture>,
    pub shininess: f32,
    pub uv_scale: f32,
    pub brightness: f32,
    pub wind_scale: f32,
    pub wind_direction: Vector3<f32>,
    pub phase_scale: f32,
    pub cloud_white: Vector3<f32>,
    pub cloud_black: Vector3<f32>,
    pub cloud_uv_scale: f32,
    pub cloud_speed: f32,
    pub cloud_lerp: f32,
}

impl GrassParams {
    pub fn new(diffuse: Rc<Texture>, opacity_mask: Rc<Texture>, cloud_mask: Rc<Texture>) -> Self {
        Self {
            diffuse,
            opacity_mask,
            cloud_mask,
            shininess: 1.0,
            uv_scale: 1.0,
            brightness: 1.0,
            wind_scale: 0.1,
            wind_direction: Vector3::new(1.0, 1.0, 1.0),
            phase_scale: 1.0,
            cloud_white: Vector3::new(0.576, 1.0, 0.393),
            cloud_black: Vector3::new(0.994, 0.3, 0.426),
            cloud_uv_scale: 1.0,
            cloud_speed: 0.1,
            cloud_lerp: 0.5,
        }
    }
}

/// The kind-specific part of a material: textures and uniform scalars.
#[derive(Clone, Debug)]
pub enum MaterialKind {
    /// Textured Blinn-Phong shading.
    Phong { diffuse: Rc<Texture>, shininess: f32 },
    /// Solid white, no lighting. Handy as a light-source marker.
    White,
    /// Visualizes linearized scene depth between the camera planes.
    Depth,
    /// Phong with a second texture discarding fragments below a threshold.
    OpacityMask {
        diffuse: Rc<Texture>,
        mask: Rc<Texture>,
        shininess: f32,
    },
    /// Samples a previously rendered color attachment onto a screen quad.
    Screen { screen: Rc<Texture> },
    /// Camera-following sky sphere sampling an equirectangular environment
    /// texture by view direction.
    CubeEnv { sky: Rc<Texture> },
    /// Phong shading with per-instance world matrices.
    PhongInstanced { diffuse: Rc<Texture>, shininess: f32 },
    /// Wind-animated, cloud-shadowed grass with per-instance matrices.
    GrassInstanced(GrassParams),
}

impl KindId {
    /// Whether the kind's shader consumes a per-instance matrix buffer.
    pub fn is_instanced(self) -> bool {
        matches!(self, KindId::PhongInstanced | KindId::GrassInstanced)
    }
}

impl MaterialKind {
    pub fn id(&self) -> KindId {
        match self {
            MaterialKind::Phong { .. } => KindId::Phong,
            MaterialKind::White => KindId::White,
            MaterialKind::Depth => KindId::Depth,
            MaterialKind::OpacityMask { .. } => KindId::OpacityMask,
            MaterialKind::Screen { .. } => KindId::Screen,
            MaterialKind::CubeEnv { .. } => KindId::CubeEnv,
            MaterialKind::PhongInstanced { .. } => KindId::PhongInstanced,
            MaterialKind::GrassInstanced(_) => KindId::GrassInstanced,
        }
    }

    /// Whether the kind's shader consumes a per-instance matrix buffer.
    pub fn is_instanced(&self) -> bool {
        self.id().is_instanced()
    }
}

#[derive(Clone, Debug)]
pub struct Material {
    pub kind: MaterialKind,
    pub states: RenderStates,
    pub opacity: f32,
}

impl Material {
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            states: RenderStates::default(),
            opacity: 1.0,
        }
    }

    pub fn phong(diffuse: Rc<Texture>) -> Self {
        Self::new(MaterialKind::Phong {
            diffuse,
            shininess: 1.0,
        })
    }

    pub fn white() -> Self {
        Self::new(MaterialKind::White)
    }

    pub fn depth() -> Self {
        Self::new(MaterialKind::Depth)
    }

    pub fn opacity_mask(diffuse: Rc<Texture>, mask: Rc<Texture>) -> Self {
        Self::new(MaterialKind::OpacityMask {
            diffuse,
            mask,
            shininess: 1.0,
        })
    }

    pub fn screen(screen: Rc<Texture>) -> Self {
        let mut material = Self::new(MaterialKind::Screen { screen });
        // The quad spans clip space already; depth would occlude the scene
        // it displays.
        material.states.depth.test = false;
        material.states.depth.write = false;
        material
    }

    pub fn cube_env(sky: Rc<Texture>) -> Self {
        let mut material = Self::new(MaterialKind::CubeEnv { sky });
        // Drawn around the camera; must not shadow the scene in the depth
        // buffer.
        material.states.depth.write = false;
        material.states.depth.compare = wgpu::CompareFunction::LessEqual;
        material
    }

    pub fn phong_instanced(diffuse: Rc<Texture>) -> Self {
        Self::new(MaterialKind::PhongInstanced {
            diffuse,
            shininess: 1.0,
        })
    }

    pub fn grass_instanced(params: GrassParams) -> Self {
        Self::new(MaterialKind::GrassInstanced(params))
    }

    /// Wrap into the shared handle drawables hold.
    pub fn shared(self) -> MaterialRef {
        Rc::new(RefCell::new(self))
    }

    /// The opaque/transparent bucket key: materials with blending enabled are
    /// depth-sorted and drawn after all opaque objects.
    pub fn is_transparent(&self) -> bool {
        self.states.blend.enabled
    }

    /// Enable alpha blending and disable depth writes, the usual setup for
    /// see-through objects.
    pub fn set_transparent(&mut self, opacity: f32) {
        self.states.blend.enabled = true;
        self.states.depth.write = false;
        self.opacity = opacity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blend_flag_keys_the_bucket() {
        let mut material = Material::white();
        assert!(!material.is_transparent());
        material.set_transparent(0.4);
        assert!(material.is_transparent());
        assert!(!material.states.depth.write);
        assert_eq!(material.opacity, 0.4);
    }

    #[test]
    fn kind_ids_are_distinct_for_textureless_kinds() {
        assert_ne!(Material::white().kind.id(), Material::depth().kind.id());
        assert!(!Material::white().kind.is_instanced());
    }
}
