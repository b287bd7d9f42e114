//! meadow
//!
//! A small retained-mode 3D renderer: a scene graph of meshes and instanced
//! meshes, shared materials with per-material pipeline state, and a single
//! render pass that buckets draws into opaque and transparent and orders the
//! transparent ones back-to-front.
//!
//! High-level modules
//! - `app`: windowed runner driving a user [`Stage`](app::Stage) per frame
//! - `camera`: free-look camera, projection and controller
//! - `context`: window surface, GPU device/queue and the depth attachment
//! - `framebuffer`: offscreen render targets
//! - `geometry`: shared vertex data with lazily created GPU buffers
//! - `light`: directional and ambient light parameters
//! - `material`: the material kinds and their render-state flag groups
//! - `renderer`: draw-list assembly, shader bank and pass recording
//! - `scene`: the node tree, transforms and instanced meshes
//! - `texture`: GPU textures and the path-keyed texture cache
//!

pub mod app;
pub mod camera;
pub mod context;
pub mod framebuffer;
pub mod geometry;
pub mod light;
pub mod material;
pub mod renderer;
pub mod scene;
pub mod texture;

// Re-exports commonly used types for convenience in downstream code.
pub use app::{run, App, Stage};
pub use camera::{Camera, CameraController, Projection};
pub use context::Context;
pub use framebuffer::{Framebuffer, RenderTarget};
pub use geometry::Geometry;
pub use light::{AmbientLight, DirectionalLight};
pub use material::{Material, MaterialKind, MaterialRef};
pub use renderer::Renderer;
pub use scene::{Node, NodeKind, Transform};
pub use texture::{ResourceCache, Texture, TextureCache};
