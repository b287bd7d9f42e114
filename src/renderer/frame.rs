//! Per-frame draw list assembly.
//!
//! Building the draw list is pure scene-graph work with no GPU involvement:
//! traverse the tree, collect drawables with their world matrices, split the
//! collection into an opaque and a transparent bucket, and order the
//! transparent bucket back-to-front. The renderer then walks the finished
//! list and only talks to the GPU.

use cgmath::Matrix4;
use log::warn;

use crate::geometry::Geometry;
use crate::material::MaterialRef;
use crate::scene::{InstancedMesh, Mesh, Node, NodeKind};

/// The drawable behind a draw item, borrowed from the scene for the duration
/// of the frame.
pub enum Drawable<'a> {
    Single(&'a Mesh),
    Instanced(&'a InstancedMesh),
}

impl<'a> Drawable<'a> {
    pub fn material(&self) -> &MaterialRef {
        match self {
            Drawable::Single(mesh) => &mesh.material,
            Drawable::Instanced(mesh) => &mesh.material,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        match self {
            Drawable::Single(mesh) => mesh.geometry.as_ref(),
            Drawable::Instanced(mesh) => mesh.geometry.as_ref(),
        }
    }
}

/// One pending draw: a drawable plus its composed world matrix and its
/// view-space depth (the Z of the world origin under the view matrix).
pub struct DrawItem<'a> {
    pub drawable: Drawable<'a>,
    pub world: Matrix4<f32>,
    pub depth: f32,
}

/// All draws of one frame, already bucketed and ordered.
pub struct DrawList<'a> {
    pub opaque: Vec<DrawItem<'a>>,
    pub transparent: Vec<DrawItem<'a>>,
}

impl<'a> DrawList<'a> {
    /// Collect every drawable reachable from `scene`.
    ///
    /// A drawable lands in exactly one bucket, decided by its own material's
    /// blend flag; a frame-global override never moves it. Opaque draws keep
    /// traversal order. Transparent draws are sorted by ascending view-space
    /// Z so the farthest is drawn first; the sort is stable, so equal depths
    /// also keep traversal order. Drawables that cannot produce a draw call
    /// (zero instances, zero indices) are dropped here with a warning
    /// instead of reaching the GPU.
    pub fn build(scene: &'a Node, view: Matrix4<f32>) -> Self {
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();

        scene.visit(&mut |node, world| {
            let drawable = match node.kind() {
                NodeKind::Group => return,
                NodeKind::Mesh(mesh) => Drawable::Single(mesh),
                NodeKind::Instanced(mesh) => {
                    if mesh.instance_count() == 0 {
                        warn!(
                            "skipping instanced mesh {:?} with zero instances",
                            mesh.geometry.name()
                        );
                        return;
                    }
                    Drawable::Instanced(mesh)
                }
            };
            if drawable.geometry().index_count() == 0 {
                warn!(
                    "skipping mesh {:?} with no indices",
                    drawable.geometry().name()
                );
                return;
            }

            let depth = (view * world.w).z;
            let item = DrawItem {
                drawable,
                world,
                depth,
            };
            if item.drawable.material().borrow().is_transparent() {
                transparent.push(item);
            } else {
                opaque.push(item);
            }
        });

        transparent.sort_by(|a, b| {
            a.depth
                .partial_cmp(&b.depth)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Self {
            opaque,
            transparent,
        }
    }

    /// All items in draw order: the opaque bucket, then the transparent one.
    pub fn iter(&self) -> impl Iterator<Item = &DrawItem<'a>> {
        self.opaque.iter().chain(self.transparent.iter())
    }

    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }
}
