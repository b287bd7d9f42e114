//! Scene graph: a tree of exclusively owned nodes.
//!
//! Each [`Node`] carries a local [`Transform`] and a [`NodeKind`]: a pure
//! grouping node, a mesh, or an instanced mesh. World transforms are not
//! cached; they are recomputed top-down on every traversal, which keeps
//! mutation trivial at the scale this renderer targets. Dropping a node
//! drops its whole subtree.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use cgmath::{Matrix4, SquareMatrix};
use log::warn;
use wgpu::util::DeviceExt;

use crate::geometry::Geometry;
use crate::material::MaterialRef;
use crate::scene::transform::InstanceRaw;

pub mod transform;

pub use transform::Transform;

/// A drawable leaf: shared geometry plus a shared material.
pub struct Mesh {
    pub geometry: Rc<Geometry>,
    pub material: MaterialRef,
}

impl Mesh {
    pub fn new(geometry: Rc<Geometry>, material: MaterialRef) -> Self {
        Self { geometry, material }
    }
}

struct InstanceBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
}

/// A drawable rendered `instance_count` times in one draw call, with one
/// world matrix per instance. Mutating the matrices invalidates the GPU
/// instance buffer until the next draw re-uploads it.
pub struct InstancedMesh {
    pub geometry: Rc<Geometry>,
    pub material: MaterialRef,
    matrices: RefCell<Vec<Matrix4<f32>>>,
    gpu: RefCell<Option<InstanceBuffer>>,
    dirty: Cell<bool>,
}

impl InstancedMesh {
    /// Create with `count` identity matrices.
    pub fn new(geometry: Rc<Geometry>, material: MaterialRef, count: usize) -> Self {
        Self {
            geometry,
            material,
            matrices: RefCell::new(vec![Matrix4::identity(); count]),
            gpu: RefCell::new(None),
            dirty: Cell::new(true),
        }
    }

    pub fn instance_count(&self) -> usize {
        self.matrices.borrow().len()
    }

    pub fn matrices(&self) -> Ref<'_, Vec<Matrix4<f32>>> {
        self.matrices.borrow()
    }

    pub fn set_matrix(&self, index: usize, matrix: Matrix4<f32>) {
        let mut matrices = self.matrices.borrow_mut();
        match matrices.get_mut(index) {
            Some(slot) => {
                *slot = matrix;
                self.dirty.set(true);
            }
            None => warn!(
                "instance index {} out of bounds for {} instances",
                index,
                matrices.len()
            ),
        }
    }

    pub fn set_matrices(&self, matrices: Vec<Matrix4<f32>>) {
        *self.matrices.borrow_mut() = matrices;
        self.dirty.set(true);
    }

    /// Reorder the instances back-to-front for the given view matrix:
    /// ascending view-space Z of each matrix's translation, so the farthest
    /// instance is drawn first. Required every frame for blended instanced
    /// geometry such as grass; marks the GPU buffer for re-upload.
    pub fn sort_by_view_depth(&self, view: Matrix4<f32>) {
        let mut matrices = self.matrices.borrow_mut();
        matrices.sort_by(|a, b| {
            let za = (view * a.w).z;
            let zb = (view * b.w).z;
            za.partial_cmp(&zb).unwrap_or(std::cmp::Ordering::Equal)
        });
        self.dirty.set(true);
    }

    /// The instance buffer, created on first use and re-uploaded whenever
    /// the matrices changed since the last draw. Recreated from scratch when
    /// the instance count changed.
    pub(crate) fn instance_buffer(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Ref<'_, wgpu::Buffer> {
        let count = self.instance_count();
        let needs_rebuild = match &*self.gpu.borrow() {
            Some(gpu) => gpu.capacity != count,
            None => true,
        };

        if needs_rebuild {
            let raw = self.raw_instances();
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Buffer"),
                contents: bytemuck::cast_slice(&raw),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            *self.gpu.borrow_mut() = Some(InstanceBuffer {
                buffer,
                capacity: count,
            });
            self.dirty.set(false);
        } else if self.dirty.get() {
            let raw = self.raw_instances();
            if let Some(gpu) = &*self.gpu.borrow() {
                queue.write_buffer(&gpu.buffer, 0, bytemuck::cast_slice(&raw));
            }
            self.dirty.set(false);
        }

        Ref::map(self.gpu.borrow(), |gpu| {
            &gpu.as_ref().expect("buffer created above").buffer
        })
    }

    fn raw_instances(&self) -> Vec<InstanceRaw> {
        self.matrices
            .borrow()
            .iter()
            .map(|&matrix| matrix.into())
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty.get()
    }
}

/// What a node contributes to the frame.
pub enum NodeKind {
    /// Pure grouping: no drawable, but descendants are still visited.
    Group,
    Mesh(Mesh),
    Instanced(InstancedMesh),
}

/// One node of the scene tree. Children are exclusively owned.
pub struct Node {
    pub local: Transform,
    kind: NodeKind,
    children: Vec<Node>,
}

impl Node {
    pub fn group() -> Self {
        Self {
            local: Transform::default(),
            kind: NodeKind::Group,
            children: Vec::new(),
        }
    }

    pub fn mesh(geometry: Rc<Geometry>, material: MaterialRef) -> Self {
        Self {
            local: Transform::default(),
            kind: NodeKind::Mesh(Mesh::new(geometry, material)),
            children: Vec::new(),
        }
    }

    pub fn instanced(geometry: Rc<Geometry>, material: MaterialRef, count: usize) -> Self {
        Self {
            local: Transform::default(),
            kind: NodeKind::Instanced(InstancedMesh::new(geometry, material, count)),
            children: Vec::new(),
        }
    }

    pub fn with_local(mut self, local: Transform) -> Self {
        self.local = local;
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// The instanced mesh of this node, if it is one.
    pub fn as_instanced(&self) -> Option<&InstancedMesh> {
        match &self.kind {
            NodeKind::Instanced(instanced) => Some(instanced),
            _ => None,
        }
    }

    /// Pre-order traversal composing world transforms from the root down.
    /// The callback receives every node (groups included) with its world
    /// matrix; the root's parent transform is the identity.
    pub fn visit<'s, F>(&'s self, f: &mut F)
    where
        F: FnMut(&'s Node, Matrix4<f32>),
    {
        self.visit_inner(Matrix4::identity(), f);
    }

    fn visit_inner<'s, F>(&'s self, parent: Matrix4<f32>, f: &mut F)
    where
        F: FnMut(&'s Node, Matrix4<f32>),
    {
        let world = parent * self.local.to_matrix();
        f(self, world);
        for child in &self.children {
            child.visit_inner(world, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use cgmath::Vector3;

    fn quad() -> Rc<Geometry> {
        Rc::new(Geometry::plane(1.0, 1.0))
    }

    #[test]
    fn traversal_is_preorder() {
        let root = Node::group()
            .with_child(
                Node::mesh(quad(), Material::white().shared())
                    .with_child(Node::mesh(quad(), Material::white().shared())),
            )
            .with_child(Node::mesh(quad(), Material::white().shared()));

        let mut order = Vec::new();
        root.visit(&mut |node, _| {
            order.push(match node.kind() {
                NodeKind::Group => 'g',
                NodeKind::Mesh(_) => 'm',
                NodeKind::Instanced(_) => 'i',
            });
        });
        assert_eq!(order, vec!['g', 'm', 'm', 'm']);
    }

    #[test]
    fn mutating_instances_marks_buffer_dirty() {
        let mesh = InstancedMesh::new(quad(), Material::white().shared(), 3);
        assert!(mesh.is_dirty());
        mesh.set_matrix(1, Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0)));
        assert!(mesh.is_dirty());
        // Out-of-bounds writes are logged and dropped.
        mesh.set_matrix(9, Matrix4::identity());
        assert_eq!(mesh.instance_count(), 3);
    }

    #[test]
    fn sort_by_view_depth_orders_far_to_near() {
        let mesh = InstancedMesh::new(quad(), Material::white().shared(), 3);
        // Identity view: view-space z == world z, farther = more negative.
        mesh.set_matrix(0, Matrix4::from_translation(Vector3::new(0.0, 0.0, -1.0)));
        mesh.set_matrix(1, Matrix4::from_translation(Vector3::new(0.0, 0.0, -9.0)));
        mesh.set_matrix(2, Matrix4::from_translation(Vector3::new(0.0, 0.0, -5.0)));

        mesh.sort_by_view_depth(Matrix4::identity());

        let zs: Vec<f32> = mesh.matrices().iter().map(|m| m.w.z).collect();
        assert_eq!(zs, vec![-9.0, -5.0, -1.0]);
    }
}
