use std::rc::Rc;

use cgmath::{Matrix4, SquareMatrix, Vector3};
use meadow::material::Material;
use meadow::renderer::frame::DrawList;
use meadow::scene::{Node, Transform};
use meadow::Geometry;

fn quad() -> Rc<Geometry> {
    Rc::new(Geometry::plane(1.0, 1.0))
}

fn opaque_at(z: f32) -> Node {
    Node::mesh(quad(), Material::white().shared())
        .with_local(Transform::from_position(Vector3::new(0.0, 0.0, z)))
}

fn transparent_at(z: f32) -> Node {
    let mut material = Material::white();
    material.set_transparent(0.5);
    Node::mesh(quad(), material.shared())
        .with_local(Transform::from_position(Vector3::new(0.0, 0.0, z)))
}

#[test]
fn every_drawable_lands_in_exactly_one_bucket() {
    let scene = Node::group()
        .with_child(opaque_at(-1.0))
        .with_child(transparent_at(-2.0))
        .with_child(opaque_at(-3.0))
        .with_child(transparent_at(-4.0));

    let list = DrawList::build(&scene, Matrix4::identity());
    assert_eq!(list.opaque.len(), 2);
    assert_eq!(list.transparent.len(), 2);
    assert_eq!(list.len(), 4);
}

#[test]
fn opaque_draws_before_transparent() {
    let scene = Node::group()
        .with_child(transparent_at(-1.0))
        .with_child(opaque_at(-2.0));

    let list = DrawList::build(&scene, Matrix4::identity());
    let transparent_flags: Vec<bool> = list
        .iter()
        .map(|item| item.drawable.material().borrow().is_transparent())
        .collect();
    assert_eq!(transparent_flags, vec![false, true]);
}

#[test]
fn transparent_bucket_is_sorted_back_to_front() {
    // With the identity view, more negative Z means farther away.
    let scene = Node::group()
        .with_child(transparent_at(-2.0))
        .with_child(transparent_at(-9.0))
        .with_child(transparent_at(-5.0));

    let list = DrawList::build(&scene, Matrix4::identity());
    let depths: Vec<f32> = list.transparent.iter().map(|item| item.depth).collect();
    assert_eq!(depths, vec![-9.0, -5.0, -2.0]);
}

#[test]
fn equal_depths_keep_traversal_order() {
    let shared_z = -3.0;
    let first = {
        let mut material = Material::white();
        material.set_transparent(0.25);
        material.shared()
    };
    let second = {
        let mut material = Material::white();
        material.set_transparent(0.75);
        material.shared()
    };

    let scene = Node::group()
        .with_child(
            Node::mesh(quad(), Rc::clone(&first))
                .with_local(Transform::from_position(Vector3::new(1.0, 0.0, shared_z))),
        )
        .with_child(
            Node::mesh(quad(), Rc::clone(&second))
                .with_local(Transform::from_position(Vector3::new(-1.0, 0.0, shared_z))),
        );

    let list = DrawList::build(&scene, Matrix4::identity());
    let opacities: Vec<f32> = list
        .transparent
        .iter()
        .map(|item| item.drawable.material().borrow().opacity)
        .collect();
    assert_eq!(opacities, vec![0.25, 0.75]);
}

#[test]
fn opaque_bucket_keeps_traversal_order_regardless_of_depth() {
    let scene = Node::group()
        .with_child(opaque_at(-1.0))
        .with_child(opaque_at(-9.0))
        .with_child(opaque_at(-5.0));

    let list = DrawList::build(&scene, Matrix4::identity());
    let depths: Vec<f32> = list.opaque.iter().map(|item| item.depth).collect();
    assert_eq!(depths, vec![-1.0, -9.0, -5.0]);
}

#[test]
fn groups_contribute_no_draws() {
    let scene = Node::group().with_child(Node::group().with_child(Node::group()));
    let list = DrawList::build(&scene, Matrix4::identity());
    assert!(list.is_empty());
}

#[test]
fn zero_instance_meshes_are_skipped() {
    let scene = Node::group()
        .with_child(Node::instanced(quad(), Material::white().shared(), 0))
        .with_child(opaque_at(-1.0));

    let list = DrawList::build(&scene, Matrix4::identity());
    assert_eq!(list.len(), 1);
}

#[test]
fn meshes_without_indices_are_skipped() {
    let empty = Rc::new(Geometry::new("empty", Vec::new(), Vec::new()));
    let scene = Node::group()
        .with_child(Node::mesh(empty, Material::white().shared()))
        .with_child(opaque_at(-1.0));

    let list = DrawList::build(&scene, Matrix4::identity());
    assert_eq!(list.len(), 1);
}

#[test]
fn instanced_mesh_is_one_draw_item() {
    let scene = Node::group().with_child(Node::instanced(
        quad(),
        Material::white().shared(),
        50,
    ));

    let list = DrawList::build(&scene, Matrix4::identity());
    assert_eq!(list.len(), 1);
    match &list.opaque[0].drawable {
        meadow::renderer::frame::Drawable::Instanced(mesh) => {
            assert_eq!(mesh.instance_count(), 50)
        }
        _ => panic!("expected an instanced drawable"),
    }
}

#[test]
fn bucket_follows_the_view_space_depth_of_the_node() {
    // A camera-style view matrix translating the world by +10 on Z: a mesh
    // at world z = -2 sits at view z = 8, "behind" the camera plane, and the
    // sort must still use exactly that view-space value.
    let view = Matrix4::from_translation(Vector3::new(0.0, 0.0, 10.0));
    let scene = Node::group()
        .with_child(transparent_at(-2.0))
        .with_child(transparent_at(-20.0));

    let list = DrawList::build(&scene, view);
    let depths: Vec<f32> = list.transparent.iter().map(|item| item.depth).collect();
    assert_eq!(depths, vec![-10.0, 8.0]);
}
