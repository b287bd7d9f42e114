use std::rc::Rc;

use cgmath::{Deg, Matrix4, Quaternion, Rotation3, SquareMatrix, Vector3, Vector4};
use meadow::material::Material;
use meadow::scene::{Node, Transform};
use meadow::Geometry;

fn white_mesh() -> Node {
    Node::mesh(Rc::new(Geometry::plane(1.0, 1.0)), Material::white().shared())
}

#[test]
fn world_transform_composes_down_the_tree() {
    let t_root = Transform::from_position(Vector3::new(10.0, 0.0, 0.0));
    let t_mid = Transform {
        position: Vector3::new(0.0, 2.0, 0.0),
        rotation: Quaternion::from_angle_y(Deg(90.0)),
        scale: Vector3::new(1.0, 1.0, 1.0),
    };
    let t_leaf = Transform::from_position(Vector3::new(1.0, 0.0, 0.0));

    let scene = Node::group().with_local(t_root).with_child(
        Node::group()
            .with_local(t_mid)
            .with_child(white_mesh().with_local(t_leaf)),
    );

    let expected = t_root.to_matrix() * t_mid.to_matrix() * t_leaf.to_matrix();

    let mut worlds = Vec::new();
    scene.visit(&mut |_, world| worlds.push(world));
    assert_eq!(worlds.len(), 3);

    let leaf_world = worlds[2];
    for col in 0..4 {
        for row in 0..4 {
            assert!(
                (leaf_world[col][row] - expected[col][row]).abs() < 1e-5,
                "mismatch at [{col}][{row}]"
            );
        }
    }

    // Rotating 90 degrees about Y maps the child's +X offset onto -Z.
    let origin = leaf_world * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert!((origin.x - 10.0).abs() < 1e-5);
    assert!((origin.y - 2.0).abs() < 1e-5);
    assert!((origin.z + 1.0).abs() < 1e-5);
}

#[test]
fn root_world_is_its_local_matrix() {
    let local = Transform {
        position: Vector3::new(1.0, 2.0, 3.0),
        rotation: Quaternion::from_angle_x(Deg(30.0)),
        scale: Vector3::new(2.0, 2.0, 2.0),
    };
    let scene = white_mesh().with_local(local);

    let mut world = Matrix4::identity();
    scene.visit(&mut |_, w| world = w);

    let expected = local.to_matrix();
    for col in 0..4 {
        for row in 0..4 {
            assert!((world[col][row] - expected[col][row]).abs() < 1e-6);
        }
    }
}

#[test]
fn reparenting_changes_world_position() {
    let offset = Transform::from_position(Vector3::new(0.0, 0.0, -5.0));

    let standalone = white_mesh().with_local(offset);
    let mut world = Matrix4::identity();
    standalone.visit(&mut |_, w| world = w);
    assert!((world.w.z + 5.0).abs() < 1e-6);

    let parented = Node::group()
        .with_local(Transform::from_position(Vector3::new(0.0, 0.0, -5.0)))
        .with_child(white_mesh().with_local(offset));
    let mut leaf_world = Matrix4::identity();
    parented.visit(&mut |_, w| leaf_world = w);
    assert!((leaf_world.w.z + 10.0).abs() < 1e-6);
}
