use std::rc::Rc;

use cgmath::{Deg, Matrix4, Vector3};
use meadow::material::Material;
use meadow::scene::InstancedMesh;
use meadow::{Camera, Geometry};

fn field(count: usize) -> InstancedMesh {
    InstancedMesh::new(
        Rc::new(Geometry::plane(0.2, 1.0)),
        Material::white().shared(),
        count,
    )
}

#[test]
fn new_mesh_starts_with_identity_matrices() {
    let mesh = field(50);
    assert_eq!(mesh.instance_count(), 50);
    for matrix in mesh.matrices().iter() {
        assert_eq!(matrix.w.w, 1.0);
        assert_eq!(matrix.w.x, 0.0);
    }
}

#[test]
fn depth_sort_uses_the_camera_view() {
    let mesh = field(4);
    // Scattered along -Z in shuffled order.
    mesh.set_matrix(0, Matrix4::from_translation(Vector3::new(0.0, 0.0, -4.0)));
    mesh.set_matrix(1, Matrix4::from_translation(Vector3::new(0.0, 0.0, -16.0)));
    mesh.set_matrix(2, Matrix4::from_translation(Vector3::new(0.0, 0.0, -1.0)));
    mesh.set_matrix(3, Matrix4::from_translation(Vector3::new(0.0, 0.0, -8.0)));

    let camera = Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(0.0));
    mesh.sort_by_view_depth(camera.view_matrix());

    let zs: Vec<f32> = mesh.matrices().iter().map(|m| m.w.z).collect();
    assert_eq!(zs, vec![-16.0, -8.0, -4.0, -1.0]);
}

#[test]
fn resort_after_camera_move_flips_the_order() {
    let mesh = field(2);
    mesh.set_matrix(0, Matrix4::from_translation(Vector3::new(0.0, 0.0, -1.0)));
    mesh.set_matrix(1, Matrix4::from_translation(Vector3::new(0.0, 0.0, -10.0)));

    // Camera in front: the blade at -10 is farthest.
    let front = Camera::new((0.0, 0.0, 0.0), Deg(-90.0), Deg(0.0));
    mesh.sort_by_view_depth(front.view_matrix());
    assert_eq!(mesh.matrices()[0].w.z, -10.0);

    // Camera walked past both and turned around: now -1 is farthest.
    let behind = Camera::new((0.0, 0.0, -20.0), Deg(90.0), Deg(0.0));
    mesh.sort_by_view_depth(behind.view_matrix());
    assert_eq!(mesh.matrices()[0].w.z, -1.0);
}
