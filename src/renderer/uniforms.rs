//! CPU-side uniform blocks, laid out to match the WGSL uniform address
//! space byte for byte. `vec3` fields are paired with a trailing scalar so
//! every 16-byte slot is fully used; `mat3x3` is three padded vec4 columns.

use bytemuck::{Pod, Zeroable};
use cgmath::{EuclideanSpace, Matrix, Matrix3, Matrix4, Point3, SquareMatrix};

use crate::light::{AmbientLight, DirectionalLight};

/// A `mat3x3<f32>` as WGSL stores it: three columns of vec4.
pub fn mat3_padded(m: Matrix3<f32>) -> [[f32; 4]; 3] {
    [
        [m.x.x, m.x.y, m.x.z, 0.0],
        [m.y.x, m.y.y, m.y.z, 0.0],
        [m.z.x, m.z.y, m.z.z, 0.0],
    ]
}

/// Inverse-transpose of the model's upper 3x3, so normals survive
/// non-uniform scaling. Falls back to the plain upper 3x3 when the model
/// matrix is singular.
pub fn normal_matrix(model: Matrix4<f32>) -> [[f32; 4]; 3] {
    let upper = Matrix3::new(
        model.x.x, model.x.y, model.x.z,
        model.y.x, model.y.y, model.y.z,
        model.z.x, model.z.y, model.z.z,
    );
    let normal = upper
        .invert()
        .map(|inv| inv.transpose())
        .unwrap_or(upper);
    mat3_padded(normal)
}

/// Model, view, and projection only. White and the sky share this block.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct BasicUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl BasicUniforms {
    pub fn new(model: Matrix4<f32>, view: Matrix4<f32>, projection: Matrix4<f32>) -> Self {
        Self {
            model: model.into(),
            view: view.into(),
            projection: projection.into(),
        }
    }
}

/// Matrices plus the near/far planes the depth visualization linearizes
/// against.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DepthUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub near: f32,
    pub far: f32,
    pub _pad: [f32; 2],
}

impl DepthUniforms {
    pub fn new(
        model: Matrix4<f32>,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            model: model.into(),
            view: view.into(),
            projection: projection.into(),
            near,
            far,
            _pad: [0.0; 2],
        }
    }
}

/// The full lit-shading block: matrices, directional and ambient light,
/// camera position, and the material's shininess and opacity. Shared by the
/// phong, opacity-mask, and instanced-phong shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PhongUniforms {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 3],
    pub light_direction: [f32; 3],
    pub light_intensity: f32,
    pub light_color: [f32; 3],
    pub specular_intensity: f32,
    pub ambient_color: [f32; 3],
    pub shininess: f32,
    pub camera_position: [f32; 3],
    pub opacity: f32,
}

impl PhongUniforms {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: Matrix4<f32>,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        light: &DirectionalLight,
        ambient: &AmbientLight,
        camera_position: Point3<f32>,
        shininess: f32,
        opacity: f32,
    ) -> Self {
        Self {
            model: model.into(),
            view: view.into(),
            projection: projection.into(),
            normal: normal_matrix(model),
            light_direction: light.direction.into(),
            light_intensity: light.intensity,
            light_color: light.color.into(),
            specular_intensity: light.specular_intensity,
            ambient_color: ambient.color.into(),
            shininess,
            camera_position: camera_position.to_vec().into(),
            opacity,
        }
    }
}

/// Source texture and surface dimensions for the aspect-preserving blit.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ScreenUniforms {
    pub texture_size: [f32; 2],
    pub surface_size: [f32; 2],
}

/// [`PhongUniforms`] extended with the wind animation and cloud shadow
/// parameters of the grass shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GrassUniforms {
    pub lit: PhongUniforms,
    pub wind_direction: [f32; 3],
    pub wind_scale: f32,
    pub cloud_white_color: [f32; 3],
    pub cloud_speed: f32,
    pub cloud_black_color: [f32; 3],
    pub cloud_lerp: f32,
    pub uv_scale: f32,
    pub brightness: f32,
    pub time: f32,
    pub phase_scale: f32,
    pub cloud_uv_scale: f32,
    pub _pad: [f32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;
    use std::mem::size_of;

    #[test]
    fn blocks_fill_whole_16_byte_slots() {
        assert_eq!(size_of::<BasicUniforms>() % 16, 0);
        assert_eq!(size_of::<DepthUniforms>() % 16, 0);
        assert_eq!(size_of::<PhongUniforms>() % 16, 0);
        assert_eq!(size_of::<ScreenUniforms>() % 16, 0);
        assert_eq!(size_of::<GrassUniforms>() % 16, 0);
    }

    #[test]
    fn lit_block_matches_shader_layout() {
        // 3 mat4 + padded mat3 + four (vec3, f32) slots.
        assert_eq!(size_of::<PhongUniforms>(), 3 * 64 + 48 + 4 * 16);
    }

    #[test]
    fn normal_matrix_counters_nonuniform_scale() {
        let model = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);
        let n = normal_matrix(model);
        assert!((n[0][0] - 0.5).abs() < 1e-6);
        assert!((n[1][1] - 1.0).abs() < 1e-6);
        assert!((n[2][2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normal_matrix_of_rotation_is_the_rotation() {
        let model = Matrix4::from_axis_angle(Vector3::unit_y(), cgmath::Deg(37.0));
        let n = normal_matrix(model);
        let expected = mat3_padded(Matrix3::from_axis_angle(Vector3::unit_y(), cgmath::Deg(37.0)));
        for (col, exp) in n.iter().zip(expected.iter()) {
            for (a, b) in col.iter().zip(exp.iter()) {
                assert!((a - b).abs() < 1e-5);
            }
        }
    }
}
