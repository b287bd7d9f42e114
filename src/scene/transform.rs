//! Local/world transforms and per-instance GPU data.
//!
//! A [`Transform`] is a position + rotation + scale triple. Scene nodes store
//! one as their local transform; world transforms are products of transforms
//! composed root-to-leaf during traversal. Instanced meshes additionally pack
//! their per-instance world matrices into [`InstanceRaw`] vertex data.

use std::ops::Mul;

use cgmath::{InnerSpace, One, SquareMatrix};

use crate::geometry::VertexLayout;

/// A decomposed affine transform: position, rotation (quaternion), scale.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Transform {
    /// The identity transform: no translation, rotation or scaling.
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_position(position: cgmath::Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Recover position, rotation and scale from an affine matrix.
    ///
    /// Assumes the matrix is a translation * rotation * scale product with no
    /// shear or projection. Scale signs are not recovered (a matrix with an
    /// odd number of negative scale axes decomposes to an equivalent
    /// rotation and positive scale).
    pub fn decompose(matrix: cgmath::Matrix4<f32>) -> Self {
        let position = matrix.w.truncate();

        let x = matrix.x.truncate();
        let y = matrix.y.truncate();
        let z = matrix.z.truncate();
        let scale = cgmath::Vector3::new(x.magnitude(), y.magnitude(), z.magnitude());

        let rotation_matrix = cgmath::Matrix3::from_cols(
            x / scale.x.max(f32::EPSILON),
            y / scale.y.max(f32::EPSILON),
            z / scale.z.max(f32::EPSILON),
        );
        let rotation = cgmath::Quaternion::from(rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }
}

impl Mul<Transform> for Transform {
    type Output = Self;

    fn mul(self, rhs: Transform) -> Self::Output {
        &self * &rhs
    }
}

impl<'a, 'b> Mul<&'b Transform> for &'a Transform {
    type Output = Transform;

    fn mul(self, rhs: &'b Transform) -> Self::Output {
        let rotation = self.rotation * rhs.rotation;

        let scale = cgmath::Vector3::new(
            self.scale.x * rhs.scale.x,
            self.scale.y * rhs.scale.y,
            self.scale.z * rhs.scale.z,
        );
        let scaled_rhs_pos = cgmath::Vector3::new(
            self.scale.x * rhs.position.x,
            self.scale.y * rhs.position.y,
            self.scale.z * rhs.position.z,
        );
        let position = self.position + (self.rotation * scaled_rhs_pos);

        Transform {
            position,
            rotation,
            scale,
        }
    }
}

impl From<cgmath::Vector3<f32>> for Transform {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Self::from_position(position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * Per-instance data as stored in the GPU instance buffer: one world matrix
 * per instance, consumed by the instanced material shaders.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl From<cgmath::Matrix4<f32>> for InstanceRaw {
    fn from(matrix: cgmath::Matrix4<f32>) -> Self {
        Self {
            model: matrix.into(),
        }
    }
}

impl InstanceRaw {
    pub fn identity() -> Self {
        cgmath::Matrix4::identity().into()
    }
}

/**
 * A mat4 takes four vertex slots (four vec4 columns), so the instance buffer
 * layout declares one attribute per column. Locations 0..4 belong to the
 * mesh vertex layout; instance attributes start at 5.
 */
impl VertexLayout for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cgmath::{Deg, Matrix4, Quaternion, Rotation3, Vector3};

    #[test]
    fn composition_matches_matrix_product() {
        let a = Transform {
            position: Vector3::new(1.0, 2.0, 3.0),
            rotation: Quaternion::from_angle_y(Deg(90.0)),
            scale: Vector3::new(2.0, 2.0, 2.0),
        };
        let b = Transform {
            position: Vector3::new(-1.0, 0.5, 4.0),
            rotation: Quaternion::from_angle_x(Deg(45.0)),
            scale: Vector3::new(1.0, 3.0, 1.0),
        };

        let composed = (&a * &b).to_matrix();
        let product = a.to_matrix() * b.to_matrix();

        let composed: [[f32; 4]; 4] = composed.into();
        let product: [[f32; 4]; 4] = product.into();
        for (lhs, rhs) in composed.iter().flatten().zip(product.iter().flatten()) {
            assert_relative_eq!(lhs, rhs, epsilon = 1e-4);
        }
    }

    #[test]
    fn decompose_roundtrips() {
        let original = Transform {
            position: Vector3::new(4.0, -2.0, 9.5),
            rotation: Quaternion::from_angle_z(Deg(30.0)),
            scale: Vector3::new(0.5, 2.0, 1.5),
        };

        let recovered = Transform::decompose(original.to_matrix());

        assert_relative_eq!(recovered.position.x, original.position.x, epsilon = 1e-5);
        assert_relative_eq!(recovered.position.y, original.position.y, epsilon = 1e-5);
        assert_relative_eq!(recovered.position.z, original.position.z, epsilon = 1e-5);
        assert_relative_eq!(recovered.scale.x, original.scale.x, epsilon = 1e-4);
        assert_relative_eq!(recovered.scale.y, original.scale.y, epsilon = 1e-4);
        assert_relative_eq!(recovered.scale.z, original.scale.z, epsilon = 1e-4);
        // Quaternions are equal up to sign.
        let dot = original.rotation.s * recovered.rotation.s
            + original.rotation.v.x * recovered.rotation.v.x
            + original.rotation.v.y * recovered.rotation.v.y
            + original.rotation.v.z * recovered.rotation.v.z;
        assert_relative_eq!(dot.abs(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn identity_is_neutral() {
        let t = Transform {
            position: Vector3::new(1.0, 1.0, 1.0),
            rotation: Quaternion::from_angle_y(Deg(15.0)),
            scale: Vector3::new(3.0, 1.0, 1.0),
        };
        let id = Transform::new();
        let composed = (&id * &t).to_matrix();
        let expected: Matrix4<f32> = t.to_matrix();
        let composed: [[f32; 4]; 4] = composed.into();
        let expected: [[f32; 4]; 4] = expected.into();
        assert_eq!(composed, expected);
    }
}
