//! Mesh geometry: CPU-side vertex/index data and lazily created GPU buffers.
//!
//! A [`Geometry`] is immutable after creation. The wgpu buffers are created
//! on first use so scenes can be built and inspected without a device (all
//! draw-list tests run headless). Procedural constructors cover the shapes
//! the demos need: planes, cuboids, spheres and a fullscreen quad.

use std::cell::{Ref, RefCell};
use std::f32::consts::PI;

use wgpu::util::DeviceExt;

/// Vertex buffer layout provider for anything stored per-vertex or
/// per-instance.
pub trait VertexLayout {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl VertexLayout for Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

pub(crate) struct GpuGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
}

/// Immutable vertex/index data shared between drawables via `Rc`.
pub struct Geometry {
    name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    gpu: RefCell<Option<GpuGeometry>>,
}

impl Geometry {
    pub fn new(name: impl Into<String>, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
            gpu: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Vertex/index buffers for this geometry, created on first call.
    pub(crate) fn gpu(&self, device: &wgpu::Device) -> Ref<'_, GpuGeometry> {
        if self.gpu.borrow().is_none() {
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", self.name)),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", self.name)),
                contents: bytemuck::cast_slice(&self.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            *self.gpu.borrow_mut() = Some(GpuGeometry {
                vertex_buffer,
                index_buffer,
            });
        }
        Ref::map(self.gpu.borrow(), |gpu| {
            gpu.as_ref().expect("buffers created above")
        })
    }

    /// A quad in the XY plane facing +Z, centered on the origin.
    pub fn plane(width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        let vertices = vec![
            Vertex {
                position: [-hw, -hh, 0.0],
                tex_coords: [0.0, 1.0],
                normal: [0.0, 0.0, 1.0],
            },
            Vertex {
                position: [hw, -hh, 0.0],
                tex_coords: [1.0, 1.0],
                normal: [0.0, 0.0, 1.0],
            },
            Vertex {
                position: [hw, hh, 0.0],
                tex_coords: [1.0, 0.0],
                normal: [0.0, 0.0, 1.0],
            },
            Vertex {
                position: [-hw, hh, 0.0],
                tex_coords: [0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
            },
        ];
        let indices = vec![0, 1, 2, 2, 3, 0];
        Self::new("plane", vertices, indices)
    }

    /// An axis-aligned cuboid centered on the origin, one quad per face.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        let hd = depth / 2.0;

        // (normal, tangent-u, tangent-v) per face
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ];
        let half = [hw, hh, hd];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let base = vertices.len() as u32;
            for (du, dv, tex) in [
                (-1.0, -1.0, [0.0, 1.0]),
                (1.0, -1.0, [1.0, 1.0]),
                (1.0, 1.0, [1.0, 0.0]),
                (-1.0, 1.0, [0.0, 0.0]),
            ] {
                let position = [
                    (normal[0] + u[0] * du + v[0] * dv) * half[0],
                    (normal[1] + u[1] * du + v[1] * dv) * half[1],
                    (normal[2] + u[2] * du + v[2] * dv) * half[2],
                ];
                vertices.push(Vertex {
                    position,
                    tex_coords: tex,
                    normal,
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        Self::new("cuboid", vertices, indices)
    }

    /// A UV sphere centered on the origin.
    pub fn sphere(radius: f32, lat_segments: u32, lon_segments: u32) -> Self {
        let lat_segments = lat_segments.max(2);
        let lon_segments = lon_segments.max(3);

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for lat in 0..=lat_segments {
            let theta = lat as f32 / lat_segments as f32 * PI;
            let (sin_t, cos_t) = theta.sin_cos();
            for lon in 0..=lon_segments {
                let phi = lon as f32 / lon_segments as f32 * 2.0 * PI;
                let (sin_p, cos_p) = phi.sin_cos();

                let normal = [sin_t * cos_p, cos_t, sin_t * sin_p];
                vertices.push(Vertex {
                    position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                    tex_coords: [
                        lon as f32 / lon_segments as f32,
                        lat as f32 / lat_segments as f32,
                    ],
                    normal,
                });
            }
        }
        let stride = lon_segments + 1;
        for lat in 0..lat_segments {
            for lon in 0..lon_segments {
                let a = lat * stride + lon;
                let b = a + stride;
                indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        Self::new("sphere", vertices, indices)
    }

    /// A quad spanning the whole clip space, for screen-space materials.
    pub fn screen_quad() -> Self {
        let vertices = vec![
            Vertex {
                position: [-1.0, -1.0, 0.0],
                tex_coords: [0.0, 1.0],
                normal: [0.0, 0.0, 1.0],
            },
            Vertex {
                position: [1.0, -1.0, 0.0],
                tex_coords: [1.0, 1.0],
                normal: [0.0, 0.0, 1.0],
            },
            Vertex {
                position: [1.0, 1.0, 0.0],
                tex_coords: [1.0, 0.0],
                normal: [0.0, 0.0, 1.0],
            },
            Vertex {
                position: [-1.0, 1.0, 0.0],
                tex_coords: [0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
            },
        ];
        let indices = vec![0, 1, 2, 2, 3, 0];
        Self::new("screen quad", vertices, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_has_one_quad_per_face() {
        let geo = Geometry::cuboid(2.0, 2.0, 2.0);
        assert_eq!(geo.vertices().len(), 24);
        assert_eq!(geo.index_count(), 36);
    }

    #[test]
    fn sphere_poles_sit_on_radius() {
        let geo = Geometry::sphere(3.0, 8, 12);
        for v in geo.vertices() {
            let len = (v.position[0].powi(2) + v.position[1].powi(2) + v.position[2].powi(2))
                .sqrt();
            assert!((len - 3.0).abs() < 1e-4, "vertex off the sphere: {len}");
        }
    }

    #[test]
    fn indices_stay_in_bounds() {
        for geo in [
            Geometry::plane(1.0, 1.0),
            Geometry::cuboid(1.0, 2.0, 3.0),
            Geometry::sphere(1.0, 6, 6),
            Geometry::screen_quad(),
        ] {
            let max = geo.vertices().len() as u32;
            assert!(geo.indices().iter().all(|&i| i < max));
            assert_eq!(geo.index_count() % 3, 0);
        }
    }
}
