use cgmath::{InnerSpace, Vector3};

/// A single directional light shared by every lit material in the frame.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    /// Direction the light travels, not the direction towards the light.
    pub direction: Vector3<f32>,
    pub color: Vector3<f32>,
    pub intensity: f32,
    pub specular_intensity: f32,
}

impl DirectionalLight {
    pub fn new(direction: Vector3<f32>) -> Self {
        Self {
            direction: direction.normalize(),
            ..Self::default()
        }
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vector3::new(-1.0, -1.0, -1.0).normalize(),
            color: Vector3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            specular_intensity: 0.1,
        }
    }
}

/// Flat ambient term added on top of the directional lighting.
#[derive(Debug, Clone, Copy)]
pub struct AmbientLight {
    pub color: Vector3<f32>,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Vector3::new(0.1, 0.1, 0.1),
        }
    }
}
