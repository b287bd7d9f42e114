//! A grass meadow: an instanced field of wind-blown blades around a small
//! cabin, under a camera-following sky sphere. All textures are generated
//! in memory so the demo runs without any asset files.

use std::rc::Rc;

use anyhow::Result;
use cgmath::{Deg, Matrix4, Quaternion, Rotation3, Vector3};
use meadow::app::Stage;
use meadow::material::{GrassParams, Material};
use meadow::scene::{Node, Transform};
use meadow::{AmbientLight, Camera, Context, DirectionalLight, Geometry, Texture};

const ROWS: u32 = 60;
const COLS: u32 = 60;
const SPACING: f32 = 0.2;

/// Deterministic pseudo-random stream, enough for blade placement.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }
}

fn checker_texture(ctx: &Context, size: u32, a: [u8; 4], b: [u8; 4]) -> Rc<Texture> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let cell = (x / 8 + y / 8) % 2 == 0;
            pixels.extend_from_slice(if cell { &a } else { &b });
        }
    }
    Rc::new(Texture::from_rgba_memory(
        &ctx.device,
        &ctx.queue,
        &pixels,
        size,
        size,
        "checker",
    ))
}

/// A tapered blade silhouette in the red channel.
fn blade_mask_texture(ctx: &Context) -> Rc<Texture> {
    let (w, h) = (32u32, 64u32);
    let mut pixels = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        // Wide at the root (bottom row), narrow at the tip.
        let half_width = 2.0 + 12.0 * y as f32 / h as f32;
        for x in 0..w {
            let dx = (x as f32 - w as f32 / 2.0).abs();
            let v = if dx < half_width { 255 } else { 0 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    Rc::new(Texture::from_rgba_memory(
        &ctx.device, &ctx.queue, &pixels, w, h, "blade mask",
    ))
}

/// Soft blobs for the drifting cloud shadows.
fn cloud_texture(ctx: &Context) -> Rc<Texture> {
    let size = 64u32;
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let u = x as f32 / size as f32 * std::f32::consts::TAU;
            let v = y as f32 / size as f32 * std::f32::consts::TAU;
            let value = 0.5 + 0.25 * (u * 2.0).sin() + 0.25 * (v * 3.0).cos();
            let byte = (value.clamp(0.0, 1.0) * 255.0) as u8;
            pixels.extend_from_slice(&[byte, byte, byte, 255]);
        }
    }
    Rc::new(Texture::from_rgba_memory(
        &ctx.device, &ctx.queue, &pixels, size, size, "cloud",
    ))
}

/// Vertical dusk gradient for the sky sphere.
fn sky_texture(ctx: &Context) -> Rc<Texture> {
    let (w, h) = (4u32, 128u32);
    let mut pixels = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        let t = y as f32 / (h - 1) as f32;
        let r = (40.0 + 160.0 * t) as u8;
        let g = (80.0 + 140.0 * t) as u8;
        let b = (160.0 + 80.0 * t) as u8;
        for _ in 0..w {
            pixels.extend_from_slice(&[r, g, b, 255]);
        }
    }
    Rc::new(Texture::from_rgba_memory(
        &ctx.device, &ctx.queue, &pixels, w, h, "sky",
    ))
}

#[derive(Default)]
struct Meadow;

impl Stage for Meadow {
    fn init(&mut self, ctx: &Context) -> Result<Node> {
        let mut scene = Node::group();

        // Sky sphere, drawn around whatever position the camera has.
        let sky = Node::mesh(
            Rc::new(Geometry::sphere(1.0, 32, 48)),
            Material::cube_env(sky_texture(ctx)).shared(),
        );
        scene.add_child(sky);

        // Ground plane under the field.
        let extent = ROWS as f32 * SPACING;
        let ground = Node::mesh(
            Rc::new(Geometry::plane(extent * 2.0, extent * 2.0)),
            Material::phong(checker_texture(
                ctx,
                64,
                [60, 110, 45, 255],
                [50, 95, 40, 255],
            ))
            .shared(),
        )
        .with_local(Transform {
            position: Vector3::new(extent / 2.0, 0.0, extent / 2.0),
            rotation: Quaternion::from_angle_x(Deg(-90.0)),
            scale: Vector3::new(1.0, 1.0, 1.0),
        });
        scene.add_child(ground);

        // The grass field: one blade quad, rows x cols instances, each on
        // its grid cell with a random heading.
        let mut params = GrassParams::new(
            checker_texture(ctx, 16, [90, 170, 60, 255], [70, 150, 50, 255]),
            blade_mask_texture(ctx),
            cloud_texture(ctx),
        );
        params.wind_direction = Vector3::new(1.0, 0.0, 0.3);
        let mut grass_material = Material::grass_instanced(params);
        grass_material.set_transparent(1.0);

        let grass = Node::instanced(
            Rc::new(Geometry::plane(0.15, 0.5)),
            grass_material.shared(),
            (ROWS * COLS) as usize,
        );
        let field = grass.as_instanced().expect("just built as instanced");
        let mut rng = Lcg(0x5eed);
        let mut matrices = Vec::with_capacity((ROWS * COLS) as usize);
        for r in 0..ROWS {
            for c in 0..COLS {
                let translate = Matrix4::from_translation(Vector3::new(
                    SPACING * r as f32,
                    0.25,
                    SPACING * c as f32,
                ));
                let rotate =
                    Matrix4::from_angle_y(Deg(rng.next_f32() * 90.0));
                matrices.push(translate * rotate);
            }
        }
        field.set_matrices(matrices);
        scene.add_child(grass);

        // A small cabin in the middle of the field.
        let cabin = Node::mesh(
            Rc::new(Geometry::cuboid(1.5, 1.0, 1.2)),
            Material::phong(checker_texture(
                ctx,
                32,
                [150, 100, 60, 255],
                [120, 80, 50, 255],
            ))
            .shared(),
        )
        .with_local(Transform::from_position(Vector3::new(
            extent / 2.0,
            0.5,
            extent / 2.0,
        )));
        scene.add_child(cabin);

        Ok(scene)
    }

    fn camera(&self) -> Camera {
        Camera::new(
            (ROWS as f32 * SPACING / 2.0, 2.0, COLS as f32 * SPACING + 4.0),
            Deg(-90.0),
            Deg(-10.0),
        )
    }

    fn light(&self) -> DirectionalLight {
        let mut light = DirectionalLight::new(Vector3::new(-1.0, -1.0, -1.0));
        light.specular_intensity = 0.1;
        light
    }

    fn ambient(&self) -> AmbientLight {
        AmbientLight {
            color: Vector3::new(0.1, 0.1, 0.1),
        }
    }

    fn title(&self) -> &str {
        "meadow - grass"
    }
}

fn main() -> Result<()> {
    meadow::run(Meadow)
}
