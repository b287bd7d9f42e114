//! Windowed application runner.
//!
//! A [`Stage`] builds the scene once the GPU is up and gets a tick per
//! frame; the [`App`] owns the window, the GPU [`Context`], the camera, and
//! the renderer, and drives everything from the winit event loop.

use std::sync::Arc;

use anyhow::Result;
use instant::{Duration, Instant};
use log::{error, warn};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::camera::{Camera, CameraController, Projection};
use crate::context::Context;
use crate::framebuffer::RenderTarget;
use crate::light::{AmbientLight, DirectionalLight};
use crate::renderer::Renderer;
use crate::scene::Node;

/// User hooks of a windowed application. Only [`init`](Stage::init) is
/// mandatory.
pub trait Stage {
    /// Build the scene. Called once, after the GPU device exists.
    fn init(&mut self, ctx: &Context) -> Result<Node>;

    /// Advance per-frame state before the scene is drawn.
    fn update(&mut self, _scene: &mut Node, _dt: Duration) {}

    /// Initial camera placement.
    fn camera(&self) -> Camera {
        Camera::new((0.0, 5.0, 10.0), cgmath::Deg(-90.0), cgmath::Deg(-20.0))
    }

    fn light(&self) -> DirectionalLight {
        DirectionalLight::default()
    }

    fn ambient(&self) -> AmbientLight {
        AmbientLight::default()
    }

    fn title(&self) -> &str {
        "meadow"
    }
}

struct AppState {
    ctx: Context,
    renderer: Renderer,
    scene: Node,
    camera: Camera,
    projection: Projection,
    controller: CameraController,
    light: DirectionalLight,
    ambient: AmbientLight,
    last_frame: Instant,
    mouse_pressed: bool,
}

pub struct App<S: Stage> {
    stage: S,
    state: Option<AppState>,
}

impl<S: Stage> App<S> {
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        let now = Instant::now();
        let dt = now - state.last_frame;
        state.last_frame = now;

        state.controller.update_camera(&mut state.camera, dt);
        self.stage.update(&mut state.scene, dt);

        let frame = match state.ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = state.ctx.window.inner_size();
                state.ctx.resize(size);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory");
                event_loop.exit();
                return;
            }
            Err(e) => {
                warn!("dropped frame: {e:?}");
                return;
            }
        };
        let color_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        state.renderer.render(
            &state.ctx.device,
            &state.ctx.queue,
            &state.scene,
            &state.camera,
            &state.projection,
            &state.light,
            &state.ambient,
            RenderTarget::Screen {
                color: &color_view,
                depth_stencil: &state.ctx.depth_texture.view,
            },
            state.ctx.size(),
        );
        frame.present();
        state.ctx.window.request_redraw();
    }
}

impl<S: Stage> ApplicationHandler for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let attributes = Window::default_attributes().with_title(self.stage.title());
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let ctx = match pollster::block_on(Context::new(window)) {
            Ok(ctx) => ctx,
            Err(e) => {
                error!("failed to initialize GPU: {e:#}");
                event_loop.exit();
                return;
            }
        };

        let mut renderer = Renderer::new(&ctx.device, ctx.config.format);
        renderer.set_clear_color(wgpu::Color {
            r: 0.1,
            g: 0.1,
            b: 0.1,
            a: 1.0,
        });
        let scene = match self.stage.init(&ctx) {
            Ok(scene) => scene,
            Err(e) => {
                error!("stage init failed: {e:#}");
                event_loop.exit();
                return;
            }
        };
        let projection =
            Projection::new(ctx.config.width, ctx.config.height, cgmath::Deg(45.0), 0.1, 500.0);

        ctx.window.request_redraw();
        self.state = Some(AppState {
            ctx,
            renderer,
            scene,
            camera: self.stage.camera(),
            projection,
            controller: CameraController::new(10.0, 0.4),
            light: self.stage.light(),
            ambient: self.stage.ambient(),
            last_frame: Instant::now(),
            mouse_pressed: false,
        });
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: key_state,
                        ..
                    },
                ..
            } => {
                if let Some(state) = self.state.as_mut() {
                    state.controller.process_keyboard(key, key_state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(state) = self.state.as_mut() {
                    state.controller.process_scroll(&delta);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state: button_state,
                ..
            } => {
                if let Some(state) = self.state.as_mut() {
                    state.mouse_pressed = button_state == ElementState::Pressed;
                }
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = self.state.as_mut() {
                    state.ctx.resize(size);
                    state.projection.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let Some(state) = self.state.as_mut() {
                if state.mouse_pressed {
                    state.controller.process_mouse(dx, dy);
                }
            }
        }
    }
}

/// Run a stage in a window until it is closed.
pub fn run<S: Stage>(stage: S) -> Result<()> {
    env_logger::init();
    let event_loop = EventLoop::new()?;
    let mut app = App { stage, state: None };
    event_loop.run_app(&mut app)?;
    Ok(())
}
