//! Offscreen render targets.

use log::warn;

use crate::texture::Texture;

/// An offscreen color + depth-stencil attachment pair. The color texture can
/// be sampled afterwards, e.g. by a screen material blitting it to the
/// swapchain.
pub struct Framebuffer {
    pub color: Texture,
    pub depth_stencil: Texture,
}

impl Framebuffer {
    pub fn new(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let color = Texture::create_color_attachment(device, size, format, label);
        let depth_stencil =
            Texture::create_depth_texture(device, size, &format!("{label} depth"));
        Self {
            color,
            depth_stencil,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        [self.color.width, self.color.height]
    }
}

/// Where a frame ends up: the window's swapchain or an offscreen framebuffer.
pub enum RenderTarget<'a> {
    Screen {
        color: &'a wgpu::TextureView,
        depth_stencil: &'a wgpu::TextureView,
    },
    Offscreen(&'a Framebuffer),
}

impl<'a> RenderTarget<'a> {
    pub(crate) fn views(&self) -> (&wgpu::TextureView, &wgpu::TextureView) {
        match self {
            RenderTarget::Screen {
                color,
                depth_stencil,
            } => (color, depth_stencil),
            RenderTarget::Offscreen(fb) => {
                if fb.color.width != fb.depth_stencil.width
                    || fb.color.height != fb.depth_stencil.height
                {
                    warn!(
                        "framebuffer attachments disagree on size: color {}x{}, depth {}x{}",
                        fb.color.width, fb.color.height, fb.depth_stencil.width,
                        fb.depth_stencil.height
                    );
                }
                (&fb.color.view, &fb.depth_stencil.view)
            }
        }
    }
}
