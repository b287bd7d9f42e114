//! GPU textures, samplers, and the path-keyed texture cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use image::GenericImageView;
use log::debug;

/// A GPU texture with its view and sampler, plus the pixel dimensions the
/// screen material needs for aspect-correct blitting.
#[derive(Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Combined depth-stencil format used for every depth attachment. The
    /// stencil aspect is required because materials may carry stencil state.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

    /// Create a depth-stencil attachment texture.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let width = size[0].max(1);
        let height = size[1].max(1);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_default_sampler(device);

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Create an offscreen color attachment that can also be sampled, for
    /// render-to-texture targets.
    pub fn create_color_attachment(
        device: &wgpu::Device,
        size: [u32; 2],
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        let width = size[0].max(1);
        let height = size[1].max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_default_sampler(device);

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Load a texture from raw image file contents (PNG, JPEG, ...).
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
    ) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::from_image(device, queue, &img, Some(label)))
    }

    /// Upload raw RGBA8 pixels already in memory, for procedurally built
    /// textures that never touch an image decoder.
    pub fn from_rgba_memory(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &[u8],
        width: u32,
        height: u32,
        label: &str,
    ) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        let texture = upload_rgba(device, queue, pixels, width, height, Some(label));
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_default_sampler(device);
        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// A 1x1 texture of a single color, the stand-in when no map is wanted.
    pub fn from_pixel(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: [u8; 4],
        label: &str,
    ) -> Self {
        Self::from_rgba_memory(device, queue, &rgba, 1, 1, label)
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
    ) -> Self {
        let (width, height) = img.dimensions();
        let rgba = img.to_rgba8();
        let texture = upload_rgba(device, queue, &rgba, width, height, label);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_default_sampler(device);

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }
}

fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    rgba: &[u8],
    width: u32,
    height: u32,
    label: Option<&str>,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label,
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    texture
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Shares loaded resources by path. Repeated requests for the same path
/// return clones of one `Rc`, so the loader runs at most once per path and
/// a failed load caches nothing.
pub struct ResourceCache<T> {
    entries: HashMap<PathBuf, Rc<T>>,
}

impl<T> Default for ResourceCache<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ResourceCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entry for `path`, or build one with `load` and
    /// cache it.
    pub fn get_or_load(
        &mut self,
        path: impl AsRef<Path>,
        load: impl FnOnce(&Path) -> Result<T>,
    ) -> Result<Rc<T>> {
        let path = path.as_ref();
        if let Some(entry) = self.entries.get(path) {
            return Ok(Rc::clone(entry));
        }
        let entry = Rc::new(load(path)?);
        self.entries.insert(path.to_path_buf(), Rc::clone(&entry));
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loads image files from disk and shares the resulting GPU textures by
/// path, so two materials asking for the same file get the same texture.
pub type TextureCache = ResourceCache<Texture>;

impl ResourceCache<Texture> {
    pub fn load(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: impl AsRef<Path>,
    ) -> Result<Rc<Texture>> {
        self.get_or_load(path, |path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read texture file {}", path.display()))?;
            let label = path.to_string_lossy();
            let texture = Texture::from_bytes(device, queue, &bytes, &label)?;
            debug!("loaded texture {} ({}x{})", label, texture.width, texture.height);
            Ok(texture)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_shares_one_entry() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        let mut loads = 0;
        let first = cache
            .get_or_load("grass.png", |_| {
                loads += 1;
                Ok(7)
            })
            .unwrap();
        let second = cache
            .get_or_load("grass.png", |_| {
                loads += 1;
                Ok(9)
            })
            .unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(loads, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_paths_load_separately() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        let first = cache.get_or_load("grass.png", |_| Ok(1)).unwrap();
        let second = cache.get_or_load("sky.png", |_| Ok(2)).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failed_loads_cache_nothing() {
        let mut cache: ResourceCache<u32> = ResourceCache::new();
        let result = cache.get_or_load("missing.png", |path| {
            anyhow::bail!("no such file {}", path.display())
        });
        assert!(result.is_err());
        assert!(cache.is_empty());

        let recovered = cache.get_or_load("missing.png", |_| Ok(3)).unwrap();
        assert_eq!(*recovered, 3);
        assert_eq!(cache.len(), 1);
    }
}
