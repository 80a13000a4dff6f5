//! Panel textures: decoding, orientation fix-up, upload and the path-keyed cache.

use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::data_structures::texture::{GpuTexture, Texture};

/// How a panel image is prepared before upload.
///
/// The defaults match glTF assets: UV origin top-left (no vertical flip),
/// colour data in sRGB, a single mip level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureOptions {
    /// Mirror horizontally, for faces whose UVs run right to left.
    pub flip_x: bool,
    /// Flip vertically, for assets authored with a bottom-left UV origin.
    pub flip_y: bool,
    pub srgb: bool,
    pub mipmaps: bool,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            flip_x: false,
            flip_y: false,
            srgb: true,
            mipmaps: false,
        }
    }
}

impl TextureOptions {
    /// Decode `bytes` and apply the configured mirroring.
    pub fn prepare(&self, bytes: &[u8], label: &str) -> anyhow::Result<image::RgbaImage> {
        let mut rgba = image::load_from_memory(bytes)
            .with_context(|| format!("could not decode image {label}"))?
            .to_rgba8();
        if self.flip_x {
            image::imageops::flip_horizontal_in_place(&mut rgba);
        }
        if self.flip_y {
            image::imageops::flip_vertical_in_place(&mut rgba);
        }
        Ok(rgba)
    }
}

/// Turns decoded images into GPU textures.
pub trait TextureUploader {
    fn upload(
        &self,
        label: &str,
        image: &image::RgbaImage,
        options: &TextureOptions,
    ) -> anyhow::Result<Box<dyn GpuTexture>>;
}

/// The uploader used with a real device. `wgpu::Device` and `wgpu::Queue` are
/// cheap handles, so the uploader keeps its own clones.
pub struct WgpuTextureUploader {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuTextureUploader {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        Self {
            device: device.clone(),
            queue: queue.clone(),
        }
    }
}

impl TextureUploader for WgpuTextureUploader {
    fn upload(
        &self,
        label: &str,
        image: &image::RgbaImage,
        options: &TextureOptions,
    ) -> anyhow::Result<Box<dyn GpuTexture>> {
        if options.mipmaps {
            log::warn!(
                "Mip chains are not generated for panel textures, uploading {label} with one level."
            );
        }
        let texture =
            Texture::from_image(&self.device, &self.queue, image, Some(label), options.srgb)?;
        Ok(Box::new(texture))
    }
}

/// A texture owned by a [`TextureCache`].
pub struct CachedTexture {
    id: u64,
    path: String,
    size: (u32, u32),
    gpu: RefCell<Option<Box<dyn GpuTexture>>>,
}

impl CachedTexture {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn is_disposed(&self) -> bool {
        self.gpu.borrow().is_none()
    }

    /// Run `f` against the GPU texture, if it has not been released yet.
    pub fn with_gpu<R>(&self, f: impl FnOnce(&dyn GpuTexture) -> R) -> Option<R> {
        self.gpu.borrow().as_deref().map(f)
    }

    fn dispose(&self) -> bool {
        match self.gpu.borrow_mut().take() {
            Some(gpu) => {
                gpu.destroy();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CachedTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedTexture")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("size", &self.size)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Shared, cheap-to-clone reference to a cached texture.
pub type TextureHandle = Rc<CachedTexture>;

/**
 * Path-keyed texture store. Entries are only ever added during normal
 * operation; [`TextureCache::dispose_all`] releases all of them at once when
 * the whole carousel feature shuts down.
 */
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: HashMap<String, TextureHandle>,
    next_id: u64,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<TextureHandle> {
        self.entries.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store a freshly uploaded texture. An existing entry for `path` wins and
    /// the new upload is released immediately.
    pub fn insert(&mut self, path: &str, gpu: Box<dyn GpuTexture>) -> TextureHandle {
        if let Some(existing) = self.entries.get(path) {
            log::warn!("Texture {path} was uploaded twice, keeping the first upload.");
            gpu.destroy();
            return existing.clone();
        }
        let handle = Rc::new(CachedTexture {
            id: self.next_id,
            path: path.to_string(),
            size: gpu.size(),
            gpu: RefCell::new(Some(gpu)),
        });
        self.next_id += 1;
        self.entries.insert(path.to_string(), handle.clone());
        handle
    }

    /// Release every cached texture and empty the cache. Returns how many GPU
    /// textures were destroyed.
    pub fn dispose_all(&mut self) -> usize {
        self.entries
            .drain()
            .filter(|(_, handle)| handle.dispose())
            .count()
    }
}
