//! GPU textures for panel images.
//!
//! [`Texture`] wraps the wgpu texture, its view and sampler. The rest of the
//! crate only talks to textures through the [`GpuTexture`] trait so that the
//! cache and the disposal logic do not need a live device.

use anyhow::*;

/// The part of a GPU texture the cache and the disposal manager need.
pub trait GpuTexture: std::fmt::Debug {
    /// Dimensions in pixels.
    fn size(&self) -> (u32, u32);

    /// Release the GPU memory. Must tolerate being called more than once.
    fn destroy(&self);
}

/// A GPU texture with a view and sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Upload an already decoded and oriented image.
    ///
    /// # Arguments
    ///
    /// * `img` is the RGBA8 pixel data, rows top to bottom
    /// * `label` is used as a debug label for the GPU resource
    /// * `srgb` tags the data as sRGB colour (photos) instead of linear data
    ///
    /// Panels are flat and seen roughly head-on, so only one mip level is
    /// allocated and sampling never touches mip chains.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::RgbaImage,
        label: Option<&str>,
        srgb: bool,
    ) -> Result<Self> {
        let dimensions = img.dimensions();
        if dimensions.0 == 0 || dimensions.1 == 0 {
            bail!("cannot upload an empty image ({:?})", label);
        }

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
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
            img.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

impl GpuTexture for Texture {
    fn size(&self) -> (u32, u32) {
        let extent = self.texture.size();
        (extent.width, extent.height)
    }

    fn destroy(&self) {
        self.texture.destroy();
    }
}
