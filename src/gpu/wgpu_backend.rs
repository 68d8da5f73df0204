use std::collections::HashMap;

use anyhow::Context;
use image::RgbImage;
use tracing::{debug, info};

use super::{TextureBackend, TextureHandle};
use crate::error::{Error, Result};

/// Device-resident RGBA8 textures created through `wgpu`.
pub struct WgpuTextures {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: HashMap<u64, wgpu::Texture>,
    next_id: u64,
}

impl WgpuTextures {
    /// Acquire an adapter and device without a presentation surface.
    pub fn new_headless() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("request wgpu adapter")?;
        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("image-cache-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("request wgpu device")?;
        info!(adapter = ?adapter.get_info().name, "wgpu texture backend ready");
        Ok(Self::from_device(device, queue))
    }

    /// Share a device the render layer already owns.
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: HashMap::new(),
            next_id: 1,
        }
    }

    /// Texture behind `handle`, for building bind groups.
    pub fn texture(&self, handle: TextureHandle) -> Option<&wgpu::Texture> {
        self.textures.get(&handle.0)
    }
}

impl TextureBackend for WgpuTextures {
    fn allocate(&mut self, pixels: &RgbImage) -> Result<TextureHandle> {
        let (width, height) = pixels.dimensions();
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(Error::ResourceExhausted {
                width,
                height,
                reason: format!("texture size outside 1..={max}"),
            });
        }

        // wgpu has no packed RGB8 format
        let rgba: Vec<u8> = pixels
            .pixels()
            .flat_map(|p| [p[0], p[1], p[2], u8::MAX])
            .collect();

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cached-image"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            texture.as_image_copy(),
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            texture.destroy();
            return Err(Error::ResourceExhausted {
                width,
                height,
                reason: err.to_string(),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.textures.insert(id, texture);
        debug!(id, width, height, "texture uploaded");
        Ok(TextureHandle(id))
    }

    fn release(&mut self, handle: TextureHandle) {
        if let Some(texture) = self.textures.remove(&handle.0) {
            texture.destroy();
            debug!(id = handle.0, "texture released");
        }
    }
}
