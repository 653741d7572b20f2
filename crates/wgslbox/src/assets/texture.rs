//! Texture decode and upload
//!
//! Static textures are decoded once and uploaded once. Dynamic textures
//! (video and camera frames) are created here too; the engine rewrites
//! their contents with [`write_rgba`] whenever a source produces a frame.

use crate::error::EngineError;

/// Creates a 2D RGBA8 texture that can receive uploads
pub fn create_rgba_texture(device: &wgpu::Device, width: u32, height: u32, label: &str) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

/// Uploads tightly packed RGBA8 pixels into a texture
pub fn write_rgba(queue: &wgpu::Queue, texture: &wgpu::Texture, width: u32, height: u32, pixels: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Decodes image bytes (PNG/JPEG/...) and uploads them as a texture
pub fn load_texture(device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8], path: &str) -> Result<wgpu::Texture, EngineError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| EngineError::ImageDecode {
            path: path.to_string(),
            message: e.to_string(),
        })?
        .to_rgba8();
    let (width, height) = image.dimensions();

    let texture = create_rgba_texture(device, width, height, path);
    write_rgba(queue, &texture, width, height, &image);
    Ok(texture)
}

/// Creates the engine sampler: nearest filter, clamp to edge
///
/// Pixel-art games sample their sprites through this; one instance serves
/// every texture in the game.
pub fn create_engine_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Engine Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
