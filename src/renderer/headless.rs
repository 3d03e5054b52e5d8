//! Offscreen rendering of a single GPU node to a PNG.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};

use super::dispatch::{RenderTarget, classify};
use super::marquee::MarqueeTrack;
use super::marquee::gpu::MarqueeCanvas;
use super::raymarch::RaymarchNode;
use super::raymarch::gpu::RaymarchCanvas;
use super::resources::{NullSink, ResourceSink};
use super::texture::{TextureLoader, TextureSources, apply_loaded};
use crate::scene::{RendererKind, SceneObject, ShapeKind};

/// Colour format of the offscreen target. Shader colours are already
/// display-encoded, so no sRGB conversion happens on write.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    pub width: u32,
    pub height: u32,
    /// Seconds since mount.
    pub time: f32,
    pub progress: f32,
    pub sources: TextureSources,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            time: 0.0,
            progress: 0.0,
            sources: TextureSources::default(),
        }
    }
}

/// A device without a surface.
pub struct HeadlessGpu {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl HeadlessGpu {
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| anyhow!("request_adapter failed: {e}"))?;
        tracing::debug!(adapter = %adapter.get_info().name, "headless adapter");
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("section-forge headless"),
            ..Default::default()
        }))
        .map_err(|e| anyhow!("request_device failed: {e}"))?;
        Ok(Self { device, queue })
    }
}

pub fn render_node_to_png(node: &SceneObject, options: &HeadlessOptions, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let gpu = HeadlessGpu::new()?;
    let image = render_node(&gpu, node, options, Arc::new(NullSink))?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(node = %node.id, path = %path.display(), "rendered node");
    Ok(())
}

/// Renders `node` once at `options.time` and returns straight-alpha pixels.
pub fn render_node(
    gpu: &HeadlessGpu,
    node: &SceneObject,
    options: &HeadlessOptions,
    sink: Arc<dyn ResourceSink>,
) -> Result<image::RgbaImage> {
    if options.width == 0 || options.height == 0 {
        bail!("offscreen size must be non-zero, got {}x{}", options.width, options.height);
    }
    let target = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("sys.headless.target"),
        size: wgpu::Extent3d {
            width: options.width,
            height: options.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let (w, h) = (options.width as f32, options.height as f32);
    let mut loader = TextureLoader::new(options.sources.clone());

    match &node.kind {
        ShapeKind::List(list) if list.render_policy.renderer == RendererKind::Webgl => {
            let mut track = MarqueeTrack::new(node, sink.clone())?;
            track.resize(w, h);
            for url in track.texture_urls() {
                loader.request(url);
            }
            track.apply_textures(loader.wait_all());
            let instances = track.tick(options.time.max(0.0)).unwrap_or_default();
            let mut canvas = MarqueeCanvas::new(&gpu.device, &track, TARGET_FORMAT, sink)?;
            canvas.sync_textures(&gpu.queue, &track);
            canvas.render(&gpu.device, &gpu.queue, &view, &track, &instances);
        }
        kind if classify(kind) == RenderTarget::Gpu => {
            let mut raymarch = RaymarchNode::new(node, sink.clone())?;
            raymarch.resize(w, h);
            if let Some(url) = raymarch.texture().map(|slot| slot.url.clone()) {
                loader.request(&url);
                let loaded = loader.wait_all();
                if let Some(slot) = raymarch.texture_slot_mut() {
                    apply_loaded(&mut [slot], loaded);
                }
                raymarch.texture_changed();
            }
            let uniforms = raymarch.uniforms_at(options.time, options.progress);
            let mut canvas = RaymarchCanvas::new(&gpu.device, &gpu.queue, &raymarch, TARGET_FORMAT, sink)?;
            canvas.sync_texture(&gpu.device, &gpu.queue, &raymarch);
            canvas.render(&gpu.device, &gpu.queue, &view, &uniforms);
        }
        _ => bail!("node '{}' ({}) is drawn by the DOM renderer", node.id, node.shape_name()),
    }

    let mut pixels = read_texture(gpu, &target, options.width, options.height)?;
    unpremultiply(&mut pixels);
    image::RgbaImage::from_raw(options.width, options.height, pixels)
        .ok_or_else(|| anyhow!("readback size does not match {}x{}", options.width, options.height))
}

/// Bytes per row rounded up to the copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drops the row padding of a texture readback.
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_bpr: u32) -> Vec<u8> {
    let row = (width * 4) as usize;
    let mut out = Vec::with_capacity(row * height as usize);
    for chunk in data.chunks(padded_bpr as usize).take(height as usize) {
        out.extend_from_slice(&chunk[..row.min(chunk.len())]);
    }
    out
}

/// Converts premultiplied RGBA8 to straight alpha in place.
pub fn unpremultiply(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u32 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

fn read_texture(gpu: &HeadlessGpu, texture: &wgpu::Texture, width: u32, height: u32) -> Result<Vec<u8>> {
    let padded_bpr = padded_bytes_per_row(width);
    let size = padded_bpr as u64 * height as u64;
    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sys.headless.readback"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("sys.headless.copy"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(0..size);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    let mut mapped = None;
    for _ in 0..200 {
        let _ = gpu.device.poll(wgpu::PollType::Poll);
        if let Ok(result) = rx.try_recv() {
            mapped = Some(result);
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    match mapped {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            buffer.unmap();
            bail!("readback map failed: {e}");
        }
        None => {
            buffer.unmap();
            bail!("readback timed out");
        }
    }

    let view = slice.get_mapped_range();
    let pixels = unpad_rows(&view, width, height, padded_bpr);
    drop(view);
    buffer.unmap();
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_the_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn unpad_keeps_only_visible_bytes() {
        let mut data = vec![0u8; 256 * 2];
        data[..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data[256..264].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);
        let out = unpad_rows(&data, 2, 2, 256);
        assert_eq!(out, (1..=16).collect::<Vec<u8>>());
    }

    #[test]
    fn unpremultiply_restores_straight_colour() {
        let mut px = vec![64, 32, 0, 128, 10, 10, 10, 0, 255, 255, 255, 255];
        unpremultiply(&mut px);
        assert_eq!(&px[0..4], &[128, 64, 0, 128]);
        assert_eq!(&px[4..8], &[0, 0, 0, 0]);
        assert_eq!(&px[8..12], &[255, 255, 255, 255]);
    }
}
