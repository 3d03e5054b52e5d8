use std::sync::Arc;

use anyhow::{Result, bail};
use bytemuck::{Pod, Zeroable};

use super::MarqueeTrack;
use super::state::{MarqueeInstance, TrackStyle};
use super::wgsl::MARQUEE_WGSL;
use crate::color::Rgba;
use crate::renderer::raymarch::texture_fit::fit_uv;
use crate::renderer::resources::{ContextLease, ResourceSink};
use crate::renderer::texture::DecodedImage;
use crate::renderer::validation::validate_wgsl_with_context;
use crate::scene::ImageFit;

/// Width of every texture-array layer; height follows the item aspect.
pub const LAYER_WIDTH: u32 = 256;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct TrackUniforms {
    pub resolution: [f32; 4],
    pub border_color: [f32; 4],
    pub fill: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub rect: [f32; 4],
    pub radii: [f32; 4],
    /// scale, grayscale, border width, layer (-1 when the image is not ready)
    pub style: [f32; 4],
}

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4, 2 => Float32x4];

const IDLE_FILL: Rgba = Rgba::new(0.16, 0.17, 0.22, 1.0);

pub fn instance_raw(inst: &MarqueeInstance, style: &TrackStyle, layer: Option<u32>) -> InstanceRaw {
    InstanceRaw {
        rect: inst.rect,
        radii: style.radii.to_array(),
        style: [
            inst.scale,
            inst.grayscale,
            style.border_width,
            layer.map_or(-1.0, |l| l as f32),
        ],
    }
}

pub fn layer_size(style: &TrackStyle) -> [u32; 2] {
    let h = (LAYER_WIDTH as f32 * style.item_height / style.item_width).round();
    [LAYER_WIDTH, (h as u32).clamp(1, 4 * LAYER_WIDTH)]
}

/// Crops `image` to the layer aspect (cover) and resamples it to `size`.
pub fn cover_layer(image: &DecodedImage, [w, h]: [u32; 2]) -> Vec<u8> {
    let Some(buf) = image::RgbaImage::from_raw(image.width, image.height, image.rgba.clone()) else {
        return vec![255; (w * h * 4) as usize];
    };
    let uv = fit_uv(ImageFit::Cover, [w as f32, h as f32], image.size());
    let iw = image.width as f32;
    let ih = image.height as f32;
    let x = (uv.offset[0] * iw).round().clamp(0.0, iw - 1.0) as u32;
    let y = (uv.offset[1] * ih).round().clamp(0.0, ih - 1.0) as u32;
    let cw = ((uv.scale[0] * iw).round() as u32).clamp(1, image.width - x);
    let ch = ((uv.scale[1] * ih).round() as u32).clamp(1, image.height - y);
    let cropped = image::imageops::crop_imm(&buf, x, y, cw, ch).to_image();
    image::imageops::resize(&cropped, w, h, image::imageops::FilterType::Triangle).into_raw()
}

/// The shared canvas of one marquee track. Dropping it releases the lease.
#[derive(Debug)]
pub struct MarqueeCanvas {
    lease: ContextLease,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    texture: wgpu::Texture,
    layer_size: [u32; 2],
    uploaded: Vec<u64>,
}

impl MarqueeCanvas {
    pub fn new(
        device: &wgpu::Device,
        track: &MarqueeTrack,
        format: wgpu::TextureFormat,
        sink: Arc<dyn ResourceSink>,
    ) -> Result<Self> {
        let state = track.state();
        let layers = state.items().len().max(1) as u32;
        let max_layers = device.limits().max_texture_array_layers;
        if layers > max_layers {
            bail!(
                "marquee track '{}' has {layers} items; the device allows {max_layers} texture layers",
                state.id()
            );
        }
        validate_wgsl_with_context(MARQUEE_WGSL, &format!("marquee track '{}'", state.id()))?;
        let lease = ContextLease::acquire(sink, state.id());

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sys.marquee.shader"),
            source: wgpu::ShaderSource::Wgsl(MARQUEE_WGSL.into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sys.marquee.track"),
            size: std::mem::size_of::<TrackUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let instance_capacity = 64;
        let instance_buffer = create_instance_buffer(device, instance_capacity);

        let layer_size = layer_size(state.style());
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("sys.marquee.items"),
            size: wgpu::Extent3d {
                width: layer_size[0],
                height: layer_size[1],
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sys.marquee.sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sys.marquee.bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sys.marquee.bg"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sys.marquee.pipeline.layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sys.marquee.pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<InstanceRaw>() as u64,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &INSTANCE_ATTRIBUTES,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        tracing::debug!(track = %state.id(), layers, "marquee canvas created");
        Ok(Self {
            lease,
            pipeline,
            bind_group,
            uniform_buffer,
            instance_buffer,
            instance_capacity,
            texture,
            layer_size,
            uploaded: vec![0; layers as usize],
        })
    }

    pub fn owner(&self) -> &str {
        self.lease.owner()
    }

    /// Uploads item images whose slot changed since the last upload.
    pub fn sync_textures(&mut self, queue: &wgpu::Queue, track: &MarqueeTrack) -> usize {
        let [w, h] = self.layer_size;
        let mut uploaded = 0;
        for (layer, slot) in track.texture_slots().iter().enumerate() {
            let Some(seen) = self.uploaded.get_mut(layer) else {
                break;
            };
            if slot.is_placeholder() || *seen == slot.generation {
                continue;
            }
            let pixels = cover_layer(&slot.image, self.layer_size);
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &self.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                &pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * w),
                    rows_per_image: Some(h),
                },
                wgpu::Extent3d {
                    width: w,
                    height: h,
                    depth_or_array_layers: 1,
                },
            );
            *seen = slot.generation;
            uploaded += 1;
        }
        uploaded
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        track: &MarqueeTrack,
        instances: &[MarqueeInstance],
    ) {
        let state = track.state();
        let style = state.style();
        let [width, height] = state.size();
        let uniforms = TrackUniforms {
            resolution: [width, height, 0.0, 0.0],
            border_color: style.border_color.to_array(),
            fill: IDLE_FILL.to_array(),
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let raw: Vec<InstanceRaw> = instances
            .iter()
            .map(|inst| {
                let ready = track
                    .texture_slots()
                    .get(inst.item)
                    .is_some_and(|s| !s.is_placeholder());
                instance_raw(inst, style, ready.then_some(inst.item as u32))
            })
            .collect();
        if raw.len() > self.instance_capacity {
            self.instance_capacity = raw.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(device, self.instance_capacity);
        }
        if !raw.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&raw));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("sys.marquee.encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sys.marquee.pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if !raw.is_empty() {
                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &self.bind_group, &[]);
                rpass.set_vertex_buffer(0, self.instance_buffer.slice(..));
                rpass.draw(0..6, 0..raw.len() as u32);
            }
        }
        queue.submit(std::iter::once(encoder.finish()));
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("sys.marquee.instances"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::marquee::radius::CornerRadii;
    use crate::scene::ListConfig;

    fn style() -> TrackStyle {
        let mut style = TrackStyle::from_list(&ListConfig {
            item_width: 200.0,
            item_height: 100.0,
            ..ListConfig::default()
        });
        style.radii = CornerRadii::uniform(8.0);
        style.border_width = 2.0;
        style
    }

    #[test]
    fn instance_layout_is_three_vec4s() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 48);
        assert_eq!(std::mem::size_of::<TrackUniforms>(), 48);
    }

    #[test]
    fn missing_layer_is_flagged_negative() {
        let inst = MarqueeInstance {
            item: 3,
            rect: [10.0, 20.0, 200.0, 100.0],
            scale: 1.1,
            grayscale: 0.5,
        };
        let raw = instance_raw(&inst, &style(), None);
        assert_eq!(raw.style, [1.1, 0.5, 2.0, -1.0]);
        assert_eq!(raw.radii, [8.0; 4]);
        assert_eq!(instance_raw(&inst, &style(), Some(3)).style[3], 3.0);
    }

    #[test]
    fn layer_follows_item_aspect() {
        assert_eq!(layer_size(&style()), [LAYER_WIDTH, LAYER_WIDTH / 2]);
    }

    #[test]
    fn cover_layer_crops_to_the_center() {
        // 4x2 image: left half red, right half blue; a square layer keeps the middle.
        let mut rgba = Vec::new();
        for _y in 0..2 {
            for x in 0..4 {
                rgba.extend_from_slice(if x < 2 { &[255, 0, 0, 255] } else { &[0, 0, 255, 255] });
            }
        }
        let image = DecodedImage {
            width: 4,
            height: 2,
            rgba,
        };
        let out = cover_layer(&image, [2, 2]);
        assert_eq!(out.len(), 2 * 2 * 4);
        assert_eq!(&out[0..4], &[255, 0, 0, 255]);
        assert_eq!(&out[4..8], &[0, 0, 255, 255]);
    }
}
