use std::sync::Arc;

use anyhow::Result;

use super::RaymarchNode;
use super::uniforms::{RaymarchUniforms, UNIFORM_SIZE};
use crate::renderer::resources::{ContextLease, ResourceSink};
use crate::renderer::texture::DecodedImage;
use crate::renderer::validation::validate_wgsl_with_context;

#[derive(Debug)]
struct PlaneTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    generation: u64,
}

/// GPU side of one raymarched node: pipeline, uniform buffer and, for the
/// plane, its image texture. Dropping it releases the context lease.
#[derive(Debug)]
pub struct RaymarchCanvas {
    lease: ContextLease,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    plane: Option<PlaneTexture>,
}

impl RaymarchCanvas {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        node: &RaymarchNode,
        format: wgpu::TextureFormat,
        sink: Arc<dyn ResourceSink>,
    ) -> Result<Self> {
        let source = node.wgsl();
        validate_wgsl_with_context(&source, &format!("raymarch node '{}'", node.id()))?;
        let lease = ContextLease::acquire(sink, node.id());

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("sys.raymarch.shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sys.raymarch.params"),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let textured = node.program().samples_texture();
        let mut layout_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
            },
            count: None,
        }];
        if textured {
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            layout_entries.push(wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("sys.raymarch.bgl"),
            entries: &layout_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sys.raymarch.pipeline.layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sys.raymarch.pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
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

        let plane = textured.then(|| {
            let (image, generation) = match node.texture() {
                Some(slot) => (slot.image.clone(), slot.generation),
                None => (DecodedImage::placeholder(), 0),
            };
            upload_plane_texture(device, queue, &image, generation)
        });
        let bind_group = create_bind_group(device, &bind_group_layout, &uniform_buffer, plane.as_ref());

        tracing::debug!(node = %node.id(), program = node.program().name(), "raymarch canvas created");
        Ok(Self {
            lease,
            pipeline,
            bind_group_layout,
            bind_group,
            uniform_buffer,
            plane,
        })
    }

    pub fn owner(&self) -> &str {
        self.lease.owner()
    }

    /// Re-uploads the plane texture when the node's slot changed since the
    /// last upload. Returns whether anything was uploaded.
    pub fn sync_texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, node: &RaymarchNode) -> bool {
        let Some(slot) = node.texture() else {
            return false;
        };
        if self.plane.as_ref().is_none_or(|p| p.generation == slot.generation) {
            return false;
        }
        let plane = upload_plane_texture(device, queue, &slot.image, slot.generation);
        self.bind_group = create_bind_group(device, &self.bind_group_layout, &self.uniform_buffer, Some(&plane));
        self.plane = Some(plane);
        true
    }

    /// Draws one frame into `target`, clearing it to transparent first.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: &wgpu::TextureView,
        uniforms: &RaymarchUniforms,
    ) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("sys.raymarch.encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("sys.raymarch.pass"),
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
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }
}

fn upload_plane_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &DecodedImage,
    generation: u64,
) -> PlaneTexture {
    let size = wgpu::Extent3d {
        width: image.width.max(1),
        height: image.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("sys.raymarch.plane.texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &image.rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * size.width),
            rows_per_image: Some(size.height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("sys.raymarch.plane.sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });
    PlaneTexture {
        _texture: texture,
        view,
        sampler,
        generation,
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform_buffer: &wgpu::Buffer,
    plane: Option<&PlaneTexture>,
) -> wgpu::BindGroup {
    let mut entries = vec![wgpu::BindGroupEntry {
        binding: 0,
        resource: uniform_buffer.as_entire_binding(),
    }];
    if let Some(plane) = plane {
        entries.push(wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::TextureView(&plane.view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: 2,
            resource: wgpu::BindingResource::Sampler(&plane.sampler),
        });
    }
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("sys.raymarch.bg"),
        layout,
        entries: &entries,
    })
}
