//! wgpu implementation of the flush seam.
//!
//! The caller owns the instance, adapter, device, queue and surface;
//! this backend only builds the two pipelines (flat rects, sampled
//! text), keeps the atlas texture in sync and replays the frame's
//! flushes into a single render pass.

use std::sync::Arc;

use tracing::{debug, trace};
use wgpu::util::DeviceExt;

use super::{BackendError, RenderBackend};
use crate::renderer::{RectVertex, TextVertex};

const INITIAL_VERTEX_CAPACITY: u64 = 4096;

/// One recorded flush: a contiguous vertex range in this frame's
/// rect or text stream.
#[derive(Debug, Clone, Copy)]
enum Draw {
    Rects { first: u32, count: u32 },
    Text { first: u32, count: u32 },
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,

    rect_pipeline: wgpu::RenderPipeline,
    text_pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,

    atlas_bind_layout: wgpu::BindGroupLayout,
    atlas_sampler: wgpu::Sampler,
    atlas_texture: wgpu::Texture,
    atlas_bind_group: wgpu::BindGroup,
    atlas_size: u32,

    rect_buffer: wgpu::Buffer,
    rect_capacity: u64,
    text_buffer: wgpu::Buffer,
    text_capacity: u64,

    frame_rects: Vec<RectVertex>,
    frame_text: Vec<TextVertex>,
    draws: Vec<Draw>,

    target: Option<wgpu::TextureView>,
    clear_color: wgpu::Color,
}

impl WgpuBackend {
    /// Builds both pipelines against the surface `format`. Shader or
    /// pipeline validation failure is fatal.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        format: wgpu::TextureFormat,
    ) -> Result<Self, BackendError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let rect_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gavea::rect"),
            source: wgpu::ShaderSource::Wgsl(include_str!("rect.wgsl").into()),
        });
        let text_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gavea::text"),
            source: wgpu::ShaderSource::Wgsl(include_str!("text.wgsl").into()),
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gavea::globals layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let atlas_bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("gavea::atlas layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("gavea::globals"),
            contents: bytemuck::cast_slice(&[1.0f32, 1.0, 0.0, 0.0]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("gavea::globals"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let rect_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gavea::rect layout"),
            bind_group_layouts: &[&globals_layout],
            push_constant_ranges: &[],
        });
        let text_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("gavea::text layout"),
            bind_group_layouts: &[&globals_layout, &atlas_bind_layout],
            push_constant_ranges: &[],
        });

        let color_target = [Some(wgpu::ColorTargetState {
            format,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        })];

        let rect_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("gavea::rect"),
            layout: Some(&rect_layout),
            vertex: wgpu::VertexState {
                module: &rect_shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[RectVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &rect_shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &color_target,
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let text_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("gavea::text"),
            layout: Some(&text_layout),
            vertex: wgpu::VertexState {
                module: &text_shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[TextVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &text_shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &color_target,
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let atlas_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("gavea::atlas"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let atlas_size = 1;
        let atlas_texture = create_atlas_texture(&device, atlas_size);
        let atlas_bind_group = create_atlas_bind_group(
            &device,
            &atlas_bind_layout,
            &atlas_texture,
            &atlas_sampler,
        );

        let rect_buffer = create_vertex_buffer(
            &device,
            "gavea::rect vertices",
            INITIAL_VERTEX_CAPACITY * std::mem::size_of::<RectVertex>() as u64,
        );
        let text_buffer = create_vertex_buffer(
            &device,
            "gavea::text vertices",
            INITIAL_VERTEX_CAPACITY * std::mem::size_of::<TextVertex>() as u64,
        );

        if let Some(error) = futures::executor::block_on(device.pop_error_scope()) {
            return Err(BackendError::GpuInit(error.to_string()));
        }
        debug!(?format, "wgpu pipelines ready");

        Ok(Self {
            device,
            queue,
            rect_pipeline,
            text_pipeline,
            globals_buffer,
            globals_bind_group,
            atlas_bind_layout,
            atlas_sampler,
            atlas_texture,
            atlas_bind_group,
            atlas_size,
            rect_buffer,
            rect_capacity: INITIAL_VERTEX_CAPACITY,
            text_buffer,
            text_capacity: INITIAL_VERTEX_CAPACITY,
            frame_rects: Vec::new(),
            frame_text: Vec::new(),
            draws: Vec::new(),
            target: None,
            clear_color: wgpu::Color::BLACK,
        })
    }

    /// Texture view the next `end_frame` renders into. Must be set
    /// every frame the swapchain recreates its views.
    pub fn set_target(&mut self, view: wgpu::TextureView) {
        self.target = Some(view);
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    fn ensure_rect_capacity(&mut self, vertices: u64) {
        if vertices > self.rect_capacity {
            let capacity = vertices.next_power_of_two();
            self.rect_buffer = create_vertex_buffer(
                &self.device,
                "gavea::rect vertices",
                capacity * std::mem::size_of::<RectVertex>() as u64,
            );
            self.rect_capacity = capacity;
        }
    }

    fn ensure_text_capacity(&mut self, vertices: u64) {
        if vertices > self.text_capacity {
            let capacity = vertices.next_power_of_two();
            self.text_buffer = create_vertex_buffer(
                &self.device,
                "gavea::text vertices",
                capacity * std::mem::size_of::<TextVertex>() as u64,
            );
            self.text_capacity = capacity;
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn begin_frame(&mut self, width: u32, height: u32) {
        self.frame_rects.clear();
        self.frame_text.clear();
        self.draws.clear();
        self.queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::cast_slice(&[width.max(1) as f32, height.max(1) as f32, 0.0, 0.0]),
        );
    }

    fn upload_atlas(&mut self, size: u32, pixels: &[u8]) {
        if size != self.atlas_size {
            self.atlas_texture = create_atlas_texture(&self.device, size);
            self.atlas_bind_group = create_atlas_bind_group(
                &self.device,
                &self.atlas_bind_layout,
                &self.atlas_texture,
                &self.atlas_sampler,
            );
            self.atlas_size = size;
            debug!(size, "atlas texture recreated");
        }
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.atlas_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(size),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }

    fn draw_rects(&mut self, vertices: &[RectVertex]) {
        let first = self.frame_rects.len() as u32;
        self.frame_rects.extend_from_slice(vertices);
        self.draws.push(Draw::Rects {
            first,
            count: vertices.len() as u32,
        });
    }

    fn draw_text(&mut self, vertices: &[TextVertex]) {
        let first = self.frame_text.len() as u32;
        self.frame_text.extend_from_slice(vertices);
        self.draws.push(Draw::Text {
            first,
            count: vertices.len() as u32,
        });
    }

    fn end_frame(&mut self) {
        let Some(target) = self.target.take() else {
            trace!("no render target set, frame dropped");
            return;
        };

        self.ensure_rect_capacity(self.frame_rects.len() as u64);
        self.ensure_text_capacity(self.frame_text.len() as u64);
        if !self.frame_rects.is_empty() {
            self.queue
                .write_buffer(&self.rect_buffer, 0, bytemuck::cast_slice(&self.frame_rects));
        }
        if !self.frame_text.is_empty() {
            self.queue
                .write_buffer(&self.text_buffer, 0, bytemuck::cast_slice(&self.frame_text));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("gavea::frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("gavea::frame"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_bind_group(0, &self.globals_bind_group, &[]);

            for draw in &self.draws {
                match *draw {
                    Draw::Rects { first, count } => {
                        pass.set_pipeline(&self.rect_pipeline);
                        pass.set_vertex_buffer(0, self.rect_buffer.slice(..));
                        pass.draw(first..first + count, 0..1);
                    }
                    Draw::Text { first, count } => {
                        pass.set_pipeline(&self.text_pipeline);
                        pass.set_bind_group(1, &self.atlas_bind_group, &[]);
                        pass.set_vertex_buffer(0, self.text_buffer.slice(..));
                        pass.draw(first..first + count, 0..1);
                    }
                }
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn create_atlas_texture(device: &wgpu::Device, size: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("gavea::atlas"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn create_atlas_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &wgpu::Texture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("gavea::atlas"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn create_vertex_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
