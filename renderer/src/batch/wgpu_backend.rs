use anyhow::{Context, Result, bail};
use boxworld_geometry::{Color, SizePx};
use log::debug;
use wgpu::{
    Extent3d, Origin3d, StoreOp, TextureAspect, TextureDescriptor, TextureDimension,
    TextureFormat, TextureUsages, TextureViewDescriptor,
};

use super::{
    RenderBackend,
    quad_pipeline::{QuadPipeline, atlas_sampler},
};
use crate::{config::RendererConfig, pixels::PixelBuffer, pods::ViewportUniform};

/// A [`RenderBackend`] drawing into a wgpu texture view.
///
/// Every flush is recorded into its own render pass that loads the target's contents, so
/// batches drawn in the same frame accumulate. The target has to be set with
/// [`WgpuBackend::set_target`] before the first flush, flushes without one are dropped.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: QuadPipeline,
    viewport_buffer: wgpu::Buffer,
    viewport_bind_group: wgpu::BindGroup,
    atlas_sampler: wgpu::Sampler,
    atlas_bind_group: Option<wgpu::BindGroup>,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_bytes: u64,
    target: Option<wgpu::TextureView>,
}

impl WgpuBackend {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        target_format: TextureFormat,
        config: &RendererConfig,
    ) -> Self {
        let pipeline = QuadPipeline::new(&device, target_format);

        let viewport_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Viewport Uniform"),
            size: size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let viewport_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Viewport Bind Group"),
            layout: &pipeline.viewport_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_buffer.as_entire_binding(),
            }],
        });

        let atlas_sampler = atlas_sampler(&device, config.smooth_filtering);

        Self {
            device,
            queue,
            pipeline,
            viewport_buffer,
            viewport_bind_group,
            atlas_sampler,
            atlas_bind_group: None,
            vertex_buffer: None,
            vertex_bytes: 0,
            target: None,
        }
    }

    /// The view the following flushes draw into, usually the current surface texture.
    pub fn set_target(&mut self, view: wgpu::TextureView) {
        self.target = Some(view);
    }

    /// Clears the target. Does nothing without one.
    pub fn clear(&mut self, color: Color) {
        let Some(target) = &self.target else {
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });

        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: color.red as f64,
                        g: color.green as f64,
                        b: color.blue as f64,
                        a: color.alpha as f64,
                    }),
                    store: StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.queue.submit([encoder.finish()]);
    }

    pub fn take_target(&mut self) -> Option<wgpu::TextureView> {
        self.target.take()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl RenderBackend for WgpuBackend {
    fn upload_texture(&mut self, texture: &PixelBuffer) -> Result<()> {
        let rgba = texture
            .to_rgba8()
            .context("Converting the atlas texture to RGBA")?;
        let (width, height) = (rgba.width(), rgba.height());

        let limit = self.device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            bail!("Atlas texture {width}x{height} exceeds the device limit of {limit}");
        }

        let size = Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let gpu_texture = self.device.create_texture(&TextureDescriptor {
            label: Some("Atlas Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // Row 0 of the buffer is the bottom row, which becomes v = 0.
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            rgba.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: None,
            },
            size,
        );

        let view = gpu_texture.create_view(&TextureViewDescriptor::default());
        self.atlas_bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Atlas Bind Group"),
            layout: &self.pipeline.atlas_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.atlas_sampler),
                },
            ],
        }));

        debug!("Uploaded {width}x{height} atlas texture");
        Ok(())
    }

    fn create_vertex_buffer(&mut self, capacity_bytes: usize) -> Result<()> {
        let size = capacity_bytes as u64;
        let limit = self.device.limits().max_buffer_size;
        if size > limit {
            bail!("Vertex buffer of {size} bytes exceeds the device limit of {limit}");
        }

        self.vertex_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Quad Batch Vertex Buffer"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        Ok(())
    }

    fn begin_batch(&mut self, viewport: SizePx) {
        // Blending, depth and culling are fixed in the pipeline.
        let uniform = ViewportUniform::from(viewport);
        self.queue
            .write_buffer(&self.viewport_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    fn update_vertex_buffer(&mut self, vertices: &[u8]) {
        let Some(vertex_buffer) = &self.vertex_buffer else {
            return;
        };
        self.queue.write_buffer(vertex_buffer, 0, vertices);
        self.vertex_bytes = vertices.len() as u64;
    }

    fn draw(&mut self, triangle_count: u32) -> bool {
        let (Some(target), Some(vertex_buffer), Some(atlas_bind_group)) = (
            &self.target,
            &self.vertex_buffer,
            &self.atlas_bind_group,
        ) else {
            debug!(
                "Draw without target: {}, vertex buffer: {}, atlas: {}",
                self.target.is_some(),
                self.vertex_buffer.is_some(),
                self.atlas_bind_group.is_some()
            );
            return false;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Quad Batch Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Quad Batch Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline.pipeline);
            pass.set_bind_group(0, &self.viewport_bind_group, &[]);
            pass.set_bind_group(1, atlas_bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..self.vertex_bytes));
            pass.draw(0..triangle_count * 3, 0..1);
        }

        self.queue.submit([encoder.finish()]);
        true
    }

    fn end_batch(&mut self) {
        // Render state is scoped to the passes, nothing to restore.
    }
}
