//! The fixed wgpu state of the quad batch: one pipeline, two bind group layouts and the atlas
//! sampler.
//!
//! Group 0 holds the viewport uniform read by the vertex stage, group 1 the atlas texture and
//! its sampler read by the fragment stage.
use wgpu::{
    AddressMode, BindGroupLayoutEntry, BindingType, FilterMode, SamplerBindingType, ShaderStages,
};

use crate::pods::BatchVertex;

const VERTEX_SHADER_ENTRY: &str = "vs_main";
const FRAGMENT_SHADER_ENTRY: &str = "fs_main";

pub struct QuadPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub viewport_layout: wgpu::BindGroupLayout,
    pub atlas_layout: wgpu::BindGroupLayout,
}

impl QuadPipeline {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::include_wgsl!("quad_batch.wgsl"));

        let viewport_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Viewport Bind Group Layout"),
            entries: &[layout_entry(
                0,
                ShaderStages::VERTEX,
                BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
            )],
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Atlas Bind Group Layout"),
            entries: &[
                layout_entry(
                    0,
                    ShaderStages::FRAGMENT,
                    BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                ),
                layout_entry(
                    1,
                    ShaderStages::FRAGMENT,
                    BindingType::Sampler(SamplerBindingType::Filtering),
                ),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Quad Batch Pipeline Layout"),
            bind_group_layouts: &[&viewport_layout, &atlas_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Quad Batch Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some(VERTEX_SHADER_ENTRY),
                compilation_options: Default::default(),
                buffers: &[BatchVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some(FRAGMENT_SHADER_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            // Quads arrive in both windings, pixel space is y-up.
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..wgpu::PrimitiveState::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            viewport_layout,
            atlas_layout,
        }
    }
}

fn layout_entry(binding: u32, visibility: ShaderStages, ty: BindingType) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty,
        count: None,
    }
}

/// The atlas sampler, clamped at the edges.
///
/// Nearest filtering keeps glyph and tile pixels crisp. Linear filtering relies on the one pixel
/// gutter around every atlas entry.
pub fn atlas_sampler(device: &wgpu::Device, smooth: bool) -> wgpu::Sampler {
    let (label, filter) = if smooth {
        ("Linear Atlas Sampler", FilterMode::Linear)
    } else {
        ("Nearest Atlas Sampler", FilterMode::Nearest)
    };

    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: AddressMode::ClampToEdge,
        address_mode_v: AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        ..Default::default()
    })
}
