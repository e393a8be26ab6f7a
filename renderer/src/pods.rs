use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

use boxworld_geometry::{Color, Point, SizePx};
use wgpu::{BufferAddress, VertexAttribute, VertexBufferLayout, VertexStepMode};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BatchVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
}

const_assert_eq!(size_of::<BatchVertex>(), 32);

impl BatchVertex {
    pub fn new(position: Point, uv: Point, color: Color) -> Self {
        Self {
            position: position.into(),
            tex_coords: uv.into(),
            color: color.into(),
        }
    }

    pub fn layout() -> VertexBufferLayout<'static> {
        const ATTRS: [VertexAttribute; 3] =
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

        VertexBufferLayout {
            array_stride: size_of::<BatchVertex>() as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &ATTRS,
        }
    }
}

/// The viewport size in pixels, used to map pixel positions to normalized device coordinates.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ViewportUniform {
    pub size: [f32; 2],
    _padding: [f32; 2],
}

// WebGL uniform requirement
const_assert_eq!(size_of::<ViewportUniform>() % 16, 0);

impl From<SizePx> for ViewportUniform {
    fn from(size: SizePx) -> Self {
        Self {
            size: [size.width as f32, size.height as f32],
            _padding: [0.0; 2],
        }
    }
}
