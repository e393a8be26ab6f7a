//! Quad batching: quads are collected in a fixed size vertex buffer and drawn with one call per
//! flush.
mod backend;
mod batch_buffer;
mod quad_pipeline;
mod renderer;
mod wgpu_backend;

pub use backend::*;
pub use batch_buffer::*;
pub use renderer::*;
pub use wgpu_backend::*;

use boxworld_geometry::{Color, Point};

/// An axis aligned, textured and tinted quad in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexturedQuad {
    pub start_pos: Point,
    pub start_uv: Point,
    pub end_pos: Point,
    pub end_uv: Point,
    pub color: Color,
}

/// Receives the quads produced by text and sprite layout.
pub trait QuadSink {
    fn push_quad(&mut self, quad: TexturedQuad);
}

impl QuadSink for Vec<TexturedQuad> {
    fn push_quad(&mut self, quad: TexturedQuad) {
        self.push(quad);
    }
}
