use anyhow::Result;
use boxworld_geometry::SizePx;

use crate::pixels::PixelBuffer;

/// The GPU operations a [`super::QuadBatchRenderer`] needs.
///
/// One texture and one vertex buffer are created up front. A batch is bracketed by
/// `begin_batch` and `end_batch`, and every flush inside it uploads the vertices and issues one
/// draw call.
pub trait RenderBackend {
    fn upload_texture(&mut self, texture: &PixelBuffer) -> Result<()>;
    fn create_vertex_buffer(&mut self, capacity_bytes: usize) -> Result<()>;

    /// Enables blending, disables depth testing and culling, and sets the viewport.
    fn begin_batch(&mut self, viewport: SizePx);
    fn update_vertex_buffer(&mut self, vertices: &[u8]);
    /// Draws the first `triangle_count` triangles of the vertex buffer.
    ///
    /// Returns `false` if nothing was drawn, for example without a render target. The vertices
    /// of that flush are gone either way.
    fn draw(&mut self, triangle_count: u32) -> bool;
    /// Restores the state changed by `begin_batch`.
    fn end_batch(&mut self);
}
