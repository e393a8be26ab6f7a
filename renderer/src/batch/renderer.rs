use std::time::Instant;

use anyhow::Result;
use boxworld_geometry::{Color, Point, SizePx};
use euclid::size2;
use log::{trace, warn};

use super::{BatchBuffer, QuadSink, RenderBackend, TexturedQuad};
use crate::{
    config::RendererConfig,
    pixels::PixelBuffer,
    stats::{BatchStats, MeasureSeries},
};

/// The default number of quads per draw call.
pub const MAX_QUADS: usize = 8192;

/// Collects quads that all sample one texture and draws them in as few calls as possible.
///
/// A frame is `begin`, any number of `submit_quad`, then `end`. When the buffer fills up during
/// a frame it is flushed implicitly, so a frame takes `ceil(quads / capacity)` draw calls.
pub struct QuadBatchRenderer<B: RenderBackend> {
    backend: B,
    buffer: BatchBuffer,
    frame: Option<Frame>,
    series: MeasureSeries,
}

#[derive(Debug)]
struct Frame {
    viewport: SizePx,
    started: Instant,
    stats: BatchStats,
}

impl<B: RenderBackend> QuadBatchRenderer<B> {
    pub fn new(backend: B, texture: &PixelBuffer) -> Result<Self> {
        Self::with_config(backend, texture, &RendererConfig::default())
    }

    /// Uploads `texture` and creates the vertex buffer.
    ///
    /// Fails if `config.max_quads` is zero or too large to allocate.
    pub fn with_config(
        mut backend: B,
        texture: &PixelBuffer,
        config: &RendererConfig,
    ) -> Result<Self> {
        let buffer = BatchBuffer::new(config.max_quads)?;
        backend.upload_texture(texture)?;
        backend.create_vertex_buffer(buffer.capacity_bytes())?;

        Ok(Self {
            backend,
            buffer,
            frame: None,
            series: MeasureSeries::default(),
        })
    }

    pub fn begin(&mut self, viewport_width: u32, viewport_height: u32) {
        let viewport = size2(viewport_width, viewport_height);
        if self.frame.is_some() {
            warn!("Batch begun twice, ending the previous one");
            self.end();
        }

        self.backend.begin_batch(viewport);
        self.frame = Some(Frame {
            viewport,
            started: Instant::now(),
            stats: BatchStats::default(),
        });
    }

    pub fn submit_quad(
        &mut self,
        start_pos: Point,
        start_uv: Point,
        end_pos: Point,
        end_uv: Point,
        color: Color,
    ) {
        self.push_quad(TexturedQuad {
            start_pos,
            start_uv,
            end_pos,
            end_uv,
            color,
        });
    }

    pub fn end(&mut self) {
        if self.frame.is_none() {
            warn!("Batch ended without begin, ignored");
            return;
        }

        self.flush();
        self.backend.end_batch();

        if let Some(frame) = self.frame.take() {
            trace!(
                "Frame {}x{}: {} quads, {} draw calls, {} dropped",
                frame.viewport.width,
                frame.viewport.height,
                frame.stats.quads,
                frame.stats.draw_calls,
                frame.stats.dropped_quads
            );
            self.series.add_frame(frame.stats, frame.started.elapsed());
        }
    }

    /// Quads waiting for the next flush.
    pub fn pending_quads(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn series(&self) -> &MeasureSeries {
        &self.series
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    fn flush(&mut self) {
        let flush = self.buffer.take_for_flush();
        if flush.quad_count() == 0 {
            return;
        }

        let quads = flush.quad_count();
        self.backend.update_vertex_buffer(flush.as_bytes());
        let drawn = self.backend.draw(flush.triangle_count());
        if !drawn {
            warn!("Backend did not draw, {quads} quads dropped");
        }

        if let Some(frame) = &mut self.frame {
            if drawn {
                frame.stats.draw_calls += 1;
            } else {
                frame.stats.dropped_quads += quads;
            }
        }
    }
}

impl<B: RenderBackend> QuadSink for QuadBatchRenderer<B> {
    fn push_quad(&mut self, quad: TexturedQuad) {
        if self.buffer.is_full() {
            self.flush();
        }
        self.buffer.push(&quad);

        if let Some(frame) = &mut self.frame {
            frame.stats.quads += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::PixelFormat;

    #[derive(Debug, Default)]
    pub struct RecordingBackend {
        pub uploaded: Option<(u32, u32)>,
        pub vertex_buffer_bytes: usize,
        pub batches_begun: usize,
        pub batches_ended: usize,
        pub viewport: Option<SizePx>,
        /// Byte length of every vertex buffer update.
        pub updates: Vec<usize>,
        /// Triangle count of every draw call.
        pub draws: Vec<u32>,
        /// Makes `draw` report that nothing was drawn.
        pub no_target: bool,
    }

    impl RenderBackend for RecordingBackend {
        fn upload_texture(&mut self, texture: &PixelBuffer) -> Result<()> {
            self.uploaded = Some((texture.width(), texture.height()));
            Ok(())
        }

        fn create_vertex_buffer(&mut self, capacity_bytes: usize) -> Result<()> {
            self.vertex_buffer_bytes = capacity_bytes;
            Ok(())
        }

        fn begin_batch(&mut self, viewport: SizePx) {
            self.batches_begun += 1;
            self.viewport = Some(viewport);
        }

        fn update_vertex_buffer(&mut self, vertices: &[u8]) {
            assert!(vertices.len() <= self.vertex_buffer_bytes);
            self.updates.push(vertices.len());
        }

        fn draw(&mut self, triangle_count: u32) -> bool {
            self.draws.push(triangle_count);
            !self.no_target
        }

        fn end_batch(&mut self) {
            self.batches_ended += 1;
        }
    }

    fn renderer(max_quads: usize) -> QuadBatchRenderer<RecordingBackend> {
        let texture = PixelBuffer::allocate(128, 128, PixelFormat::Rgba8).unwrap();
        let config = RendererConfig {
            max_quads,
            ..RendererConfig::default()
        };
        QuadBatchRenderer::with_config(RecordingBackend::default(), &texture, &config).unwrap()
    }

    fn submit(renderer: &mut QuadBatchRenderer<RecordingBackend>, count: usize) {
        for i in 0..count {
            let x = i as f64;
            renderer.submit_quad(
                Point::new(x, 0.0),
                Point::new(0.0, 0.0),
                Point::new(x + 1.0, 1.0),
                Point::new(1.0, 1.0),
                Color::WHITE,
            );
        }
    }

    #[test]
    fn construction_uploads_texture_and_sizes_vertex_buffer() {
        let renderer = renderer(MAX_QUADS);
        let backend = renderer.backend();
        assert_eq!(backend.uploaded, Some((128, 128)));
        assert_eq!(backend.vertex_buffer_bytes, MAX_QUADS * 6 * 32);
    }

    #[test]
    fn overflowing_submission_flushes_once() {
        let mut renderer = renderer(MAX_QUADS);
        renderer.begin(800, 600);
        submit(&mut renderer, MAX_QUADS + 1);

        assert_eq!(renderer.backend().draws, vec![(MAX_QUADS * 2) as u32]);
        assert_eq!(renderer.pending_quads(), 1);
    }

    #[test]
    fn draw_calls_per_frame_round_up() {
        let mut renderer = renderer(4);
        renderer.begin(320, 240);
        submit(&mut renderer, 9);
        renderer.end();

        let backend = renderer.backend();
        assert_eq!(backend.draws, vec![8, 8, 2]);
        assert_eq!(backend.updates, vec![4 * 192, 4 * 192, 192]);
        assert_eq!(backend.viewport, Some(size2(320, 240)));
        assert_eq!(renderer.pending_quads(), 0);
        assert_eq!(renderer.series().totals().draw_calls, 3);
        assert_eq!(renderer.series().totals().quads, 9);
    }

    #[test]
    fn empty_frame_draws_nothing() {
        let mut renderer = renderer(4);
        renderer.begin(320, 240);
        renderer.end();

        let backend = renderer.backend();
        assert!(backend.draws.is_empty());
        assert!(backend.updates.is_empty());
        assert_eq!(backend.batches_begun, 1);
        assert_eq!(backend.batches_ended, 1);
    }

    #[test]
    fn exact_capacity_flushes_only_at_end() {
        let mut renderer = renderer(4);
        renderer.begin(320, 240);
        submit(&mut renderer, 4);
        assert!(renderer.backend().draws.is_empty());
        renderer.end();
        assert_eq!(renderer.into_backend().draws, vec![8]);
    }

    #[test]
    fn nested_begin_ends_the_open_frame() {
        let mut renderer = renderer(4);
        renderer.begin(320, 240);
        submit(&mut renderer, 1);
        renderer.begin(640, 480);
        renderer.end();

        let backend = renderer.backend();
        assert_eq!(backend.draws, vec![2]);
        assert_eq!(backend.batches_begun, 2);
        assert_eq!(backend.batches_ended, 2);
        assert_eq!(renderer.series().frames(), 2);
    }

    #[test]
    fn unusable_capacities_are_errors() {
        let texture = PixelBuffer::allocate(8, 8, PixelFormat::Rgba8).unwrap();
        for max_quads in [0, usize::MAX / 64] {
            let config = RendererConfig {
                max_quads,
                ..RendererConfig::default()
            };
            let result =
                QuadBatchRenderer::with_config(RecordingBackend::default(), &texture, &config);
            assert!(result.is_err(), "max_quads = {max_quads}");
        }
    }

    #[test]
    fn end_without_begin_is_ignored() {
        let mut renderer = renderer(4);
        submit(&mut renderer, 1);
        renderer.end();

        let backend = renderer.backend();
        assert!(backend.draws.is_empty());
        assert_eq!(backend.batches_ended, 0);
        assert_eq!(renderer.series().frames(), 0);
        assert_eq!(renderer.pending_quads(), 1);
    }

    #[test]
    fn undrawn_flushes_count_as_dropped() {
        let mut renderer = renderer(4);
        renderer.backend_mut().no_target = true;
        renderer.begin(320, 240);
        submit(&mut renderer, 5);
        renderer.end();

        let totals = renderer.series().totals();
        assert_eq!(totals.quads, 5);
        assert_eq!(totals.draw_calls, 0);
        assert_eq!(totals.dropped_quads, 5);
        assert_eq!(renderer.pending_quads(), 0);
    }
}
