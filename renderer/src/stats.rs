use std::time::Duration;

use log::{info, warn};

const SKIP_FRAMES: usize = 10;

/// What one frame submitted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub quads: usize,
    pub draw_calls: usize,
    /// Quads that were flushed but not drawn by the backend.
    pub dropped_quads: usize,
}

/// Running aggregate over all frames of a renderer. Logs a summary when dropped.
#[derive(Debug, Default)]
pub struct MeasureSeries {
    frames: usize,
    totals: BatchStats,
    max_draw_calls: usize,
    cpu_time: Stats,
}

impl MeasureSeries {
    pub fn add_frame(&mut self, frame: BatchStats, duration: Duration) {
        self.frames += 1;
        self.totals.quads += frame.quads;
        self.totals.draw_calls += frame.draw_calls;
        self.totals.dropped_quads += frame.dropped_quads;
        self.max_draw_calls = self.max_draw_calls.max(frame.draw_calls);

        // The first frames include warmup.
        if self.frames > SKIP_FRAMES {
            self.cpu_time.add(duration);
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn totals(&self) -> BatchStats {
        self.totals
    }

    pub fn max_draw_calls(&self) -> usize {
        self.max_draw_calls
    }
}

impl Drop for MeasureSeries {
    fn drop(&mut self) {
        if self.frames == 0 {
            return;
        }

        info!(
            "Batch series: {} frames, {} quads, {} draw calls (max {} per frame)",
            self.frames, self.totals.quads, self.totals.draw_calls, self.max_draw_calls
        );

        if self.totals.dropped_quads > 0 {
            warn!("Batch series: {} quads dropped", self.totals.dropped_quads);
        }

        if let Some(mean) = self.cpu_time.mean() {
            info!(
                "Batch series CPU time: mean: {mean:?} ({:?}-{:?}, {} samples, {} skipped)",
                self.cpu_time.min, self.cpu_time.max, self.cpu_time.count, SKIP_FRAMES
            )
        }
    }
}

#[derive(Debug, Default)]
struct Stats {
    min: Duration,
    sum: Duration,
    max: Duration,
    count: usize,
}

impl Stats {
    fn add(&mut self, duration: Duration) {
        self.min = if self.count == 0 {
            duration
        } else {
            self.min.min(duration)
        };
        self.max = self.max.max(duration);
        self.sum += duration;
        self.count += 1;
    }

    fn mean(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as u32)
    }
}
