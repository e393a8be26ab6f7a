pub mod atlas;
pub mod batch;
pub mod config;
mod error;
pub mod font;
pub mod pixels;
mod pods;
pub mod sprites;
mod stats;
pub mod utf8;

pub use atlas::{Atlas, PlacementRect, build_atlas};
pub use batch::{QuadBatchRenderer, QuadSink, RenderBackend, TexturedQuad, WgpuBackend};
pub use config::{BakeConfig, FontBakeConfig, RendererConfig};
pub use error::*;
pub use font::FontAtlas;
pub use pixels::{PixelBuffer, PixelFormat};
pub use pods::BatchVertex;
pub use stats::{BatchStats, MeasureSeries};
