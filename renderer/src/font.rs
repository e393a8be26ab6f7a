//! Baked bitmap fonts: rasterization, the codepoint sorted glyph table and text layout.
mod font_atlas;
mod layout;
mod rasterizer;

pub use font_atlas::*;
pub use rasterizer::*;
