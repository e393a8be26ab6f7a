//! Value types shared between the atlas builder, text layout and the quad batch renderer.
//!
//! All pixel space types are y-up: `(0, 0)` is the bottom left corner of a bitmap or viewport.

mod color;
mod point;
mod size;

pub use color::*;
pub use point::*;
pub use size::*;

pub struct PixelUnit;
pub type SizePx = euclid::Size2D<u32, PixelUnit>;
pub type PointPx = euclid::Point2D<u32, PixelUnit>;
