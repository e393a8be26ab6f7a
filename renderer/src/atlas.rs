//! A texture atlas baked once from an ordered list of source bitmaps.
mod builder;
mod packer;

use boxworld_geometry::{Point, Size};
use serde::{Deserialize, Serialize};

pub use builder::*;
pub use packer::*;

use crate::{Error, Result, pixels::PixelBuffer};

/// The location of one source inside the atlas, excluding the gutter.
///
/// Coordinates are in the atlas buffer's bottom-up pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlacementRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub packed: bool,
}

impl PlacementRect {
    pub const fn packed(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            packed: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn min(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    pub fn max(&self) -> Point {
        self.min() + self.size()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }
}

/// One composed Rgba8 texture and the placements of its sources, index aligned with the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Atlas {
    pixels: PixelBuffer,
    placements: Vec<PlacementRect>,
}

impl Atlas {
    pub(crate) fn new(pixels: PixelBuffer, placements: Vec<PlacementRect>) -> Self {
        Self { pixels, placements }
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn placements(&self) -> &[PlacementRect] {
        &self.placements
    }

    pub fn placement(&self, index: usize) -> Option<&PlacementRect> {
        self.placements.get(index)
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_stdvec(self)
            .map_err(|e| Error::invalid_format(format!("failed to serialize atlas: {e}")))
    }

    /// Restores an atlas from [`Atlas::to_bytes`] output. Placements must lie inside the texture.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let atlas: Self = postcard::from_bytes(bytes)
            .map_err(|e| Error::invalid_format(format!("failed to read atlas: {e}")))?;

        let (width, height) = (atlas.pixels.width(), atlas.pixels.height());
        if let Some(index) = atlas.placements.iter().position(|p| {
            p.x.saturating_add(p.width) > width || p.y.saturating_add(p.height) > height
        }) {
            return Err(Error::invalid_format(format!(
                "placement {index} is outside of the {width}x{height} atlas"
            )));
        }
        Ok(atlas)
    }

    /// Texture coordinates of a placement: `(min, max)` normalized by the texture size.
    pub fn uv_rect(&self, placement: &PlacementRect) -> (Point, Point) {
        let texture_size = Size::from(self.pixels.size());
        (
            placement.min().normalized_by(texture_size),
            placement.max().normalized_by(texture_size),
        )
    }
}
