//! Drawing atlas entries by index, the way the game draws its board.
use boxworld_geometry::{Color, Point, Size};
use log::debug;

use crate::{
    atlas::Atlas,
    batch::{QuadSink, TexturedQuad},
};

/// Emits atlas entry `index` with its native size, bottom-left corner at `position`.
///
/// Returns `false` if there is no such entry.
pub fn draw_sprite(
    sink: &mut impl QuadSink,
    atlas: &Atlas,
    index: usize,
    position: Point,
    color: Color,
) -> bool {
    draw_sprite_sized(sink, atlas, index, position, None, color)
}

fn draw_sprite_sized(
    sink: &mut impl QuadSink,
    atlas: &Atlas,
    index: usize,
    position: Point,
    size: Option<Size>,
    color: Color,
) -> bool {
    let Some(placement) = atlas.placement(index) else {
        debug!("No sprite {index} in an atlas of {}", atlas.len());
        return false;
    };

    let (start_uv, end_uv) = atlas.uv_rect(placement);
    sink.push_quad(TexturedQuad {
        start_pos: position,
        start_uv,
        end_pos: position + size.unwrap_or_else(|| placement.size()),
        end_uv,
        color,
    });
    true
}

/// An atlas of equally sized tiles placed on a grid.
#[derive(Debug)]
pub struct SpriteSheet {
    atlas: Atlas,
    tile_size: Size,
    origin: Point,
}

impl SpriteSheet {
    pub fn new(atlas: Atlas, tile_size: Size) -> Self {
        Self {
            atlas,
            tile_size,
            origin: Point::ZERO,
        }
    }

    /// Moves the bottom-left corner of cell (0, 0).
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn tile_size(&self) -> Size {
        self.tile_size
    }

    /// The bottom-left corner of a cell. Row 0 is the bottom row.
    pub fn cell_position(&self, column: u32, row: u32) -> Point {
        self.origin
            + Point::new(
                column as f64 * self.tile_size.width,
                row as f64 * self.tile_size.height,
            )
    }

    /// Draws sprite `kind` stretched to fill the cell.
    pub fn draw_tile(
        &self,
        sink: &mut impl QuadSink,
        kind: usize,
        column: u32,
        row: u32,
        color: Color,
    ) -> bool {
        draw_sprite_sized(
            sink,
            &self.atlas,
            kind,
            self.cell_position(column, row),
            Some(self.tile_size),
            color,
        )
    }
}
