use boxworld_geometry::{PointPx, SizePx};
use euclid::size2;
use log::{debug, info};
use tracing::instrument;

use super::{Atlas, EtagerePacker, PlacementRect, RectanglePacker};
use crate::{
    Error, Result,
    pixels::{PixelBuffer, PixelFormat},
};

/// The square canvas sizes tried, smallest first. There is no growth beyond the last one.
pub const CANVAS_SIZES: [u32; 5] = [128, 256, 512, 1024, 2048];

/// Padding added to the right and top of every source to keep bilinear filtering from bleeding
/// into neighbors.
pub const GUTTER: u32 = 1;

/// Builds an atlas with the default [`EtagerePacker`].
pub fn build_atlas(sources: &[PixelBuffer]) -> Result<Atlas> {
    build_atlas_with(&mut EtagerePacker, sources)
}

/// Packs all sources into the smallest candidate canvas they fit in and composites them into an
/// Rgba8 texture.
///
/// Each candidate is packed from scratch, so the result depends only on the ordered sources.
#[instrument(skip_all, fields(sources = sources.len()))]
pub fn build_atlas_with(
    packer: &mut impl RectanglePacker,
    sources: &[PixelBuffer],
) -> Result<Atlas> {
    let padded_sizes: Vec<SizePx> = sources
        .iter()
        .map(|source| size2(source.width() + GUTTER, source.height() + GUTTER))
        .collect();

    let (dim, positions) = find_canvas(packer, &padded_sizes)?;

    let mut pixels = PixelBuffer::allocate(dim, dim, PixelFormat::Rgba8)?;
    let mut placements = Vec::with_capacity(sources.len());

    for (source, position) in sources.iter().zip(positions) {
        composite(&mut pixels, source, position);
        placements.push(PlacementRect::packed(
            position.x,
            position.y,
            source.width(),
            source.height(),
        ));
    }

    info!(
        "Built {dim}x{dim} atlas from {} sources",
        placements.len()
    );

    Ok(Atlas::new(pixels, placements))
}

fn find_canvas(
    packer: &mut impl RectanglePacker,
    sizes: &[SizePx],
) -> Result<(u32, Vec<PointPx>)> {
    for dim in CANVAS_SIZES {
        let positions: Option<Vec<PointPx>> =
            packer.pack(sizes, size2(dim, dim)).into_iter().collect();

        match positions {
            Some(positions) if positions.len() == sizes.len() => return Ok((dim, positions)),
            _ => debug!("{} rectangles do not fit into {dim}x{dim}", sizes.len()),
        }
    }

    let max = CANVAS_SIZES[CANVAS_SIZES.len() - 1];
    Err(Error::atlas_too_large(format!(
        "{} sources do not fit into {max}x{max}",
        sizes.len()
    )))
}

/// Copies a source into the atlas at `position`, converting its pixels to Rgba8. The gutter stays
/// transparent.
fn composite(atlas: &mut PixelBuffer, source: &PixelBuffer, position: PointPx) {
    for y in 0..source.height() {
        for x in 0..source.width() {
            atlas.set_pixel(position.x + x, position.y + y, source.pixel(x, y));
        }
    }
}
