use boxworld_geometry::{PointPx, SizePx};
use etagere::AtlasAllocator;
use euclid::size2;

/// Bin-packs rectangles into a canvas.
///
/// Implementations must be deterministic: the same sizes in the same order on the same canvas
/// produce the same positions.
pub trait RectanglePacker {
    /// Returns the bottom-left position for each size, or `None` for the ones that did not fit.
    fn pack(&mut self, sizes: &[SizePx], canvas: SizePx) -> Vec<Option<PointPx>>;
}

/// The default packer, backed by a fresh [`etagere::AtlasAllocator`] per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct EtagerePacker;

impl RectanglePacker for EtagerePacker {
    fn pack(&mut self, sizes: &[SizePx], canvas: SizePx) -> Vec<Option<PointPx>> {
        let mut allocator = AtlasAllocator::new(size2(canvas.width as i32, canvas.height as i32));

        sizes
            .iter()
            .map(|size| {
                let allocation =
                    allocator.allocate(size2(size.width as i32, size.height as i32))?;
                // The allocation might be larger than requested, only its origin is relevant.
                let min = allocation.rectangle.min;
                Some(PointPx::new(min.x as u32, min.y as u32))
            })
            .collect()
    }
}
