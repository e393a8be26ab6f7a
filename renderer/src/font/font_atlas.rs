use std::{cmp::Ordering, collections::HashSet, path::Path};

use boxworld_geometry::{Point, Size, SizePx};
use euclid::size2;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{
    GlyphBounds, GlyphRasterizer, RasterizationFlags, RasterizationParam, SwashRasterizer,
};
use crate::{
    Error, Result,
    atlas::{Atlas, PlacementRect, build_atlas},
    pixels::PixelBuffer,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlyphMetrics {
    pub codepoint: u32,
    pub advance: f64,
    pub bounds: GlyphBounds,
}

impl GlyphMetrics {
    /// The offset of the bitmap's bottom-left corner from the pen.
    pub fn origin(&self) -> Point {
        Point::new(self.bounds.min_x as f64, self.bounds.min_y as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub metrics: GlyphMetrics,
    /// Empty and not packed for glyphs without pixels.
    pub placement: PlacementRect,
}

impl Glyph {
    pub fn codepoint(&self) -> u32 {
        self.metrics.codepoint
    }

    pub fn size(&self) -> Size {
        self.placement.size()
    }
}

/// A font baked at one pixel size into an atlas, with a glyph table sorted by codepoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontAtlas {
    atlas: Atlas,
    glyphs: Vec<Glyph>,
    pixel_size: u32,
    max_glyph_size: SizePx,
}

impl FontAtlas {
    /// Rasterizes `codepoints` and packs them into a new atlas.
    ///
    /// Codepoints the rasterizer can not render are skipped with a warning. Duplicates are
    /// rejected.
    #[instrument(skip(rasterizer, codepoints), fields(codepoints = codepoints.len()))]
    pub fn bake(
        rasterizer: &mut impl GlyphRasterizer,
        param: RasterizationParam,
        codepoints: &[u32],
    ) -> Result<Self> {
        if param.pixel_size == 0 {
            return Err(Error::load_failed("pixel size must be positive"));
        }

        let mut seen = HashSet::with_capacity(codepoints.len());
        if let Some(duplicate) = codepoints.iter().find(|cp| !seen.insert(**cp)) {
            return Err(Error::invalid_format(format!(
                "codepoint U+{duplicate:04X} requested more than once"
            )));
        }

        if param.flags.contains(RasterizationFlags::FORCE_AUTOHINT) {
            debug!("Automatic hinting is not available, using the font's own hints");
        }

        let mut metrics = Vec::with_capacity(codepoints.len());
        // Index into `bitmaps` per entry in `metrics`.
        let mut bitmap_slots = Vec::with_capacity(codepoints.len());
        let mut bitmaps = Vec::with_capacity(codepoints.len());

        for &codepoint in codepoints {
            let Some(glyph) = rasterizer.rasterize(codepoint, &param) else {
                warn!("Skipping U+{codepoint:04X}: failed to rasterize");
                continue;
            };

            bitmap_slots.push(glyph.bitmap.map(|bitmap| {
                bitmaps.push(bitmap);
                bitmaps.len() - 1
            }));
            metrics.push(GlyphMetrics {
                codepoint,
                advance: glyph.advance,
                bounds: glyph.bounds,
            });
        }

        let atlas = build_atlas(&bitmaps)?;

        let mut glyphs: Vec<Glyph> = metrics
            .into_iter()
            .zip(bitmap_slots)
            .map(|(metrics, slot)| Glyph {
                metrics,
                placement: slot
                    .and_then(|i| atlas.placement(i).copied())
                    .unwrap_or_default(),
            })
            .collect();
        glyphs.sort_unstable_by_key(Glyph::codepoint);

        let max_glyph_size = glyphs.iter().fold(size2(0, 0), |max: SizePx, glyph| {
            size2(
                max.width.max(glyph.metrics.bounds.width()),
                max.height.max(glyph.metrics.bounds.height()),
            )
        });

        info!(
            "Baked {} of {} glyphs at {}px into a {}x{} atlas",
            glyphs.len(),
            codepoints.len(),
            param.pixel_size,
            atlas.pixels().width(),
            atlas.pixels().height()
        );

        Ok(Self {
            atlas,
            glyphs,
            pixel_size: param.pixel_size,
            max_glyph_size,
        })
    }

    /// Loads a font file and bakes `codepoints` with swash.
    pub fn bake_font(
        path: impl AsRef<Path>,
        pixel_size: u32,
        use_hinting: bool,
        force_autohint: bool,
        anti_alias: bool,
        codepoints: &[u32],
    ) -> Result<Self> {
        let mut rasterizer = SwashRasterizer::from_file(path)?;
        let mut flags = RasterizationFlags::empty();
        flags.set(RasterizationFlags::HINTING, use_hinting);
        flags.set(RasterizationFlags::FORCE_AUTOHINT, force_autohint);
        flags.set(RasterizationFlags::ANTI_ALIAS, anti_alias);
        Self::bake(
            &mut rasterizer,
            RasterizationParam::new(pixel_size, flags),
            codepoints,
        )
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn texture(&self) -> &PixelBuffer {
        self.atlas.pixels()
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// The line height.
    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    pub fn max_glyph_size(&self) -> SizePx {
        self.max_glyph_size
    }

    pub fn find_glyph(&self, codepoint: u32) -> Option<&Glyph> {
        self.glyph_index(codepoint).map(|i| &self.glyphs[i])
    }

    /// Binary search over the sorted glyph table.
    pub fn glyph_index(&self, codepoint: u32) -> Option<usize> {
        let glyphs = &self.glyphs;
        match glyphs.len() {
            0 => return None,
            1 => return (glyphs[0].codepoint() == codepoint).then_some(0),
            _ => {}
        }

        let mut left = 0;
        let mut right = glyphs.len() - 1;
        if codepoint < glyphs[left].codepoint() || codepoint > glyphs[right].codepoint() {
            return None;
        }

        while left <= right {
            let middle = left + (right - left) / 2;
            match codepoint.cmp(&glyphs[middle].codepoint()) {
                Ordering::Equal => return Some(middle),
                Ordering::Greater => left = middle + 1,
                Ordering::Less if middle == 0 => return None,
                Ordering::Less => right = middle - 1,
            }
        }

        None
    }

    /// Texture coordinates of a glyph: `(min, max)`.
    pub fn uv_rect(&self, glyph: &Glyph) -> (Point, Point) {
        self.atlas.uv_rect(&glyph.placement)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_stdvec(self)
            .map_err(|e| Error::invalid_format(format!("failed to serialize font atlas: {e}")))
    }

    /// Restores a font atlas from [`FontAtlas::to_bytes`] output and verifies its glyph table.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font: Self = postcard::from_bytes(bytes)
            .map_err(|e| Error::invalid_format(format!("failed to read font atlas: {e}")))?;
        font.validate()?;
        Ok(font)
    }

    fn validate(&self) -> Result<()> {
        if self.pixel_size == 0 {
            return Err(Error::invalid_format("font atlas has no pixel size"));
        }

        if let Some(pair) = self
            .glyphs
            .windows(2)
            .find(|pair| pair[0].codepoint() >= pair[1].codepoint())
        {
            return Err(Error::invalid_format(format!(
                "glyph table is not strictly increasing at U+{:04X}",
                pair[1].codepoint()
            )));
        }

        let texture = self.atlas.pixels().size();
        if let Some(glyph) = self.glyphs.iter().find(|glyph| {
            let p = glyph.placement;
            p.x.saturating_add(p.width) > texture.width
                || p.y.saturating_add(p.height) > texture.height
        }) {
            return Err(Error::invalid_format(format!(
                "placement of U+{:04X} is outside of the atlas",
                glyph.codepoint()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        ErrorKind,
        font::RasterizedGlyph,
        pixels::{PixelBuffer, PixelFormat},
    };

    /// Produces `(codepoint % 7 + 2) x 10` boxes with an advance of 8 and refuses codepoints in
    /// `failing`. Spaces have no bitmap.
    #[derive(Default)]
    pub struct FakeRasterizer {
        pub failing: Vec<u32>,
        pub requested: Vec<u32>,
    }

    impl GlyphRasterizer for FakeRasterizer {
        fn rasterize(
            &mut self,
            codepoint: u32,
            _param: &RasterizationParam,
        ) -> Option<RasterizedGlyph> {
            self.requested.push(codepoint);
            if self.failing.contains(&codepoint) {
                return None;
            }
            if codepoint == ' ' as u32 {
                return Some(RasterizedGlyph {
                    advance: 4.0,
                    bounds: GlyphBounds::default(),
                    bitmap: None,
                });
            }

            let width = codepoint % 7 + 2;
            let mut bitmap = PixelBuffer::allocate(width, 10, PixelFormat::Alpha8).ok()?;
            bitmap.set_pixel(0, 0, [0, 0, 0, codepoint as u8]);
            Some(RasterizedGlyph {
                advance: 8.0,
                bounds: GlyphBounds {
                    min_x: 1,
                    min_y: -2,
                    max_x: 1 + width as i32,
                    max_y: 8,
                },
                bitmap: Some(bitmap),
            })
        }
    }

    pub fn param() -> RasterizationParam {
        RasterizationParam::new(16, RasterizationFlags::ANTI_ALIAS)
    }

    pub fn bake(codepoints: &[u32]) -> FontAtlas {
        FontAtlas::bake(&mut FakeRasterizer::default(), param(), codepoints).unwrap()
    }

    #[test]
    fn finds_glyphs_by_codepoint() {
        let font = bake(&[67, 65, 66]);
        let glyph = font.find_glyph(66).unwrap();
        assert_eq!(glyph.codepoint(), 'B' as u32);
        assert!(font.find_glyph(68).is_none());
        assert!(font.find_glyph(64).is_none());
        assert_eq!(font.glyph_index(65), Some(0));
        assert_eq!(font.glyph_index(67), Some(2));
    }

    #[test]
    fn lookup_in_small_tables() {
        let empty = bake(&[]);
        assert!(empty.find_glyph(65).is_none());

        let single = bake(&[65]);
        assert_eq!(single.glyph_index(65), Some(0));
        assert!(single.find_glyph(0).is_none());
        assert!(single.find_glyph(66).is_none());
    }

    #[test]
    fn lookup_finds_every_entry_and_no_gaps() {
        let codepoints: Vec<u32> = (32..127).filter(|cp| cp % 3 != 0).collect();
        let font = bake(&codepoints);
        for (i, cp) in codepoints.iter().enumerate() {
            assert_eq!(font.glyph_index(*cp), Some(i));
        }
        for cp in (0..200).filter(|cp| cp % 3 == 0) {
            assert!(font.find_glyph(cp).is_none(), "{cp}");
        }
    }

    #[test]
    fn table_is_sorted_and_paired_with_placements() {
        let font = bake(&[90, 70, 80]);
        let codepoints: Vec<u32> = font.glyphs().iter().map(Glyph::codepoint).collect();
        assert_eq!(codepoints, vec![70, 80, 90]);

        let texture = font.texture();
        for glyph in font.glyphs() {
            let placement = glyph.placement;
            assert!(placement.packed);
            assert_eq!(placement.width, glyph.codepoint() % 7 + 2);
            assert_eq!(placement.height, 10);
            // The marker pixel ends up at the placement's origin.
            assert_eq!(
                texture.pixel(placement.x, placement.y)[3],
                glyph.codepoint() as u8
            );
        }
    }

    #[test]
    fn failed_glyphs_are_skipped() {
        let mut rasterizer = FakeRasterizer {
            failing: vec![66],
            ..Default::default()
        };
        let font = FontAtlas::bake(&mut rasterizer, param(), &[65, 66, 67]).unwrap();
        assert_eq!(rasterizer.requested, vec![65, 66, 67]);
        assert_eq!(font.glyphs().len(), 2);
        assert!(font.find_glyph(66).is_none());
        assert!(font.find_glyph(67).is_some());
    }

    #[test]
    fn empty_glyphs_are_kept_without_placement() {
        let font = bake(&[' ' as u32, 65]);
        let space = font.find_glyph(' ' as u32).unwrap();
        assert!(!space.placement.packed);
        assert!(space.placement.is_empty());
        assert_eq!(space.metrics.advance, 4.0);
        assert_eq!(font.atlas().len(), 1);
    }

    #[test]
    fn duplicate_codepoints_are_rejected() {
        let error =
            FontAtlas::bake(&mut FakeRasterizer::default(), param(), &[65, 66, 65]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn zero_pixel_size_fails_to_load() {
        let param = RasterizationParam::new(0, RasterizationFlags::empty());
        let error = FontAtlas::bake(&mut FakeRasterizer::default(), param, &[65]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::LoadFailed);
    }

    #[test]
    fn max_glyph_size_covers_all_glyphs() {
        let font = bake(&[65, 69]);
        // 'E' = 69: 69 % 7 + 2 = 8 wide.
        assert_eq!(font.max_glyph_size(), size2(8, 10));
        assert_eq!(font.pixel_size(), 16);
    }

    #[test]
    fn glyph_origin_is_bottom_left_of_bounds() {
        let font = bake(&[65]);
        let glyph = font.find_glyph(65).unwrap();
        assert_eq!(glyph.metrics.origin(), Point::new(1.0, -2.0));
    }

    #[test]
    fn survives_a_persistence_round_trip() {
        let font = bake(&[' ' as u32, 65, 66, 67]);
        let restored = FontAtlas::from_bytes(&font.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, font);
    }

    #[test]
    fn loading_rejects_unsorted_tables() {
        let mut font = bake(&[65, 66]);
        font.glyphs.swap(0, 1);
        let error = FontAtlas::from_bytes(&font.to_bytes().unwrap()).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidFormat);

        let error = FontAtlas::from_bytes(&[1, 2, 3]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidFormat);
    }

    #[test]
    fn missing_font_file() {
        let error =
            FontAtlas::bake_font("/nonexistent/font.ttf", 16, true, false, true, &[65]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::FileNotFound);
    }
}
