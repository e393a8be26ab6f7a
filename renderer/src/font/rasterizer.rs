use std::{fs, io, path::Path};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use swash::{
    CacheKey, FontRef,
    scale::{Render, ScaleContext, Source},
    zeno::Format,
};

use crate::{
    Error, Result,
    pixels::{PixelBuffer, PixelFormat},
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RasterizationFlags: u8 {
        const HINTING = 0b001;
        /// Prefer the engine's automatic hinter over the font's instructions.
        const FORCE_AUTOHINT = 0b010;
        const ANTI_ALIAS = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterizationParam {
    pub pixel_size: u32,
    pub flags: RasterizationFlags,
}

impl RasterizationParam {
    pub fn new(pixel_size: u32, flags: RasterizationFlags) -> Self {
        Self { pixel_size, flags }
    }

    pub fn hinting(&self) -> bool {
        self.flags.contains(RasterizationFlags::HINTING)
    }

    pub fn anti_alias(&self) -> bool {
        self.flags.contains(RasterizationFlags::ANTI_ALIAS)
    }
}

/// Pixel space bounds of a glyph relative to the pen, y pointing up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl GlyphBounds {
    pub fn width(&self) -> u32 {
        self.max_x.abs_diff(self.min_x)
    }

    pub fn height(&self) -> u32 {
        self.max_y.abs_diff(self.min_y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    /// Horizontal pen advance in pixels.
    pub advance: f64,
    pub bounds: GlyphBounds,
    /// Alpha8 coverage, bottom-up. `None` for glyphs without any pixels, like the space.
    pub bitmap: Option<PixelBuffer>,
}

/// Renders single codepoints into coverage bitmaps.
pub trait GlyphRasterizer {
    /// Returns `None` if the codepoint can not be rasterized. Callers skip these glyphs.
    fn rasterize(&mut self, codepoint: u32, param: &RasterizationParam)
    -> Option<RasterizedGlyph>;
}

/// A [`GlyphRasterizer`] for one font face, backed by swash.
pub struct SwashRasterizer {
    data: Vec<u8>,
    offset: u32,
    key: CacheKey,
    context: ScaleContext,
}

impl SwashRasterizer {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            let message = format!("{}: {e}", path.display());
            match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    Error::file_not_found(message)
                }
                _ => Error::load_failed(message),
            }
        })?;
        Self::from_bytes(data)
    }

    /// Loads the first face of a font file or collection.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let font = FontRef::from_index(&data, 0)
            .ok_or_else(|| Error::load_failed("not a valid font file"))?;
        let (offset, key) = (font.offset, font.key);
        Ok(Self {
            data,
            offset,
            key,
            context: ScaleContext::new(),
        })
    }
}

impl GlyphRasterizer for SwashRasterizer {
    fn rasterize(
        &mut self,
        codepoint: u32,
        param: &RasterizationParam,
    ) -> Option<RasterizedGlyph> {
        let font = FontRef {
            data: &self.data,
            offset: self.offset,
            key: self.key,
        };

        let glyph_id = font.charmap().map(codepoint);
        if glyph_id == 0 {
            log::debug!("No glyph for U+{codepoint:04X} in font");
            return None;
        }

        let size = param.pixel_size as f32;
        let advance = font
            .glyph_metrics(&[])
            .scale(size)
            .advance_width(glyph_id)
            .round();

        let mut scaler = self
            .context
            .builder(font)
            .size(size)
            .hint(param.hinting())
            .build();

        let image = Render::new(&[Source::Outline])
            .format(Format::Alpha)
            .render(&mut scaler, glyph_id)?;

        let placement = image.placement;
        let bounds = GlyphBounds {
            min_x: placement.left,
            min_y: placement.top - placement.height as i32,
            max_x: placement.left + placement.width as i32,
            max_y: placement.top,
        };

        let bitmap = if placement.width == 0 || placement.height == 0 {
            None
        } else {
            let mut coverage = image.data;
            if !param.anti_alias() {
                threshold_coverage(&mut coverage);
            }
            match PixelBuffer::from_top_down_rows(
                placement.width,
                placement.height,
                PixelFormat::Alpha8,
                &coverage,
            ) {
                Ok(bitmap) => Some(bitmap),
                Err(e) => {
                    log::warn!("Unexpected glyph image for U+{codepoint:04X}: {e}");
                    return None;
                }
            }
        };

        Some(RasterizedGlyph {
            advance: advance as f64,
            bounds,
            bitmap,
        })
    }
}

/// Turns gray levels into mono coverage: fully opaque or fully transparent.
pub fn threshold_coverage(coverage: &mut [u8]) {
    for alpha in coverage {
        *alpha = if *alpha >= 0x80 { 0xff } else { 0x00 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn mono_coverage_is_thresholded_at_half() {
        let mut coverage = [0x00, 0x7f, 0x80, 0xc0, 0xff];
        threshold_coverage(&mut coverage);
        assert_eq!(coverage, [0x00, 0x00, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn missing_font_file_is_file_not_found() {
        let error = SwashRasterizer::from_file("/nonexistent/boxworld.ttf")
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn garbage_font_data_fails_to_load() {
        let error = SwashRasterizer::from_bytes(b"definitely not a font".to_vec())
            .err()
            .unwrap();
        assert_eq!(error.kind(), ErrorKind::LoadFailed);
    }

    #[test]
    fn bounds_size() {
        let bounds = GlyphBounds {
            min_x: -1,
            min_y: -3,
            max_x: 6,
            max_y: 9,
        };
        assert_eq!(bounds.width(), 7);
        assert_eq!(bounds.height(), 12);
    }

    #[test]
    fn param_flags() {
        let param = RasterizationParam::new(
            16,
            RasterizationFlags::HINTING | RasterizationFlags::FORCE_AUTOHINT,
        );
        assert!(param.hinting());
        assert!(!param.anti_alias());
    }
}
