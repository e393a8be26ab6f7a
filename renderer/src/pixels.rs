//! Format tagged pixel storage.
//!
//! Every [`PixelBuffer`] is stored bottom-up: row 0 is the bottom row of the image, which is what
//! the GPU samples at `v = 0`. Producers of top-down rows (the image codec and the glyph
//! rasterizer) go through [`PixelBuffer::from_top_down_rows`], so the flip happens exactly once,
//! on entry.
use std::{fmt, io::Cursor, path::Path};

use boxworld_geometry::SizePx;
use image::{ColorType, DynamicImage, ImageError, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Alpha8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Alpha8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    pub const fn tag(self) -> u8 {
        match self {
            PixelFormat::Alpha8 => 0,
            PixelFormat::Rgb8 => 1,
            PixelFormat::Rgba8 => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(PixelFormat::Alpha8),
            1 => Ok(PixelFormat::Rgb8),
            2 => Ok(PixelFormat::Rgba8),
            _ => Err(Error::unsupported_format(format!(
                "unknown pixel format tag {tag}"
            ))),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPixelBuffer", into = "RawPixelBuffer")]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl PixelBuffer {
    /// Allocates a zero-filled buffer.
    pub fn allocate(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let len = byte_len(width, height, format)?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| {
            Error::not_enough_memory(format!(
                "cannot allocate {width}x{height} {format:?} pixels ({len} bytes)"
            ))
        })?;
        pixels.resize(len, 0);

        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// Wraps bottom-up pixel bytes.
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Result<Self> {
        let len = byte_len(width, height, format)?;
        if pixels.len() != len {
            return Err(Error::invalid_format(format!(
                "{width}x{height} {format:?} needs {len} bytes, got {}",
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }

    /// Creates a buffer from top-down rows: source row `r` lands in buffer row `height - 1 - r`.
    pub fn from_top_down_rows(
        width: u32,
        height: u32,
        format: PixelFormat,
        rows: &[u8],
    ) -> Result<Self> {
        let mut buffer = Self::allocate(width, height, format)?;
        if rows.len() != buffer.pixels.len() {
            return Err(Error::invalid_format(format!(
                "{width}x{height} {format:?} needs {} bytes, got {}",
                buffer.pixels.len(),
                rows.len()
            )));
        }

        let stride = buffer.stride();
        for (r, source_row) in rows.chunks_exact(stride).enumerate() {
            let target = (height as usize - 1 - r) * stride;
            buffer.pixels[target..target + stride].copy_from_slice(source_row);
        }

        Ok(buffer)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> SizePx {
        (self.width, self.height).into()
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The raw bottom-up bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Reads a pixel as RGBA.
    ///
    /// Alpha8 pixels read back as white with the stored alpha, Rgb8 pixels as opaque.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = self.offset(x, y);
        let p = &self.pixels[offset..offset + self.format.bytes_per_pixel()];
        match self.format {
            PixelFormat::Alpha8 => [0xff, 0xff, 0xff, p[0]],
            PixelFormat::Rgb8 => [p[0], p[1], p[2], 0xff],
            PixelFormat::Rgba8 => [p[0], p[1], p[2], p[3]],
        }
    }

    /// Writes an RGBA pixel, dropping the channels the format does not store.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let offset = self.offset(x, y);
        let bpp = self.format.bytes_per_pixel();
        let p = &mut self.pixels[offset..offset + bpp];
        match self.format {
            PixelFormat::Alpha8 => p[0] = rgba[3],
            PixelFormat::Rgb8 => p.copy_from_slice(&rgba[..3]),
            PixelFormat::Rgba8 => p.copy_from_slice(&rgba),
        }
    }

    /// Converts to an Rgba8 buffer. Returns a clone if already Rgba8.
    pub fn to_rgba8(&self) -> Result<PixelBuffer> {
        if self.format == PixelFormat::Rgba8 {
            return Ok(self.clone());
        }

        let mut rgba = Self::allocate(self.width, self.height, PixelFormat::Rgba8)?;
        for y in 0..self.height {
            for x in 0..self.width {
                rgba.set_pixel(x, y, self.pixel(x, y));
            }
        }
        Ok(rgba)
    }

    /// The pixel bytes in top-down row order, as image encoders expect them.
    pub fn to_top_down_rows(&self) -> Vec<u8> {
        let mut rows = Vec::with_capacity(self.pixels.len());
        for row in self.pixels.chunks_exact(self.stride()).rev() {
            rows.extend_from_slice(row);
        }
        rows
    }

    /// Encodes the buffer as an RGBA PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let rgba = self.to_rgba8()?;
        let image = RgbaImage::from_raw(rgba.width, rgba.height, rgba.to_top_down_rows())
            .ok_or_else(|| Error::invalid_format("pixel data does not match the dimensions"))?;

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| image_error(e, "<png>"))?;
        Ok(png.into_inner())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width, "x {x} out of range (width {})", self.width);
        debug_assert!(y < self.height, "y {y} out of range (height {})", self.height);
        (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel()
    }
}

fn byte_len(width: u32, height: u32, format: PixelFormat) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::invalid_format(format!(
            "pixel buffer dimensions must be positive, got {width}x{height}"
        )));
    }

    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(format.bytes_per_pixel()))
        .ok_or_else(|| {
            Error::not_enough_memory(format!("{width}x{height} {format:?} overflows memory"))
        })
}

/// Decodes an image file into a bottom-up [`PixelBuffer`].
///
/// Gray images become Alpha8 (the gray level is the alpha), gray-alpha images become Alpha8 with
/// their alpha channel, RGB becomes Rgb8 and everything else Rgba8. Channels deeper than 8 bits
/// are reduced to 8 bits.
pub fn decode_image_file(path: impl AsRef<Path>) -> Result<PixelBuffer> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|e| image_error(e, &path.display().to_string()))?;
    image_to_pixel_buffer(image)
}

pub fn decode_image_bytes(bytes: &[u8]) -> Result<PixelBuffer> {
    let image = image::load_from_memory(bytes).map_err(|e| image_error(e, "<memory>"))?;
    image_to_pixel_buffer(image)
}

fn image_to_pixel_buffer(image: DynamicImage) -> Result<PixelBuffer> {
    let (width, height) = (image.width(), image.height());

    let (format, rows) = match image.color() {
        ColorType::L8 | ColorType::L16 => (PixelFormat::Alpha8, image.into_luma8().into_raw()),
        ColorType::La8 | ColorType::La16 => {
            let alpha = image
                .into_luma_alpha8()
                .into_raw()
                .chunks_exact(2)
                .map(|la| la[1])
                .collect();
            (PixelFormat::Alpha8, alpha)
        }
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => {
            (PixelFormat::Rgb8, image.into_rgb8().into_raw())
        }
        _ => (PixelFormat::Rgba8, image.into_rgba8().into_raw()),
    };

    PixelBuffer::from_top_down_rows(width, height, format, &rows)
}

fn image_error(error: ImageError, source: &str) -> Error {
    match error {
        ImageError::IoError(e) => Error::file_not_found(format!("{source}: {e}")),
        ImageError::Limits(e) => Error::not_enough_memory(format!("{source}: {e}")),
        e => Error::invalid_format(format!("{source}: {e}")),
    }
}

/// Serialized form: the format travels as a tag so unknown formats are rejected on load.
#[derive(Serialize, Deserialize)]
struct RawPixelBuffer {
    width: u32,
    height: u32,
    format: u8,
    pixels: Vec<u8>,
}

impl From<PixelBuffer> for RawPixelBuffer {
    fn from(buffer: PixelBuffer) -> Self {
        Self {
            width: buffer.width,
            height: buffer.height,
            format: buffer.format.tag(),
            pixels: buffer.pixels,
        }
    }
}

impl TryFrom<RawPixelBuffer> for PixelBuffer {
    type Error = Error;

    fn try_from(raw: RawPixelBuffer) -> Result<Self> {
        let format = PixelFormat::from_tag(raw.format)?;
        PixelBuffer::from_raw(raw.width, raw.height, format, raw.pixels)
    }
}
