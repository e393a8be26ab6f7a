//! Pen based text layout in y-up pixel space.
//!
//! A newline returns the pen to the x it started at and moves it one line (the font's pixel
//! size) down.
use boxworld_geometry::{Color, Point, Size};

use super::FontAtlas;
use crate::{
    batch::{QuadSink, TexturedQuad},
    utf8::decode_all,
};

const NEWLINE: u32 = '\n' as u32;

impl FontAtlas {
    /// Emits the quad of one glyph and returns the advanced pen.
    ///
    /// Unknown codepoints leave the pen unchanged. Glyphs without pixels only advance.
    pub fn render_char(
        &self,
        sink: &mut impl QuadSink,
        pen: Point,
        codepoint: u32,
        color: Color,
    ) -> Point {
        let Some(glyph) = self.find_glyph(codepoint) else {
            return pen;
        };

        if glyph.placement.packed {
            let start_pos = pen + glyph.metrics.origin();
            let (start_uv, end_uv) = self.uv_rect(glyph);
            sink.push_quad(TexturedQuad {
                start_pos,
                start_uv,
                end_pos: start_pos + glyph.size(),
                end_uv,
                color,
            });
        }

        pen.with_x(pen.x + glyph.metrics.advance)
    }

    /// Renders codepoints left to right, handling newlines. Returns the final pen.
    pub fn render_codepoints(
        &self,
        sink: &mut impl QuadSink,
        pen: Point,
        codepoints: impl IntoIterator<Item = u32>,
        color: Color,
    ) -> Point {
        let line_start = pen.x;
        codepoints.into_iter().fold(pen, |pen, codepoint| {
            if codepoint == NEWLINE {
                self.next_line(pen, line_start)
            } else {
                self.render_char(sink, pen, codepoint, color)
            }
        })
    }

    pub fn render_str(
        &self,
        sink: &mut impl QuadSink,
        pen: Point,
        text: &str,
        color: Color,
    ) -> Point {
        self.render_codepoints(sink, pen, text.chars().map(u32::from), color)
    }

    /// Renders raw UTF-8 bytes. Malformed sequences are dropped and decoding resumes at the next
    /// byte.
    pub fn render_utf8(
        &self,
        sink: &mut impl QuadSink,
        pen: Point,
        bytes: &[u8],
        color: Color,
    ) -> Point {
        self.render_codepoints(sink, pen, decode_all(bytes), color)
    }

    /// The extent of `text`: the widest line by the number of lines times the line height.
    pub fn measure_str(&self, text: &str) -> Size {
        let line_height = self.pixel_size() as f64;
        let (widest, lines) = text.split('\n').fold((0.0f64, 0), |(widest, lines), line| {
            let width: f64 = line
                .chars()
                .filter_map(|c| self.find_glyph(c.into()))
                .map(|glyph| glyph.metrics.advance)
                .sum();
            (widest.max(width), lines + 1)
        });
        Size::new(widest, lines as f64 * line_height)
    }

    fn next_line(&self, pen: Point, line_start: f64) -> Point {
        Point::new(line_start, pen.y - self.pixel_size() as f64)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::font::font_atlas::tests::bake;

    const WHITE: Color = Color::WHITE;

    #[test]
    fn single_glyph_quad() {
        let font = bake(&[65]);
        let mut quads = Vec::new();
        let pen = font.render_char(&mut quads, Point::new(10.0, 20.0), 65, WHITE);

        assert_eq!(pen, Point::new(18.0, 20.0));
        assert_eq!(quads.len(), 1);

        let quad = quads[0];
        // Origin (1, -2), 4x10 bitmap.
        assert_eq!(quad.start_pos, Point::new(11.0, 18.0));
        assert_eq!(quad.end_pos, Point::new(15.0, 28.0));

        let placement = font.find_glyph(65).unwrap().placement;
        let texture = font.texture();
        assert_relative_eq!(quad.start_uv.x, placement.x as f64 / texture.width() as f64);
        assert_relative_eq!(quad.start_uv.y, placement.y as f64 / texture.height() as f64);
        assert_relative_eq!(
            quad.end_uv.y,
            (placement.y + placement.height) as f64 / texture.height() as f64
        );
    }

    #[test]
    fn unknown_codepoint_keeps_the_pen() {
        let font = bake(&[65]);
        let mut quads = Vec::new();
        let pen = Point::new(3.0, 4.0);
        assert_eq!(font.render_char(&mut quads, pen, 90, WHITE), pen);
        assert!(quads.is_empty());
    }

    #[test]
    fn empty_glyph_advances_without_a_quad() {
        let font = bake(&[' ' as u32, 65]);
        let mut quads = Vec::new();
        let pen = font.render_str(&mut quads, Point::ZERO, " A", WHITE);
        assert_eq!(pen, Point::new(12.0, 0.0));
        assert_eq!(quads.len(), 1);
    }

    #[test]
    fn newline_equals_rendering_from_the_next_line() {
        let font = bake(&[65, 66]);
        let start = Point::new(5.0, 100.0);

        let mut combined = Vec::new();
        let end = font.render_str(&mut combined, start, "A\nB", WHITE);

        let mut separate = Vec::new();
        let after_a = font.render_str(&mut separate, start, "A", WHITE);
        let next_line = Point::new(start.x, after_a.y - font.pixel_size() as f64);
        let separate_end = font.render_str(&mut separate, next_line, "B", WHITE);

        assert_eq!(end, separate_end);
        assert_eq!(combined, separate);
        assert_eq!(start.y - end.y, 16.0);
    }

    #[test]
    fn newlines_accumulate() {
        let font = bake(&[65]);
        let mut quads = Vec::new();
        let end = font.render_str(&mut quads, Point::new(2.0, 0.0), "A\n\nA", WHITE);
        assert_eq!(end, Point::new(10.0, -32.0));
        assert_eq!(quads.len(), 2);
    }

    #[test]
    fn utf8_rendering_resynchronizes() {
        let font = bake(&[65, 66]);

        let mut from_bytes = Vec::new();
        let end = font.render_utf8(&mut from_bytes, Point::ZERO, b"A\xe2\x82B\x80", WHITE);

        let mut from_str = Vec::new();
        let expected = font.render_str(&mut from_str, Point::ZERO, "AB", WHITE);

        assert_eq!(end, expected);
        assert_eq!(from_bytes, from_str);
    }

    #[test]
    fn measures_widest_line() {
        let font = bake(&[65, 66, ' ' as u32]);
        let size = font.measure_str("AB A\nA");
        assert_eq!(size, Size::new(28.0, 32.0));
        assert_eq!(font.measure_str(""), Size::new(0.0, 16.0));
    }
}
