//! TrueType font rendering via [`fontdue`].
//!
//! Scalable fonts share the bitmap path's cell contract: a fixed cell size
//! derived once from the font metrics, and line rendering into an RGBA
//! buffer. Glyphs are rasterized lazily and kept in a per-font cache.

use std::collections::HashMap;

use fontdue::{Font as FontdueFont, FontSettings};
use image::{Rgba, RgbaImage};
use tileterm_core::Color;

use crate::{FontError, FontRenderer};

/// Cached rasterized glyph (coverage values, one byte per pixel).
struct RasterGlyph {
    coverage: Vec<u8>,
    width: usize,
    height: usize,
    x_offset: i32,
    y_offset: i32,
}

/// A scalable font fixed to one pixel size.
pub struct TtfFont {
    font: FontdueFont,
    size: f32,
    cell_width: u32,
    cell_height: u32,
    ascent: i32,
    cache: HashMap<char, RasterGlyph>,
}

impl TtfFont {
    /// Parse TrueType data and fix the cell geometry at `size` pixels.
    ///
    /// Cell height comes from the line metrics, cell width from the 'M'
    /// advance (monospace assumption).
    pub fn new(data: &[u8], size: f32) -> Result<Self, FontError> {
        let font = FontdueFont::from_bytes(data, FontSettings::default())
            .map_err(|e| FontError::InvalidTruetype(e.to_string()))?;

        let metrics = font
            .horizontal_line_metrics(size)
            .unwrap_or(fontdue::LineMetrics {
                ascent: size * 0.8,
                descent: -(size * 0.2),
                line_gap: 0.0,
                new_line_size: size,
            });
        let cell_height = (metrics.ascent - metrics.descent).ceil() as u32;
        let ascent = metrics.ascent.ceil() as i32;

        let (m_metrics, _) = font.rasterize('M', size);
        let cell_width = m_metrics.advance_width.ceil() as u32;

        Ok(Self {
            font,
            size,
            cell_width: cell_width.max(1),
            cell_height: cell_height.max(1),
            ascent,
            cache: HashMap::new(),
        })
    }

    fn cache_glyph(&mut self, ch: char) {
        if self.cache.contains_key(&ch) {
            return;
        }
        let (metrics, coverage) = self.font.rasterize(ch, self.size);
        self.cache.insert(
            ch,
            RasterGlyph {
                coverage,
                width: metrics.width,
                height: metrics.height,
                x_offset: metrics.xmin,
                y_offset: metrics.ymin,
            },
        );
    }

    /// Render one line of text; each character occupies one cell column.
    pub fn render_line(&mut self, text: &str, fg: Color, bg: Color) -> RgbaImage {
        let chars = text.chars().count() as u32;
        let mut out = RgbaImage::from_pixel(
            (chars * self.cell_width).max(1),
            self.cell_height,
            Rgba(bg.to_bytes()),
        );
        if fg == bg {
            return out;
        }

        let [fg_r, fg_g, fg_b, _] = fg.to_bytes();
        let [bg_r, bg_g, bg_b, _] = bg.to_bytes();

        for (i, ch) in text.chars().enumerate() {
            if ch == ' ' || ch == '\0' {
                continue;
            }
            self.cache_glyph(ch);
            let glyph = &self.cache[&ch];
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }

            let x0 = i as i32 * self.cell_width as i32;
            // Top-left of the glyph bitmap relative to the cell top.
            let glyph_y = self.ascent - glyph.y_offset - glyph.height as i32;

            for gy in 0..glyph.height {
                for gx in 0..glyph.width {
                    let alpha = glyph.coverage[gy * glyph.width + gx] as u32;
                    if alpha == 0 {
                        continue;
                    }
                    let px = x0 + glyph.x_offset + gx as i32;
                    let py = glyph_y + gy as i32;
                    if px < 0 || py < 0 || px >= out.width() as i32 || py >= out.height() as i32 {
                        continue;
                    }

                    // Alpha-blend foreground over background.
                    let inv = 255 - alpha;
                    let r = ((fg_r as u32 * alpha + bg_r as u32 * inv) / 255) as u8;
                    let g = ((fg_g as u32 * alpha + bg_g as u32 * inv) / 255) as u8;
                    let b = ((fg_b as u32 * alpha + bg_b as u32 * inv) / 255) as u8;
                    out.put_pixel(px as u32, py as u32, Rgba([r, g, b, 0xFF]));
                }
            }
        }
        out
    }
}

impl FontRenderer for TtfFont {
    fn cell_width(&self) -> u32 {
        self.cell_width
    }

    fn cell_height(&self) -> u32 {
        self.cell_height
    }

    fn render_line(&mut self, text: &str, fg: Color, bg: Color) -> RgbaImage {
        TtfFont::render_line(self, text, fg, bg)
    }
}
