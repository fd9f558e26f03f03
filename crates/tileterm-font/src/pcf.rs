//! PCF bitmap font decoder.
//!
//! Parses the X11 PCF binary format into a [`GlyphAtlas`]: one RGBA image
//! holding every glyph side by side in a single row, plus a byte → glyph
//! index table. Only the three tables a monospace terminal font needs are
//! read (metrics, encodings, bitmaps); properties, accelerators and ink
//! metrics are skipped.
//!
//! The format is bit-exact and externally defined: multi-byte fields honor
//! a per-table byte-order flag, glyph rows honor a bit-order flag, one of
//! four row paddings, and a 1/2/4-byte scan unit. Every decode either
//! yields a complete atlas or a typed [`FontError`] — a partially decoded
//! font is never returned.

use image::{Rgba, RgbaImage};
use tileterm_core::Color;

use crate::{FontError, FontRenderer};

// ---------------------------------------------------------------------------
// Format constants
// ---------------------------------------------------------------------------

/// File magic: `0x01` followed by `fcp`.
const MAGIC: [u8; 4] = [0x01, b'f', b'c', b'p'];

/// Table types (bit flags in the table of contents).
const TABLE_METRICS: u32 = 1 << 2;
const TABLE_BITMAPS: u32 = 1 << 3;
const TABLE_ENCODINGS: u32 = 1 << 5;

/// Format word flags. The format word itself is always little-endian;
/// everything after it follows the order the word declares.
const FORMAT_GLYPH_PAD_MASK: u32 = 0b11;
const FORMAT_BYTE_ORDER_MSB: u32 = 1 << 2;
const FORMAT_BIT_ORDER_MSB: u32 = 1 << 3;
const FORMAT_SCAN_UNIT_SHIFT: u32 = 4;
const FORMAT_SCAN_UNIT_MASK: u32 = 0b11 << FORMAT_SCAN_UNIT_SHIFT;
const FORMAT_COMPRESSED_METRICS: u32 = 0x100;

/// "No glyph" sentinel in the encodings table.
const NO_GLYPH: u16 = 0xFFFF;

/// Upper bound on glyph count, as a corrupted-file guard.
const MAX_GLYPHS: usize = 0x10000;

// ---------------------------------------------------------------------------
// Byte reader
// ---------------------------------------------------------------------------

/// Cursor over the font bytes with a switchable byte order.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    msb: bool,
}

impl<'a> Reader<'a> {
    fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos,
            msb: false,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FontError> {
        let end = self.pos.checked_add(n).ok_or(FontError::Truncated)?;
        if end > self.data.len() {
            return Err(FontError::Truncated);
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, FontError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, FontError> {
        let b = self.take(2)?;
        Ok(if self.msb {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    }

    fn read_i16(&mut self) -> Result<i16, FontError> {
        Ok(self.read_u16()? as i16)
    }

    fn read_u32(&mut self) -> Result<u32, FontError> {
        let b = self.take(4)?;
        Ok(if self.msb {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    }

    fn read_i32(&mut self) -> Result<i32, FontError> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a table's format word (always little-endian) and switch the
    /// reader to the byte order it declares.
    fn read_format(&mut self) -> Result<u32, FontError> {
        self.msb = false;
        let format = self.read_u32()?;
        self.msb = format & FORMAT_BYTE_ORDER_MSB != 0;
        Ok(format)
    }
}

// ---------------------------------------------------------------------------
// Table structures
// ---------------------------------------------------------------------------

#[derive(Copy, Clone)]
struct TocEntry {
    table_type: u32,
    offset: u32,
}

/// Per-glyph metrics (the subset the monospace invariant cares about).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
struct Metrics {
    width: i16,
    ascent: i16,
    descent: i16,
}

struct Encodings {
    first_code: u16,
    /// Glyph index per code in `first_code..=last_code`; sentinel entries
    /// already replaced by the default glyph.
    glyphs: Vec<u16>,
    default_glyph: u16,
}

// ---------------------------------------------------------------------------
// GlyphAtlas
// ---------------------------------------------------------------------------

/// A decoded monospace bitmap font.
///
/// Immutable after decode: the atlas image holds all glyphs in one row
/// (glyph `i` starts at x offset `i * glyph_width`), with set bits stored
/// as opaque white and clear bits as transparent black.
pub struct GlyphAtlas {
    atlas: RgbaImage,
    glyph_width: u32,
    glyph_height: u32,
    glyph_count: u32,
    first_code: u16,
    encoding: Vec<u16>,
    default_glyph: u16,
}

impl GlyphAtlas {
    /// Read and decode a PCF font file.
    pub fn load(path: &std::path::Path) -> Result<Self, FontError> {
        let data = std::fs::read(path)?;
        Self::decode(&data)
    }

    /// Decode a PCF font from raw bytes.
    pub fn decode(data: &[u8]) -> Result<Self, FontError> {
        let mut r = Reader::at(data, 0);
        if r.take(4)? != MAGIC {
            return Err(FontError::BadMagic);
        }

        let table_count = r.read_u32()? as usize;
        if table_count == 0 || table_count > 256 {
            return Err(FontError::Malformed("implausible table count"));
        }
        let mut toc = Vec::with_capacity(table_count);
        for _ in 0..table_count {
            let table_type = r.read_u32()?;
            let _format = r.read_u32()?;
            let _size = r.read_u32()?;
            let offset = r.read_u32()?;
            toc.push(TocEntry { table_type, offset });
        }

        let find = |ty: u32, name: &'static str| {
            toc.iter()
                .find(|e| e.table_type == ty)
                .copied()
                .ok_or(FontError::MissingTable(name))
        };
        let metrics_toc = find(TABLE_METRICS, "metrics")?;
        let bitmaps_toc = find(TABLE_BITMAPS, "bitmaps")?;
        let encodings_toc = find(TABLE_ENCODINGS, "encodings")?;

        let metrics = read_metrics(data, metrics_toc.offset as usize)?;
        let (glyph_width, glyph_height) = check_monospace(&metrics)?;
        let encodings = read_encodings(data, encodings_toc.offset as usize)?;
        let atlas = read_bitmaps(
            data,
            bitmaps_toc.offset as usize,
            metrics.len(),
            glyph_width,
            glyph_height,
        )?;

        log::debug!(
            "decoded PCF font: {} glyphs of {}x{}",
            metrics.len(),
            glyph_width,
            glyph_height
        );

        Ok(Self {
            atlas,
            glyph_width,
            glyph_height,
            glyph_count: metrics.len() as u32,
            first_code: encodings.first_code,
            encoding: encodings.glyphs,
            default_glyph: encodings.default_glyph,
        })
    }

    /// Glyph width in pixels.
    #[inline]
    pub fn cell_width(&self) -> u32 {
        self.glyph_width
    }

    /// Glyph height in pixels.
    #[inline]
    pub fn cell_height(&self) -> u32 {
        self.glyph_height
    }

    /// Number of glyphs in the atlas.
    #[inline]
    pub fn glyph_count(&self) -> u32 {
        self.glyph_count
    }

    /// The shared atlas image.
    #[inline]
    pub fn image(&self) -> &RgbaImage {
        &self.atlas
    }

    /// Map a codepoint to its glyph index.
    ///
    /// Codes inside the encoding table resolve through it (unmapped entries
    /// were already folded to the default glyph at decode time); single-byte
    /// codes outside the table resolve to the default glyph. Codes that
    /// cannot be expressed in a single byte, and glyph indices that fall
    /// outside the atlas, yield `None` — the renderer leaves background
    /// there.
    pub fn glyph_index(&self, code: u32) -> Option<u32> {
        if code > 0xFF {
            return None;
        }
        let glyph = match code.checked_sub(self.first_code as u32) {
            Some(relative) if (relative as usize) < self.encoding.len() => {
                self.encoding[relative as usize]
            }
            _ => self.default_glyph,
        };
        let glyph = glyph as u32;
        (glyph < self.glyph_count).then_some(glyph)
    }

    /// Render one line of text: background fill, then the foreground colour
    /// stencilled through each glyph's atlas mask.
    ///
    /// Output is exactly `(chars * glyph_width, glyph_height)` pixels; the
    /// buffer is sized up front and never grows mid-render.
    pub fn render_line(&self, text: &str, fg: Color, bg: Color) -> RgbaImage {
        let chars = text.chars().count() as u32;
        let mut out = RgbaImage::from_pixel(
            (chars * self.glyph_width).max(1),
            self.glyph_height,
            Rgba(bg.to_bytes()),
        );
        if fg == bg {
            // Nothing would be visible anyway.
            return out;
        }

        let fg_px = Rgba(fg.to_bytes());
        for (i, ch) in text.chars().enumerate() {
            let Some(glyph) = self.glyph_index(ch as u32) else {
                continue;
            };
            let src_x = glyph * self.glyph_width;
            let dst_x = i as u32 * self.glyph_width;
            for y in 0..self.glyph_height {
                for x in 0..self.glyph_width {
                    if self.atlas.get_pixel(src_x + x, y).0[3] != 0 {
                        out.put_pixel(dst_x + x, y, fg_px);
                    }
                }
            }
        }
        out
    }
}

impl FontRenderer for GlyphAtlas {
    fn cell_width(&self) -> u32 {
        self.glyph_width
    }

    fn cell_height(&self) -> u32 {
        self.glyph_height
    }

    fn render_line(&mut self, text: &str, fg: Color, bg: Color) -> RgbaImage {
        GlyphAtlas::render_line(self, text, fg, bg)
    }
}

// ---------------------------------------------------------------------------
// Table readers
// ---------------------------------------------------------------------------

fn read_metrics(data: &[u8], offset: usize) -> Result<Vec<Metrics>, FontError> {
    let mut r = Reader::at(data, offset);
    let format = r.read_format()?;

    let compressed = format & FORMAT_COMPRESSED_METRICS != 0;
    let count = if compressed {
        r.read_i16()? as usize
    } else {
        let n = r.read_i32()?;
        if n < 0 {
            return Err(FontError::Malformed("negative metrics count"));
        }
        n as usize
    };
    if count > MAX_GLYPHS {
        return Err(FontError::Malformed("implausible glyph count"));
    }

    let mut metrics = Vec::with_capacity(count);
    for _ in 0..count {
        let m = if compressed {
            // Five one-byte fields, each biased by 0x80.
            let _left = r.read_u8()? as i16 - 0x80;
            let _right = r.read_u8()? as i16 - 0x80;
            let width = r.read_u8()? as i16 - 0x80;
            let ascent = r.read_u8()? as i16 - 0x80;
            let descent = r.read_u8()? as i16 - 0x80;
            Metrics {
                width,
                ascent,
                descent,
            }
        } else {
            let _left = r.read_i16()?;
            let _right = r.read_i16()?;
            let width = r.read_i16()?;
            let ascent = r.read_i16()?;
            let descent = r.read_i16()?;
            let _attributes = r.read_u16()?;
            Metrics {
                width,
                ascent,
                descent,
            }
        };
        metrics.push(m);
    }
    Ok(metrics)
}

/// Enforce the monospace invariant: every glyph shares one width and one
/// ascent + descent. Returns the common (width, height).
fn check_monospace(metrics: &[Metrics]) -> Result<(u32, u32), FontError> {
    let first = metrics.first().ok_or(FontError::EmptyFont)?;
    let width = first.width;
    let height = first.ascent + first.descent;
    if width <= 0 || height <= 0 {
        return Err(FontError::EmptyFont);
    }
    for m in &metrics[1..] {
        if m.width != width || m.ascent + m.descent != height {
            return Err(FontError::NotMonospace);
        }
    }
    Ok((width as u32, height as u32))
}

fn read_encodings(data: &[u8], offset: usize) -> Result<Encodings, FontError> {
    let mut r = Reader::at(data, offset);
    let _format = r.read_format()?;

    let min_code = r.read_i16()?;
    let max_code = r.read_i16()?;
    let min_byte1 = r.read_i16()?;
    let max_byte1 = r.read_i16()?;
    let default_char = r.read_i16()?;

    if min_byte1 != 0 || max_byte1 != 0 {
        return Err(FontError::UnsupportedEncoding);
    }
    if min_code < 0 || max_code < min_code {
        return Err(FontError::Malformed("bad encoding code range"));
    }

    let count = (max_code - min_code + 1) as usize;
    let mut raw = Vec::with_capacity(count);
    for _ in 0..count {
        raw.push(r.read_u16()?);
    }

    // The default char is an encoding value; resolve it through the raw
    // table to a glyph index, falling back to glyph 0.
    let default_glyph = if default_char >= min_code && default_char <= max_code {
        match raw[(default_char - min_code) as usize] {
            NO_GLYPH => 0,
            g => g,
        }
    } else {
        0
    };

    let glyphs = raw
        .into_iter()
        .map(|g| if g == NO_GLYPH { default_glyph } else { g })
        .collect();

    Ok(Encodings {
        first_code: min_code as u16,
        glyphs,
        default_glyph,
    })
}

fn read_bitmaps(
    data: &[u8],
    offset: usize,
    metrics_count: usize,
    glyph_width: u32,
    glyph_height: u32,
) -> Result<RgbaImage, FontError> {
    let mut r = Reader::at(data, offset);
    let format = r.read_format()?;

    let glyph_count = r.read_i32()?;
    if glyph_count < 0 {
        return Err(FontError::Malformed("negative bitmap glyph count"));
    }
    let glyph_count = glyph_count as usize;
    if glyph_count != metrics_count {
        return Err(FontError::CountMismatch {
            metrics: metrics_count,
            bitmaps: glyph_count,
        });
    }

    let mut offsets = Vec::with_capacity(glyph_count);
    for _ in 0..glyph_count {
        let o = r.read_i32()?;
        if o < 0 {
            return Err(FontError::Malformed("negative bitmap offset"));
        }
        offsets.push(o as usize);
    }

    // Four stored sizes, one per legal row padding; the format word picks
    // the active variant.
    let pad_index = (format & FORMAT_GLYPH_PAD_MASK) as usize;
    let mut sizes = [0usize; 4];
    for size in &mut sizes {
        let s = r.read_i32()?;
        if s < 0 {
            return Err(FontError::Malformed("negative bitmap data size"));
        }
        *size = s as usize;
    }
    let bitmap_data = r.take(sizes[pad_index])?;

    let glyph_pad = 1usize << pad_index;
    let scan_shift = (format & FORMAT_SCAN_UNIT_MASK) >> FORMAT_SCAN_UNIT_SHIFT;
    if scan_shift > 2 {
        return Err(FontError::Malformed("bad scan unit"));
    }
    let scan_unit = 1usize << scan_shift;
    let byte_msb = format & FORMAT_BYTE_ORDER_MSB != 0;
    let bit_msb = format & FORMAT_BIT_ORDER_MSB != 0;

    // Row stride: the glyph's bit width rounded up to the row padding.
    let width = glyph_width as usize;
    let height = glyph_height as usize;
    let stride = (width + glyph_pad * 8 - 1) / (glyph_pad * 8) * glyph_pad;
    if stride % scan_unit != 0 {
        return Err(FontError::Malformed("scan unit exceeds row padding"));
    }

    let mut atlas = RgbaImage::new(glyph_count as u32 * glyph_width, glyph_height);
    let white = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);

    for (glyph, &glyph_offset) in offsets.iter().enumerate() {
        let end = glyph_offset
            .checked_add(height * stride)
            .ok_or(FontError::Truncated)?;
        if end > bitmap_data.len() {
            return Err(FontError::Truncated);
        }
        let atlas_x = glyph as u32 * glyph_width;
        for y in 0..height {
            let row = &bitmap_data[glyph_offset + y * stride..glyph_offset + (y + 1) * stride];
            for x in 0..width {
                if read_bit(row, x, scan_unit, byte_msb, bit_msb) {
                    atlas.put_pixel(atlas_x + x as u32, y as u32, white);
                }
            }
        }
    }

    Ok(atlas)
}

/// Extract pixel `x` from a padded glyph row.
///
/// Bits are grouped into scan units of 1/2/4 bytes; the byte-order flag
/// gives the byte significance within a unit, the bit-order flag whether
/// the leftmost pixel sits in the most or least significant bit.
fn read_bit(row: &[u8], x: usize, scan_unit: usize, byte_msb: bool, bit_msb: bool) -> bool {
    let unit_bits = scan_unit * 8;
    let unit_start = (x / unit_bits) * scan_unit;
    let bit = x % unit_bits;

    let mut unit: u32 = 0;
    for (i, &byte) in row[unit_start..unit_start + scan_unit].iter().enumerate() {
        let shift = if byte_msb {
            (scan_unit - 1 - i) * 8
        } else {
            i * 8
        };
        unit |= (byte as u32) << shift;
    }

    let shift = if bit_msb { unit_bits - 1 - bit } else { bit };
    unit >> shift & 1 != 0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds synthetic PCF files for the decoder tests.
    struct PcfBuilder {
        byte_msb: bool,
        bit_msb: bool,
        scan_unit: usize,
        glyph_pad: usize,
        compressed: bool,
        width: i16,
        ascent: i16,
        descent: i16,
        min_code: i16,
        default_char: i16,
        /// Per-code glyph index (NO_GLYPH for unmapped).
        encoding: Vec<u16>,
        /// Per-glyph pixel patterns: rows of '#' (set) and '.' (clear).
        glyphs: Vec<Vec<&'static str>>,
        /// Test hook: lie about the bitmap glyph count.
        bitmap_count_override: Option<i32>,
        /// Test hook: per-glyph metric overrides (index, width).
        width_overrides: Vec<(usize, i16)>,
    }

    impl PcfBuilder {
        fn new() -> Self {
            Self {
                byte_msb: false,
                bit_msb: false,
                scan_unit: 1,
                glyph_pad: 1,
                compressed: false,
                width: 6,
                ascent: 5,
                descent: 2,
                min_code: 0x20,
                default_char: 0x20,
                encoding: Vec::new(),
                glyphs: Vec::new(),
                bitmap_count_override: None,
                width_overrides: Vec::new(),
            }
        }

        fn format(&self) -> u32 {
            let pad_index = self.glyph_pad.trailing_zeros();
            let scan_index = self.scan_unit.trailing_zeros();
            let mut f = pad_index | (scan_index << FORMAT_SCAN_UNIT_SHIFT);
            if self.byte_msb {
                f |= FORMAT_BYTE_ORDER_MSB;
            }
            if self.bit_msb {
                f |= FORMAT_BIT_ORDER_MSB;
            }
            if self.compressed {
                f |= FORMAT_COMPRESSED_METRICS;
            }
            f
        }

        fn push16(&self, out: &mut Vec<u8>, v: u16) {
            if self.byte_msb {
                out.extend_from_slice(&v.to_be_bytes());
            } else {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }

        fn push32(&self, out: &mut Vec<u8>, v: u32) {
            if self.byte_msb {
                out.extend_from_slice(&v.to_be_bytes());
            } else {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }

        fn glyph_width(&self, index: usize) -> i16 {
            self.width_overrides
                .iter()
                .find(|(i, _)| *i == index)
                .map(|&(_, w)| w)
                .unwrap_or(self.width)
        }

        fn metrics_table(&self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(&self.format().to_le_bytes());
            if self.compressed {
                self.push16(&mut out, self.glyphs.len() as u16);
                for i in 0..self.glyphs.len() {
                    let w = self.glyph_width(i);
                    for field in [0, w, w, self.ascent, self.descent] {
                        out.push((field + 0x80) as u8);
                    }
                }
            } else {
                self.push32(&mut out, self.glyphs.len() as u32);
                for i in 0..self.glyphs.len() {
                    let w = self.glyph_width(i);
                    for field in [0, w, w, self.ascent, self.descent, 0] {
                        self.push16(&mut out, field as u16);
                    }
                }
            }
            out
        }

        fn encodings_table(&self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(&self.format().to_le_bytes());
            let max_code = self.min_code + self.encoding.len() as i16 - 1;
            self.push16(&mut out, self.min_code as u16);
            self.push16(&mut out, max_code as u16);
            self.push16(&mut out, 0); // min_byte1
            self.push16(&mut out, 0); // max_byte1
            self.push16(&mut out, self.default_char as u16);
            for &g in &self.encoding {
                self.push16(&mut out, g);
            }
            out
        }

        fn glyph_rows(&self, pattern: &[&str]) -> Vec<u8> {
            let width = self.width as usize;
            let height = (self.ascent + self.descent) as usize;
            let unit_bits = self.scan_unit * 8;
            let stride =
                (width + self.glyph_pad * 8 - 1) / (self.glyph_pad * 8) * self.glyph_pad;

            let mut out = Vec::new();
            for y in 0..height {
                let mut row = vec![0u8; stride];
                let line = pattern.get(y).copied().unwrap_or("");
                for (x, ch) in line.chars().enumerate().take(width) {
                    if ch != '#' {
                        continue;
                    }
                    let unit_start = (x / unit_bits) * self.scan_unit;
                    let bit = x % unit_bits;
                    let shift = if self.bit_msb { unit_bits - 1 - bit } else { bit };
                    let byte_in_unit = if self.byte_msb {
                        self.scan_unit - 1 - shift / 8
                    } else {
                        shift / 8
                    };
                    row[unit_start + byte_in_unit] |= 1 << (shift % 8);
                }
                out.extend_from_slice(&row);
            }
            out
        }

        fn bitmaps_table(&self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(&self.format().to_le_bytes());
            let count = self
                .bitmap_count_override
                .unwrap_or(self.glyphs.len() as i32);
            self.push32(&mut out, count as u32);

            let mut blob = Vec::new();
            let mut offsets = Vec::new();
            for pattern in &self.glyphs {
                offsets.push(blob.len() as u32);
                blob.extend_from_slice(&self.glyph_rows(pattern));
            }
            for off in offsets {
                self.push32(&mut out, off);
            }
            // One size per padding variant; only the active one is real.
            let pad_index = self.glyph_pad.trailing_zeros() as usize;
            for i in 0..4 {
                let size = if i == pad_index { blob.len() as u32 } else { 0 };
                self.push32(&mut out, size);
            }
            out.extend_from_slice(&blob);
            out
        }

        fn build(&self) -> Vec<u8> {
            let tables = [
                (TABLE_METRICS, self.metrics_table()),
                (TABLE_BITMAPS, self.bitmaps_table()),
                (TABLE_ENCODINGS, self.encodings_table()),
            ];
            self.build_with(&tables)
        }

        fn build_with(&self, tables: &[(u32, Vec<u8>)]) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(&MAGIC);
            out.extend_from_slice(&(tables.len() as u32).to_le_bytes());
            let header_len = 8 + tables.len() * 16;
            let mut offset = header_len;
            for (ty, bytes) in tables {
                out.extend_from_slice(&ty.to_le_bytes());
                out.extend_from_slice(&self.format().to_le_bytes());
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(&(offset as u32).to_le_bytes());
                offset += bytes.len();
            }
            for (_, bytes) in tables {
                out.extend_from_slice(bytes);
            }
            out
        }
    }

    const BAR: &[&str] = &["..##..", "..##..", "..##..", "..##..", "..##..", "..##..", "..##.."];
    const DOT: &[&str] = &["......", "......", "......", "..##..", "..##..", "......", "......"];

    fn two_glyph_builder() -> PcfBuilder {
        let mut b = PcfBuilder::new();
        b.ascent = 5;
        b.descent = 2;
        b.glyphs = vec![BAR.to_vec(), DOT.to_vec()];
        b.min_code = b'A' as i16;
        b.default_char = b'A' as i16;
        b.encoding = vec![0, 1];
        b
    }

    fn assert_glyph_pixels(atlas: &GlyphAtlas, glyph: u32, pattern: &[&str]) {
        let x0 = glyph * atlas.cell_width();
        for (y, line) in pattern.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let px = atlas.image().get_pixel(x0 + x as u32, y as u32);
                let set = px.0[3] != 0;
                assert_eq!(set, ch == '#', "glyph {glyph} pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn decode_basic() {
        let atlas = GlyphAtlas::decode(&two_glyph_builder().build()).unwrap();
        assert_eq!(atlas.cell_width(), 6);
        assert_eq!(atlas.cell_height(), 7);
        assert_eq!(atlas.glyph_count(), 2);
        assert_eq!(atlas.image().width(), 12);
        assert_glyph_pixels(&atlas, 0, BAR);
        assert_glyph_pixels(&atlas, 1, DOT);
        assert_eq!(atlas.glyph_index(b'A' as u32), Some(0));
        assert_eq!(atlas.glyph_index(b'B' as u32), Some(1));
    }

    #[test]
    fn compressed_metrics_match_uncompressed() {
        let mut b = two_glyph_builder();
        let plain = GlyphAtlas::decode(&b.build()).unwrap();
        b.compressed = true;
        let compressed = GlyphAtlas::decode(&b.build()).unwrap();
        assert_eq!(plain.cell_width(), compressed.cell_width());
        assert_eq!(plain.cell_height(), compressed.cell_height());
        assert_eq!(plain.image().as_raw(), compressed.image().as_raw());
    }

    #[test]
    fn bit_and_byte_order_variants() {
        let reference = GlyphAtlas::decode(&two_glyph_builder().build()).unwrap();
        for (byte_msb, bit_msb, scan_unit, glyph_pad) in [
            (false, true, 1, 1),
            (true, true, 1, 1),
            (true, true, 2, 2),
            (false, false, 2, 2),
            (true, false, 4, 4),
            (false, true, 1, 4),
        ] {
            let mut b = two_glyph_builder();
            b.byte_msb = byte_msb;
            b.bit_msb = bit_msb;
            b.scan_unit = scan_unit;
            b.glyph_pad = glyph_pad;
            let atlas = GlyphAtlas::decode(&b.build()).unwrap();
            assert_eq!(
                atlas.image().as_raw(),
                reference.image().as_raw(),
                "byte_msb={byte_msb} bit_msb={bit_msb} scan={scan_unit} pad={glyph_pad}"
            );
        }
    }

    #[test]
    fn decode_is_idempotent() {
        let data = two_glyph_builder().build();
        let a = GlyphAtlas::decode(&data).unwrap();
        let b = GlyphAtlas::decode(&data).unwrap();
        assert_eq!(a.image().as_raw(), b.image().as_raw());
        assert_eq!(a.encoding, b.encoding);
        assert_eq!(a.default_glyph, b.default_glyph);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = two_glyph_builder().build();
        data[0] = 0x42;
        assert!(matches!(
            GlyphAtlas::decode(&data),
            Err(FontError::BadMagic)
        ));
    }

    #[test]
    fn rejects_missing_table() {
        let b = two_glyph_builder();
        let tables = [
            (TABLE_METRICS, b.metrics_table()),
            (TABLE_BITMAPS, b.bitmaps_table()),
        ];
        let data = b.build_with(&tables);
        assert!(matches!(
            GlyphAtlas::decode(&data),
            Err(FontError::MissingTable("encodings"))
        ));
    }

    #[test]
    fn rejects_multi_byte_encoding() {
        let b = two_glyph_builder();
        let mut enc = Vec::new();
        enc.extend_from_slice(&b.format().to_le_bytes());
        for v in [0u16, 255, 1, 2, 0] {
            enc.extend_from_slice(&v.to_le_bytes());
        }
        let tables = [
            (TABLE_METRICS, b.metrics_table()),
            (TABLE_BITMAPS, b.bitmaps_table()),
            (TABLE_ENCODINGS, enc),
        ];
        assert!(matches!(
            GlyphAtlas::decode(&b.build_with(&tables)),
            Err(FontError::UnsupportedEncoding)
        ));
    }

    #[test]
    fn rejects_non_monospace() {
        let mut b = two_glyph_builder();
        b.width_overrides.push((1, 8));
        assert!(matches!(
            GlyphAtlas::decode(&b.build()),
            Err(FontError::NotMonospace)
        ));
    }

    #[test]
    fn rejects_count_mismatch() {
        let mut b = two_glyph_builder();
        b.bitmap_count_override = Some(3);
        assert!(matches!(
            GlyphAtlas::decode(&b.build()),
            Err(FontError::CountMismatch {
                metrics: 2,
                bitmaps: 3
            })
        ));
    }

    #[test]
    fn rejects_empty_font() {
        let mut b = two_glyph_builder();
        b.glyphs.clear();
        b.encoding = vec![NO_GLYPH];
        assert!(matches!(
            GlyphAtlas::decode(&b.build()),
            Err(FontError::EmptyFont)
        ));
    }

    #[test]
    fn rejects_truncated_bitmap_data() {
        let data = two_glyph_builder().build();
        let data = &data[..data.len() - 10];
        assert!(matches!(
            GlyphAtlas::decode(data),
            Err(FontError::Truncated)
        ));
    }

    #[test]
    fn unmapped_codes_use_default_glyph() {
        let mut b = two_glyph_builder();
        b.encoding = vec![0, NO_GLYPH];
        let atlas = GlyphAtlas::decode(&b.build()).unwrap();
        // 'B' is in the table but unmapped; 'z' is outside the table.
        assert_eq!(atlas.glyph_index(b'B' as u32), Some(0));
        assert_eq!(atlas.glyph_index(b'z' as u32), Some(0));
        // Codes beyond single-byte range cannot be encoded at all.
        assert_eq!(atlas.glyph_index(0x2603), None);
    }

    /// The printable-ASCII layout: 94 glyphs of 6x13, uncompressed metrics,
    /// LSB-first bitmaps, scan unit 1, padding 1.
    #[test]
    fn printable_ascii_geometry() {
        let mut b = PcfBuilder::new();
        b.width = 6;
        b.ascent = 11;
        b.descent = 2;
        b.min_code = 0x21;
        b.default_char = 0x3F; // '?'
        b.glyphs = vec![vec!["######"]; 94];
        b.encoding = (0..94).collect();
        let atlas = GlyphAtlas::decode(&b.build()).unwrap();
        assert_eq!(atlas.image().width(), 94 * 6);
        assert_eq!(atlas.image().height(), 13);
        assert_eq!(atlas.glyph_index(0x41), Some(0x41 - 0x21));
    }

    #[test]
    fn render_line_stencils_foreground() {
        let atlas = GlyphAtlas::decode(&two_glyph_builder().build()).unwrap();
        let fg = Color::from_rgb(255, 0, 0);
        let bg = Color::from_rgb(0, 0, 255);
        let img = atlas.render_line("AB", fg, bg);
        assert_eq!(img.width(), 2 * 6);
        assert_eq!(img.height(), 7);
        // 'A' maps to the bar glyph: column 2 of row 0 is set.
        assert_eq!(img.get_pixel(2, 0).0, fg.to_bytes());
        assert_eq!(img.get_pixel(0, 0).0, bg.to_bytes());
        // 'B' maps to the dot glyph: set only in the middle rows.
        assert_eq!(img.get_pixel(6 + 2, 3).0, fg.to_bytes());
        assert_eq!(img.get_pixel(6 + 2, 0).0, bg.to_bytes());
    }

    #[test]
    fn render_line_equal_colors_short_circuits() {
        let atlas = GlyphAtlas::decode(&two_glyph_builder().build()).unwrap();
        let c = Color::from_rgb(10, 20, 30);
        let img = atlas.render_line("AB", c, c);
        assert!(img.pixels().all(|p| p.0 == c.to_bytes()));
    }

    #[test]
    fn render_line_skips_unencodable_codepoints() {
        let atlas = GlyphAtlas::decode(&two_glyph_builder().build()).unwrap();
        let fg = Color::WHITE;
        let bg = Color::BLACK;
        let img = atlas.render_line("\u{2603}", fg, bg);
        assert!(img.pixels().all(|p| p.0 == bg.to_bytes()));
    }
}
