//! **tileterm-font** — the font subsystem.
//!
//! Two font kinds share one rendering contract:
//! - [`GlyphAtlas`] — a monospace bitmap font decoded from a PCF file into
//!   a single-row glyph atlas (see [`pcf`]).
//! - [`TtfFont`] — a scalable TrueType font rasterized with [`fontdue`].
//!
//! The terminal layer only sees the [`FontRenderer`] trait (cell size and
//! line rendering) and the [`Font`] enum dispatching between the two.

pub mod pcf;
pub mod ttf;

use std::fmt;
use std::io;

use image::RgbaImage;
use tileterm_core::Color;

pub use pcf::GlyphAtlas;
pub use ttf::TtfFont;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for font loading and decoding.
#[derive(Debug)]
pub enum FontError {
    /// Reading the font file failed.
    Io(io::Error),
    /// The file does not start with the PCF magic bytes.
    BadMagic,
    /// The file ended in the middle of a structure.
    Truncated,
    /// A structural invariant of the format was violated.
    Malformed(&'static str),
    /// A required PCF table is absent.
    MissingTable(&'static str),
    /// The font uses a multi-byte encoding layout.
    UnsupportedEncoding,
    /// Glyphs do not share a single width and height.
    NotMonospace,
    /// The bitmap table's glyph count disagrees with the metrics table.
    CountMismatch { metrics: usize, bitmaps: usize },
    /// The font has no glyphs or zero-sized glyphs.
    EmptyFont,
    /// The TrueType font data could not be parsed.
    InvalidTruetype(String),
}

impl fmt::Display for FontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "font file error: {err}"),
            Self::BadMagic => write!(f, "not a PCF font file"),
            Self::Truncated => write!(f, "truncated PCF font file"),
            Self::Malformed(what) => write!(f, "malformed PCF font: {what}"),
            Self::MissingTable(name) => write!(f, "PCF font is missing the {name} table"),
            Self::UnsupportedEncoding => {
                write!(f, "only single-byte PCF encodings are supported")
            }
            Self::NotMonospace => write!(f, "PCF font is not monospace"),
            Self::CountMismatch { metrics, bitmaps } => write!(
                f,
                "PCF glyph count mismatch: {metrics} metrics vs {bitmaps} bitmaps"
            ),
            Self::EmptyFont => write!(f, "PCF font has no usable glyphs"),
            Self::InvalidTruetype(msg) => write!(f, "invalid TrueType font: {msg}"),
        }
    }
}

impl std::error::Error for FontError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for FontError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

// ---------------------------------------------------------------------------
// FontRenderer
// ---------------------------------------------------------------------------

/// The rendering contract every font kind satisfies.
///
/// Cell dimensions are fixed once the font is loaded; the windowing layer
/// uses them to size the window in character cells.
pub trait FontRenderer {
    /// Cell width in pixels.
    fn cell_width(&self) -> u32;

    /// Cell height in pixels.
    fn cell_height(&self) -> u32;

    /// Render one line of text into an RGBA buffer of exactly
    /// `(chars * cell_width, cell_height)` pixels.
    fn render_line(&mut self, text: &str, fg: Color, bg: Color) -> RgbaImage;
}

// ---------------------------------------------------------------------------
// Font
// ---------------------------------------------------------------------------

/// A loaded font of either kind.
pub enum Font {
    /// A fixed-size bitmap font (PCF).
    Bitmap(GlyphAtlas),
    /// A scalable TrueType font.
    Truetype(TtfFont),
}

impl Font {
    /// Load a font from a file path; `.pcf` files go through the bitmap
    /// decoder, everything else through the TrueType loader at `size_px`.
    pub fn load(path: &std::path::Path, size_px: f32) -> Result<Self, FontError> {
        let data = std::fs::read(path)?;
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("pcf")) {
            Ok(Self::Bitmap(GlyphAtlas::decode(&data)?))
        } else {
            Ok(Self::Truetype(TtfFont::new(&data, size_px)?))
        }
    }
}

impl FontRenderer for Font {
    fn cell_width(&self) -> u32 {
        match self {
            Self::Bitmap(atlas) => atlas.cell_width(),
            Self::Truetype(ttf) => ttf.cell_width(),
        }
    }

    fn cell_height(&self) -> u32 {
        match self {
            Self::Bitmap(atlas) => atlas.cell_height(),
            Self::Truetype(ttf) => ttf.cell_height(),
        }
    }

    fn render_line(&mut self, text: &str, fg: Color, bg: Color) -> RgbaImage {
        match self {
            Self::Bitmap(atlas) => atlas.render_line(text, fg, bg),
            Self::Truetype(ttf) => ttf.render_line(text, fg, bg),
        }
    }
}
