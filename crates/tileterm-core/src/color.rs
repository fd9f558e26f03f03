//! The color model: [`Color`], the mutable indexed [`Palette`], and the
//! per-terminal current pair tracked by [`ColorContext`].

use std::fmt;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// An RGBA colour packed into a `u32` (0xRRGGBBAA).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Self = Self::from_rgb(0, 0, 0);
    pub const WHITE: Self = Self::from_rgb(0xFF, 0xFF, 0xFF);
    /// Fully transparent black, used for empty layer pixels.
    pub const TRANSPARENT: Self = Self::from_rgba(0, 0, 0, 0);

    /// Construct from RGB components, fully opaque.
    #[inline]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba(r, g, b, 0xFF)
    }

    /// Construct from individual RGBA components.
    #[inline]
    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32))
    }

    /// Red component.
    #[inline]
    pub const fn r(self) -> u8 {
        ((self.0 >> 24) & 0xFF) as u8
    }

    /// Green component.
    #[inline]
    pub const fn g(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// Blue component.
    #[inline]
    pub const fn b(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Alpha component.
    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// The components as an `[r, g, b, a]` array.
    #[inline]
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r(), self.g(), self.b(), self.a()]
    }

    /// Construct from an `[r, g, b, a]` array.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::from_rgba(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    /// Parse a `#RRGGBB` hex string (opaque).
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let v = u32::from_str_radix(digits, 16).ok()?;
        Some(Self::from_rgb(
            ((v >> 16) & 0xFF) as u8,
            ((v >> 8) & 0xFF) as u8,
            (v & 0xFF) as u8,
        ))
    }

    /// Look up one of the base named colours.
    pub fn from_name(name: &str) -> Option<Self> {
        BASE_COLORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, c)| c)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r(), self.g(), self.b())
    }
}

/// The fixed base set of named colours (classic 16-colour terminal set).
pub const BASE_COLORS: [(&str, Color); 16] = [
    ("black", Color::from_rgb(0, 0, 0)),
    ("red", Color::from_rgb(205, 49, 49)),
    ("green", Color::from_rgb(13, 188, 121)),
    ("yellow", Color::from_rgb(229, 229, 16)),
    ("blue", Color::from_rgb(36, 114, 200)),
    ("magenta", Color::from_rgb(188, 63, 188)),
    ("cyan", Color::from_rgb(17, 168, 205)),
    ("white", Color::from_rgb(229, 229, 229)),
    ("gray", Color::from_rgb(102, 102, 102)),
    ("lightred", Color::from_rgb(241, 76, 76)),
    ("lightgreen", Color::from_rgb(35, 209, 139)),
    ("lightyellow", Color::from_rgb(245, 245, 67)),
    ("lightblue", Color::from_rgb(59, 142, 234)),
    ("lightmagenta", Color::from_rgb(214, 112, 214)),
    ("lightcyan", Color::from_rgb(41, 184, 219)),
    ("lightwhite", Color::from_rgb(255, 255, 255)),
];

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Maximum number of palette entries.
pub const PALETTE_MAX: usize = 256;

/// A mutable indexed colour table.
///
/// Terminal attributes index into this table to obtain concrete colours.
/// Entries can be reassigned at runtime (palette animation); callers that
/// cache colourized pixels must invalidate on reassignment.
#[derive(Clone, Debug)]
pub struct Palette {
    entries: Vec<Color>,
}

impl Palette {
    /// Create a palette with `size` entries (clamped to 16..=[`PALETTE_MAX`]).
    ///
    /// The first 16 entries start as the base named colours; the rest repeat
    /// that ramp so every index resolves to something visible.
    pub fn new(size: usize) -> Self {
        let size = size.clamp(16, PALETTE_MAX);
        let entries = (0..size).map(|i| BASE_COLORS[i % 16].1).collect();
        Self { entries }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The colour at `index`. Out-of-range indices log a warning and
    /// resolve to the last entry.
    pub fn entry(&self, index: usize) -> Color {
        match self.entries.get(index) {
            Some(&c) => c,
            None => {
                log::warn!("palette index {index} out of range ({} entries)", self.len());
                *self.entries.last().expect("palette is never empty")
            }
        }
    }

    /// Reassign the colour at `index`, returning the previous colour.
    ///
    /// Returns `None` (and logs) when `index` is out of range.
    pub fn set_entry(&mut self, index: usize, color: Color) -> Option<Color> {
        match self.entries.get_mut(index) {
            Some(slot) => Some(std::mem::replace(slot, color)),
            None => {
                log::warn!("ignoring palette write at index {index} ({} entries)", self.len());
                None
            }
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(16)
    }
}

// ---------------------------------------------------------------------------
// ColorContext
// ---------------------------------------------------------------------------

/// The active foreground/background pair.
///
/// Set before each draw call and consumed by the text renderer and the
/// tile compositor; never stored per-glyph.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColorContext {
    fg: Color,
    bg: Color,
}

impl ColorContext {
    /// Create a context with the given initial pair.
    #[inline]
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self { fg, bg }
    }

    /// Current foreground.
    #[inline]
    pub const fn fg(&self) -> Color {
        self.fg
    }

    /// Current background.
    #[inline]
    pub const fn bg(&self) -> Color {
        self.bg
    }

    /// Replace the current pair.
    #[inline]
    pub fn set_pair(&mut self, fg: Color, bg: Color) {
        self.fg = fg;
        self.bg = bg;
    }

    /// Resolve a textual colour spec to a concrete colour.
    ///
    /// Recognizes `"fg"`, `"bg"`, the base colour names, and `"#RRGGBB"`.
    /// Anything else logs a warning and resolves to the current foreground;
    /// rendering degrades rather than failing on a bad colour string.
    pub fn resolve(&self, spec: &str) -> Color {
        match spec {
            "fg" => self.fg,
            "bg" => self.bg,
            _ => Color::from_name(spec)
                .or_else(|| Color::from_hex(spec))
                .unwrap_or_else(|| {
                    log::warn!("unrecognized color spec {spec:?}, using foreground");
                    self.fg
                }),
        }
    }
}

impl Default for ColorContext {
    fn default() -> Self {
        Self::new(Color::WHITE, Color::BLACK)
    }
}
