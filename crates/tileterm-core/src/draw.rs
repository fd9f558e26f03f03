//! Draw requests consumed from the terminal-emulation layer.

use crate::geom::Point;

/// Sentinel tile index meaning "no tile to draw".
///
/// Used by [`DrawRequest::TilePair`] to denote a missing background tile.
pub const NO_TILE: u32 = u32::MAX;

/// One cell-granular draw request.
///
/// Positions are grid coordinates (column, row); the attribute is an index
/// into the active [`Palette`](crate::Palette) selecting the foreground
/// replacement colour.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrawRequest {
    /// Draw a run of text starting at `pos`.
    Text { pos: Point, attr: u8, text: String },
    /// Draw a single graphical tile at `pos`.
    Tile { pos: Point, attr: u8, index: u32 },
    /// Draw a background tile and a foreground tile stacked in one cell
    /// (richer graphics mode).
    TilePair {
        pos: Point,
        bg_attr: u8,
        bg_index: u32,
        fg_attr: u8,
        fg_index: u32,
    },
}

impl DrawRequest {
    /// The grid position this request draws at.
    #[inline]
    pub const fn pos(&self) -> Point {
        match self {
            Self::Text { pos, .. } | Self::Tile { pos, .. } | Self::TilePair { pos, .. } => *pos,
        }
    }
}
