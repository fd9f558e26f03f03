//! **tileterm-tiles** — the tile compositing pipeline.
//!
//! A tileset is a grid-packed sprite sheet whose pixels use a small set of
//! *mask colours*: sentinel colours replaced by caller-chosen colours at
//! draw time. The pipeline has three stages:
//!
//! 1. [`TileLayers`] decomposes the (resized) sheet into one transparency
//!    layer per non-background mask colour.
//! 2. [`compose`] stamps each layer in its replacement colour onto a
//!    background-filled canvas, producing one cell's pixels.
//! 3. [`TileCache`] retains composited cells keyed by (tile, colour set)
//!    in a fixed number of slots, so steady-state frames avoid
//!    recompositing.

pub mod cache;
pub mod compose;
pub mod layers;

use std::fmt;

pub use cache::{TileCache, TileKey};
pub use compose::{composite, composite_into, composite_pair_into};
pub use layers::TileLayers;

/// Error type for tileset decomposition and compositing.
#[derive(Debug, PartialEq, Eq)]
pub enum TileError {
    /// A tileset needs at least a background and one foreground mask.
    BadMaskCount { found: usize },
    /// The sheet dimensions are not a whole multiple of the tile size.
    BadSheetGeometry {
        sheet: (u32, u32),
        tile: (u32, u32),
    },
    /// A tile index beyond the sheet's tile count.
    BadTileIndex { index: u32, count: u32 },
    /// A replacement colour set whose length disagrees with the mask count.
    BadColorCount { expected: usize, found: usize },
}

impl fmt::Display for TileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMaskCount { found } => {
                write!(f, "tileset needs at least 2 mask colors, got {found}")
            }
            Self::BadSheetGeometry { sheet, tile } => write!(
                f,
                "sheet size {}x{} is not a multiple of tile size {}x{}",
                sheet.0, sheet.1, tile.0, tile.1
            ),
            Self::BadTileIndex { index, count } => {
                write!(f, "tile index {index} out of range ({count} tiles)")
            }
            Self::BadColorCount { expected, found } => {
                write!(f, "expected {expected} replacement colors, got {found}")
            }
        }
    }
}

impl std::error::Error for TileError {}
