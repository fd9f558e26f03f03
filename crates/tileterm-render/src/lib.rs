//! **tileterm-render** — the per-terminal rendering context.
//!
//! A [`RenderContext`] owns everything one visible terminal needs to turn
//! draw requests into pixels: a font, an optional tileset (mask layers plus
//! the composited-tile cache), the palette, and the current colour pair.
//! Contexts are explicit values — several can coexist (multiple windows,
//! off-screen rendering) and nothing is shared between them.

mod context;

pub use context::{CellPixels, DrawResult, RenderContext, Tileset, TilesetConfig};
