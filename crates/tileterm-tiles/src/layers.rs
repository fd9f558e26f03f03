//! Mask-colour layer decomposition.
//!
//! [`TileLayers::build`] resizes a sprite sheet to the active cell size and
//! splits it into per-mask transparency layers: N mask colours yield N-1
//! layers, layer `i` serving mask `i + 1`. Layer 0 doubles as the
//! catch-all — besides the first foreground mask's pixels it keeps every
//! pixel that matches no declared mask, so tiles with literal-colour
//! artwork survive decomposition.

use image::{Rgba, RgbaImage};
use tileterm_core::Color;

use crate::TileError;

/// Nearest-neighbour resize with independent X/Y factors.
///
/// Integer arithmetic, so the mapping decomposes exactly at tile
/// boundaries: resizing the whole sheet is pixel-identical to resizing
/// each tile on its own.
pub fn resize_nearest(src: &RgbaImage, dst_width: u32, dst_height: u32) -> RgbaImage {
    let mut dst = RgbaImage::new(dst_width, dst_height);
    for y in 0..dst_height {
        let sy = (y as u64 * src.height() as u64 / dst_height as u64) as u32;
        for x in 0..dst_width {
            let sx = (x as u64 * src.width() as u64 / dst_width as u64) as u32;
            dst.put_pixel(x, y, *src.get_pixel(sx, sy));
        }
    }
    dst
}

#[inline]
fn matches_mask(pixel: Rgba<u8>, mask: Color) -> bool {
    pixel.0[0] == mask.r() && pixel.0[1] == mask.g() && pixel.0[2] == mask.b()
}

/// The per-mask transparency layers derived from one sprite sheet.
///
/// Owned by a rendering context and rebuilt whenever the cell size or the
/// tileset changes; the mask-colour set is fixed for its lifetime.
pub struct TileLayers {
    layers: Vec<RgbaImage>,
    masks: Vec<Color>,
    cell_width: u32,
    cell_height: u32,
    tiles_per_row: u32,
    tile_count: u32,
}

impl TileLayers {
    /// Decompose `sheet` (tiles of `tile_size` pixels) into mask layers at
    /// `cell_size` pixels per tile.
    pub fn build(
        sheet: &RgbaImage,
        tile_size: (u32, u32),
        cell_size: (u32, u32),
        masks: &[Color],
    ) -> Result<Self, TileError> {
        if masks.len() < 2 {
            return Err(TileError::BadMaskCount { found: masks.len() });
        }
        let (tile_w, tile_h) = tile_size;
        let (cell_w, cell_h) = cell_size;
        let bad_geometry = tile_w == 0
            || tile_h == 0
            || cell_w == 0
            || cell_h == 0
            || sheet.width() % tile_w != 0
            || sheet.height() % tile_h != 0
            || sheet.width() == 0
            || sheet.height() == 0;
        if bad_geometry {
            return Err(TileError::BadSheetGeometry {
                sheet: (sheet.width(), sheet.height()),
                tile: (tile_w, tile_h),
            });
        }

        let tiles_per_row = sheet.width() / tile_w;
        let tile_rows = sheet.height() / tile_h;
        let resized = resize_nearest(sheet, tiles_per_row * cell_w, tile_rows * cell_h);

        // Layer 0: the resized sheet with background pixels knocked out.
        // It keeps the first mask's pixels and everything unassigned (the
        // catch-all), so N masks yield N-1 layers.
        let mut base = resized;
        for pixel in base.pixels_mut() {
            if matches_mask(*pixel, masks[0]) {
                *pixel = Rgba([0, 0, 0, 0]);
            }
        }

        // One dedicated layer per remaining mask colour, its pixels moved
        // (copied, then cleared) out of layer 0. Pixels keep their original
        // values; only the alpha channel acts as the stencil.
        let mut layers = vec![base];
        for &mask in &masks[2..] {
            let base = &mut layers[0];
            let mut layer = RgbaImage::new(base.width(), base.height());
            for (x, y, pixel) in base.enumerate_pixels_mut() {
                if pixel.0[3] != 0 && matches_mask(*pixel, mask) {
                    layer.put_pixel(x, y, *pixel);
                    *pixel = Rgba([0, 0, 0, 0]);
                }
            }
            layers.push(layer);
        }

        log::debug!(
            "built {} tile layers: {} tiles of {}x{}",
            layers.len(),
            tiles_per_row * tile_rows,
            cell_w,
            cell_h
        );

        Ok(Self {
            layers,
            masks: masks.to_vec(),
            cell_width: cell_w,
            cell_height: cell_h,
            tiles_per_row,
            tile_count: tiles_per_row * tile_rows,
        })
    }

    /// Number of mask colours (layers + 1).
    #[inline]
    pub fn mask_count(&self) -> usize {
        self.masks.len()
    }

    /// The mask-colour set (index 0 is the background).
    #[inline]
    pub fn masks(&self) -> &[Color] {
        &self.masks
    }

    /// Cell width in pixels.
    #[inline]
    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }

    /// Cell height in pixels.
    #[inline]
    pub fn cell_height(&self) -> u32 {
        self.cell_height
    }

    /// Number of tiles in the sheet.
    #[inline]
    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }

    /// The transparency layer for mask `i + 1`.
    #[inline]
    pub fn layer(&self, i: usize) -> &RgbaImage {
        &self.layers[i]
    }

    /// Pixel origin of `index`'s cell within the layer images.
    pub fn tile_origin(&self, index: u32) -> Option<(u32, u32)> {
        if index >= self.tile_count {
            return None;
        }
        let col = index % self.tiles_per_row;
        let row = index / self.tiles_per_row;
        Some((col * self.cell_width, row * self.cell_height))
    }
}
