//! Tile compositing: stamping mask layers in replacement colours.
//!
//! A composited cell starts as a background-filled canvas; each layer then
//! stamps its opaque pixels on top, bottom-up. A stamped pixel takes the
//! layer's replacement colour when it matches the layer's mask colour, and
//! keeps its own (literal artwork) colour otherwise.

use image::{Rgba, RgbaImage};
use tileterm_core::{Color, NO_TILE};

use crate::layers::TileLayers;
use crate::TileError;

/// Composite one tile into `canvas` (which must be cell-sized).
///
/// `colors[0]` is the background fill; `colors[i + 1]` replaces layer `i`'s
/// mask colour. A `NO_TILE` index leaves the canvas as plain background.
pub fn composite_into(
    canvas: &mut RgbaImage,
    layers: &TileLayers,
    index: u32,
    colors: &[Color],
) -> Result<(), TileError> {
    if colors.len() != layers.mask_count() {
        return Err(TileError::BadColorCount {
            expected: layers.mask_count(),
            found: colors.len(),
        });
    }
    fill(canvas, colors[0]);
    stamp_layers(canvas, layers, index, &colors[1..])
}

/// Composite a background tile and a foreground tile into one cell.
///
/// The bottom tile is composited normally; the top tile is stamped over it
/// without its own background fill, so `fg_colors` holds only its per-layer
/// replacement colours (the top tile's background colour never matters).
pub fn composite_pair_into(
    canvas: &mut RgbaImage,
    layers: &TileLayers,
    bg_index: u32,
    bg_colors: &[Color],
    fg_index: u32,
    fg_colors: &[Color],
) -> Result<(), TileError> {
    if bg_colors.len() != layers.mask_count() {
        return Err(TileError::BadColorCount {
            expected: layers.mask_count(),
            found: bg_colors.len(),
        });
    }
    if fg_colors.len() != layers.mask_count() - 1 {
        return Err(TileError::BadColorCount {
            expected: layers.mask_count() - 1,
            found: fg_colors.len(),
        });
    }
    fill(canvas, bg_colors[0]);
    stamp_layers(canvas, layers, bg_index, &bg_colors[1..])?;
    stamp_layers(canvas, layers, fg_index, fg_colors)
}

/// Allocate and composite one tile (the non-cached fallback path).
pub fn composite(
    layers: &TileLayers,
    index: u32,
    colors: &[Color],
) -> Result<RgbaImage, TileError> {
    let mut canvas = RgbaImage::new(layers.cell_width(), layers.cell_height());
    composite_into(&mut canvas, layers, index, colors)?;
    Ok(canvas)
}

fn fill(canvas: &mut RgbaImage, color: Color) {
    let px = Rgba(color.to_bytes());
    for pixel in canvas.pixels_mut() {
        *pixel = px;
    }
}

/// Stamp every layer of one tile onto `canvas`, bottom-up.
fn stamp_layers(
    canvas: &mut RgbaImage,
    layers: &TileLayers,
    index: u32,
    layer_colors: &[Color],
) -> Result<(), TileError> {
    if index == NO_TILE {
        return Ok(());
    }
    let (src_x, src_y) = layers.tile_origin(index).ok_or(TileError::BadTileIndex {
        index,
        count: layers.tile_count(),
    })?;

    for (i, &replacement) in layer_colors.iter().enumerate() {
        let mask = layers.masks()[i + 1];
        let layer = layers.layer(i);
        let replacement_px = Rgba(replacement.to_bytes());
        for y in 0..layers.cell_height() {
            for x in 0..layers.cell_width() {
                let src = *layer.get_pixel(src_x + x, src_y + y);
                if src.0[3] == 0 {
                    continue;
                }
                // Mask-coloured pixels take the replacement; literal
                // artwork keeps its own colour.
                let px = if src.0[0] == mask.r() && src.0[1] == mask.g() && src.0[2] == mask.b()
                {
                    replacement_px
                } else {
                    src
                };
                canvas.put_pixel(x, y, px);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::resize_nearest;
    use crate::layers::tests::{test_sheet, BG, FG, OUTLINE, STONE};

    const BLUE: Color = Color::from_rgb(0, 0, 0xFF);
    const RED: Color = Color::from_rgb(0xFF, 0, 0);
    const GREEN: Color = Color::from_rgb(0, 0xFF, 0);

    fn extract_tile(sheet: &RgbaImage, tile: (u32, u32), index: u32) -> RgbaImage {
        let cols = sheet.width() / tile.0;
        let x0 = (index % cols) * tile.0;
        let y0 = (index / cols) * tile.1;
        let mut out = RgbaImage::new(tile.0, tile.1);
        for y in 0..tile.1 {
            for x in 0..tile.0 {
                out.put_pixel(x, y, *sheet.get_pixel(x0 + x, y0 + y));
            }
        }
        out
    }

    /// Compositing with the original mask colours reproduces the resized
    /// source tile exactly.
    #[test]
    fn round_trip_decomposition() {
        let sheet = test_sheet();
        let masks = [BG, FG, OUTLINE];
        for cell in [(4, 4), (8, 8), (12, 4)] {
            let layers = TileLayers::build(&sheet, (4, 4), cell, &masks).unwrap();
            for index in 0..layers.tile_count() {
                let got = composite(&layers, index, &masks).unwrap();
                let want =
                    resize_nearest(&extract_tile(&sheet, (4, 4), index), cell.0, cell.1);
                // Compare RGB; decomposition does not preserve the
                // background's alpha byte.
                for (g, w) in got.pixels().zip(want.pixels()) {
                    assert_eq!(g.0[..3], w.0[..3], "cell {cell:?} tile {index}");
                }
            }
        }
    }

    /// Two masks, colours `[blue, red]`: red where the source was white
    /// (the foreground mask), blue elsewhere.
    #[test]
    fn recolors_foreground_mask() {
        let sheet = test_sheet();
        let layers = TileLayers::build(&sheet, (4, 4), (4, 4), &[BG, FG]).unwrap();
        let out = composite(&layers, 1, &[BLUE, RED]).unwrap();
        for y in 0..4u32 {
            for x in 0..4u32 {
                let was_white = (1..3).contains(&x) && (1..3).contains(&y);
                let want = if was_white { RED } else { BLUE };
                assert_eq!(out.get_pixel(x, y).0[..3], want.to_bytes()[..3]);
            }
        }
    }

    #[test]
    fn literal_artwork_survives_recoloring() {
        let sheet = test_sheet();
        let layers = TileLayers::build(&sheet, (4, 4), (4, 4), &[BG, FG, OUTLINE]).unwrap();
        let out = composite(&layers, 0, &[BLUE, RED, GREEN]).unwrap();
        assert_eq!(out.get_pixel(1, 1).0[..3], RED.to_bytes()[..3]); // was FG mask
        assert_eq!(out.get_pixel(2, 1).0[..3], GREEN.to_bytes()[..3]); // was outline mask
        assert_eq!(out.get_pixel(1, 2).0[..3], STONE.to_bytes()[..3]); // literal colour
        assert_eq!(out.get_pixel(0, 0).0[..3], BLUE.to_bytes()[..3]); // background
    }

    #[test]
    fn no_tile_sentinel_skips_stamping() {
        let sheet = test_sheet();
        let layers = TileLayers::build(&sheet, (4, 4), (4, 4), &[BG, FG]).unwrap();
        let out = composite(&layers, NO_TILE, &[BLUE, RED]).unwrap();
        assert!(out.pixels().all(|p| p.0[..3] == BLUE.to_bytes()[..3]));
    }

    #[test]
    fn pair_ignores_foreground_background_color() {
        let sheet = test_sheet();
        let layers = TileLayers::build(&sheet, (4, 4), (4, 4), &[BG, FG, OUTLINE]).unwrap();

        let mut canvas = RgbaImage::new(4, 4);
        // Bottom: tile 1 (solid foreground block) in red on blue.
        // Top: tile 0 in green with a white outline.
        composite_pair_into(
            &mut canvas,
            &layers,
            1,
            &[BLUE, RED, GREEN],
            0,
            &[GREEN, Color::WHITE],
        )
        .unwrap();

        // Top tile's foreground-mask pixel.
        assert_eq!(canvas.get_pixel(1, 1).0[..3], GREEN.to_bytes()[..3]);
        // Top tile's outline-mask pixel.
        assert_eq!(canvas.get_pixel(2, 1).0[..3], Color::WHITE.to_bytes()[..3]);
        // Top tile's literal pixel.
        assert_eq!(canvas.get_pixel(1, 2).0[..3], STONE.to_bytes()[..3]);
        // Everywhere the top tile is transparent, the bottom shows through.
        assert_eq!(canvas.get_pixel(0, 0).0[..3], BLUE.to_bytes()[..3]);
        assert_eq!(canvas.get_pixel(3, 3).0[..3], BLUE.to_bytes()[..3]);
    }

    #[test]
    fn pair_with_no_background_tile() {
        let sheet = test_sheet();
        let layers = TileLayers::build(&sheet, (4, 4), (4, 4), &[BG, FG]).unwrap();
        let mut canvas = RgbaImage::new(4, 4);
        composite_pair_into(&mut canvas, &layers, NO_TILE, &[BLUE, RED], 1, &[RED]).unwrap();
        assert_eq!(canvas.get_pixel(1, 1).0[..3], RED.to_bytes()[..3]);
        assert_eq!(canvas.get_pixel(0, 0).0[..3], BLUE.to_bytes()[..3]);
    }

    #[test]
    fn rejects_bad_requests() {
        let sheet = test_sheet();
        let layers = TileLayers::build(&sheet, (4, 4), (4, 4), &[BG, FG]).unwrap();
        assert_eq!(
            composite(&layers, 7, &[BLUE, RED]).unwrap_err(),
            TileError::BadTileIndex { index: 7, count: 2 }
        );
        assert_eq!(
            composite(&layers, 0, &[BLUE]).unwrap_err(),
            TileError::BadColorCount {
                expected: 2,
                found: 1
            }
        );
    }
}
