//! The rendering context and its draw operations.

use image::{Rgba, RgbaImage};
use tileterm_core::{Color, ColorContext, DrawRequest, NO_TILE, Palette, Point};
use tileterm_font::FontRenderer;
use tileterm_tiles::{
    TileCache, TileError, TileKey, TileLayers, composite_into, composite_pair_into,
};

// ---------------------------------------------------------------------------
// Tileset
// ---------------------------------------------------------------------------

/// Configuration for loading a tileset.
#[derive(Clone, Debug)]
pub struct TilesetConfig {
    /// Per-tile pixel size in the source sheet.
    pub tile_width: u32,
    pub tile_height: u32,
    /// Mask colours; index 0 is the background mask.
    pub mask_colors: Vec<Color>,
    /// Replacement colours for masks beyond the foreground (the outline
    /// mask in three-mask tilesets).
    pub extra_colors: Vec<Color>,
    /// Composited-tile cache capacity in cells; 0 disables caching.
    pub cache_capacity: usize,
}

impl Default for TilesetConfig {
    fn default() -> Self {
        Self {
            tile_width: 16,
            tile_height: 16,
            mask_colors: vec![
                Color::BLACK,
                Color::WHITE,
                Color::from_rgb(0xFF, 0xFF, 0),
            ],
            extra_colors: vec![Color::BLACK],
            cache_capacity: 1024,
        }
    }
}

/// A loaded tileset: the source sheet, its decomposed mask layers at the
/// current cell size, and the composited-tile cache.
pub struct Tileset {
    sheet: RgbaImage,
    config: TilesetConfig,
    layers: TileLayers,
    cache: TileCache,
}

impl Tileset {
    /// Number of tiles in the sheet.
    pub fn tile_count(&self) -> u32 {
        self.layers.tile_count()
    }

    /// Number of currently cached composited cells.
    pub fn cached_tiles(&self) -> usize {
        self.cache.valid_len()
    }
}

// ---------------------------------------------------------------------------
// Draw output
// ---------------------------------------------------------------------------

/// Pixels produced by a draw call: either freshly rendered (text lines) or
/// a view into cache-owned memory (tiles).
pub enum CellPixels<'a> {
    Owned(RgbaImage),
    Borrowed(&'a RgbaImage),
}

impl CellPixels<'_> {
    /// The pixel buffer, however it is owned.
    pub fn image(&self) -> &RgbaImage {
        match self {
            Self::Owned(img) => img,
            Self::Borrowed(img) => *img,
        }
    }
}

/// The outcome of a draw call: ready pixels plus the pixel offset where the
/// windowing layer should blit them.
pub struct DrawResult<'a> {
    pub pixels: CellPixels<'a>,
    pub pos: Point,
}

// ---------------------------------------------------------------------------
// RenderContext
// ---------------------------------------------------------------------------

/// Everything one terminal needs to turn draw requests into pixels.
///
/// Draw calls never fail: a bad request is logged and degrades to a solid
/// block in the request's foreground colour, so one malformed draw can
/// never take down the client.
pub struct RenderContext {
    font: Box<dyn FontRenderer>,
    tileset: Option<Tileset>,
    palette: Palette,
    colors: ColorContext,
    origin: Point,
    /// Fallback cell buffer: placeholder blocks, and composites when the
    /// cache is disabled.
    scratch: RgbaImage,
}

impl RenderContext {
    /// Create a context rendering with `font` and a fresh palette of
    /// `palette_size` entries.
    pub fn new(font: impl FontRenderer + 'static, palette_size: usize) -> Self {
        let scratch = RgbaImage::new(font.cell_width().max(1), font.cell_height().max(1));
        Self {
            font: Box::new(font),
            tileset: None,
            palette: Palette::new(palette_size),
            colors: ColorContext::default(),
            origin: Point::ZERO,
            scratch,
        }
    }

    /// Cell width in pixels.
    pub fn cell_width(&self) -> u32 {
        self.font.cell_width()
    }

    /// Cell height in pixels.
    pub fn cell_height(&self) -> u32 {
        self.font.cell_height()
    }

    /// Pixel origin added to every draw position.
    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }

    /// The current colour pair.
    pub fn colors(&self) -> &ColorContext {
        &self.colors
    }

    /// Set the current foreground/background pair.
    pub fn set_color_pair(&mut self, fg: Color, bg: Color) {
        self.colors.set_pair(fg, bg);
    }

    /// Resolve a colour spec — `"fg"`, `"bg"`, a name, `"#RRGGBB"`, or a
    /// palette index — against the current pair and palette.
    pub fn resolve_color(&self, spec: &str) -> Color {
        if let Ok(index) = spec.parse::<usize>() {
            if index < self.palette.len() {
                return self.palette.entry(index);
            }
        }
        self.colors.resolve(spec)
    }

    /// The active palette.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Reassign one palette entry, dropping any cached tiles that were
    /// composited with the previous colour.
    pub fn set_palette_entry(&mut self, index: usize, color: Color) {
        if let Some(prev) = self.palette.set_entry(index, color) {
            if prev != color {
                if let Some(ts) = self.tileset.as_mut() {
                    ts.cache.invalidate_color(prev);
                }
            }
        }
    }

    /// Replace the font. When a tileset is loaded, its layers and cache are
    /// rebuilt for the new cell size; on failure the previous font and
    /// layers stay untouched and usable.
    pub fn set_font(&mut self, font: impl FontRenderer + 'static) -> Result<(), TileError> {
        let (cell_w, cell_h) = (font.cell_width().max(1), font.cell_height().max(1));
        if let Some(ts) = self.tileset.as_mut() {
            let layers = TileLayers::build(
                &ts.sheet,
                (ts.config.tile_width, ts.config.tile_height),
                (cell_w, cell_h),
                &ts.config.mask_colors,
            )?;
            ts.layers = layers;
            ts.cache = TileCache::new(ts.config.cache_capacity, cell_w, cell_h);
        }
        self.font = Box::new(font);
        self.scratch = RgbaImage::new(cell_w, cell_h);
        Ok(())
    }

    /// Load a tileset from a decoded sprite sheet. On failure the previous
    /// tileset (if any) stays loaded.
    pub fn set_tileset(&mut self, sheet: RgbaImage, config: TilesetConfig) -> Result<(), TileError> {
        let (cell_w, cell_h) = (self.cell_width().max(1), self.cell_height().max(1));
        let layers = TileLayers::build(
            &sheet,
            (config.tile_width, config.tile_height),
            (cell_w, cell_h),
            &config.mask_colors,
        )?;
        let cache = TileCache::new(config.cache_capacity, cell_w, cell_h);
        self.tileset = Some(Tileset {
            sheet,
            config,
            layers,
            cache,
        });
        Ok(())
    }

    /// Unload the tileset; tile draws fall back to placeholder blocks.
    pub fn clear_tileset(&mut self) {
        self.tileset = None;
    }

    /// The loaded tileset, if any.
    pub fn tileset(&self) -> Option<&Tileset> {
        self.tileset.as_ref()
    }

    /// Drop every cached composited tile (e.g. after a wholesale palette
    /// redefinition).
    pub fn invalidate_tiles(&mut self) {
        if let Some(ts) = self.tileset.as_mut() {
            ts.cache.invalidate_all();
        }
    }

    // -- draw operations ----------------------------------------------------

    /// Dispatch one draw request from the terminal layer.
    pub fn handle(&mut self, request: &DrawRequest) -> DrawResult<'_> {
        match request {
            DrawRequest::Text { pos, attr, text } => self.draw_text(pos.x, pos.y, *attr, text),
            DrawRequest::Tile { pos, attr, index } => self.draw_tile(pos.x, pos.y, *attr, *index),
            DrawRequest::TilePair {
                pos,
                bg_attr,
                bg_index,
                fg_attr,
                fg_index,
            } => self.draw_tile_pair(pos.x, pos.y, *bg_attr, *bg_index, *fg_attr, *fg_index),
        }
    }

    /// Render a run of text at grid position (`col`, `row`) with the
    /// attribute's palette colour on the current background.
    pub fn draw_text(&mut self, col: i32, row: i32, attr: u8, text: &str) -> DrawResult<'_> {
        let pos = self.cell_pos(col, row);
        let fg = self.palette.entry(attr as usize);
        let bg = self.colors.bg();
        let img = self.font.render_line(text, fg, bg);
        DrawResult {
            pixels: CellPixels::Owned(img),
            pos,
        }
    }

    /// Render one graphical tile at grid position (`col`, `row`).
    pub fn draw_tile(&mut self, col: i32, row: i32, attr: u8, index: u32) -> DrawResult<'_> {
        let pos = self.cell_pos(col, row);
        let fg = self.palette.entry(attr as usize);
        let bg = self.colors.bg();

        let Some(colors) = self.tile_colors(fg, bg) else {
            log::error!("tile draw without a loaded tileset");
            return self.block(fg, pos);
        };
        if !self.tile_index_ok(index) {
            log::error!("tile index {index} out of range");
            return self.block(fg, pos);
        }
        if fg == bg {
            // Compositing would be indistinguishable from a flat fill.
            return self.block(bg, pos);
        }

        let key = TileKey::Single { index, colors };
        let in_scratch = self.prepare(&key);
        self.fetch(&key, in_scratch, pos)
    }

    /// Render a background tile and a foreground tile stacked in one cell.
    pub fn draw_tile_pair(
        &mut self,
        col: i32,
        row: i32,
        bg_attr: u8,
        bg_index: u32,
        fg_attr: u8,
        fg_index: u32,
    ) -> DrawResult<'_> {
        let pos = self.cell_pos(col, row);
        let bg = self.colors.bg();
        let bottom_fg = self.palette.entry(bg_attr as usize);
        let top_fg = self.palette.entry(fg_attr as usize);

        let (Some(bg_colors), Some(fg_colors)) =
            (self.tile_colors(bottom_fg, bg), self.layer_colors(top_fg))
        else {
            log::error!("tile pair draw without a loaded tileset");
            return self.block(top_fg, pos);
        };
        if !self.tile_index_ok(bg_index) || !self.tile_index_ok(fg_index) {
            log::error!("tile pair indices ({bg_index}, {fg_index}) out of range");
            return self.block(top_fg, pos);
        }
        if bottom_fg == bg && top_fg == bg {
            return self.block(bg, pos);
        }

        let key = TileKey::Pair {
            bg_index,
            fg_index,
            bg_colors,
            fg_colors,
        };
        let in_scratch = self.prepare(&key);
        self.fetch(&key, in_scratch, pos)
    }

    // -- internals ----------------------------------------------------------

    fn cell_pos(&self, col: i32, row: i32) -> Point {
        self.origin
            + Point::new(col, row).to_pixels(self.cell_width() as i32, self.cell_height() as i32)
    }

    /// The full replacement colour set for one tile: current background,
    /// the attr's palette colour, then the tileset's extra mask colours.
    fn tile_colors(&self, fg: Color, bg: Color) -> Option<Vec<Color>> {
        let ts = self.tileset.as_ref()?;
        let mut colors = Vec::with_capacity(ts.layers.mask_count());
        colors.push(bg);
        colors.push(fg);
        colors.extend(self.extra_colors(ts));
        Some(colors)
    }

    /// Per-layer replacement colours only (no background) — what a pair's
    /// foreground tile composites with.
    fn layer_colors(&self, fg: Color) -> Option<Vec<Color>> {
        let ts = self.tileset.as_ref()?;
        let mut colors = Vec::with_capacity(ts.layers.mask_count() - 1);
        colors.push(fg);
        colors.extend(self.extra_colors(ts));
        Some(colors)
    }

    fn extra_colors<'a>(&self, ts: &'a Tileset) -> impl Iterator<Item = Color> + 'a {
        (2..ts.layers.mask_count())
            .map(move |i| ts.config.extra_colors.get(i - 2).copied().unwrap_or(Color::BLACK))
    }

    fn tile_index_ok(&self, index: u32) -> bool {
        index == NO_TILE
            || self
                .tileset
                .as_ref()
                .is_some_and(|ts| index < ts.layers.tile_count())
    }

    /// Fill the scratch buffer with a solid colour — the visible
    /// placeholder for degraded draws, and the flat-fill fast path.
    fn block(&mut self, color: Color, pos: Point) -> DrawResult<'_> {
        let px = Rgba(color.to_bytes());
        for pixel in self.scratch.pixels_mut() {
            *pixel = px;
        }
        DrawResult {
            pixels: CellPixels::Borrowed(&self.scratch),
            pos,
        }
    }

    /// Ensure the composited cell for `key` exists — in the cache, or in
    /// the scratch buffer when the cache is disabled. Returns `true` when
    /// the scratch buffer holds it.
    fn prepare(&mut self, key: &TileKey) -> bool {
        let Some(ts) = self.tileset.as_mut() else {
            fill(&mut self.scratch, key_background(key));
            return true;
        };
        if ts.cache.lookup(key).is_some() {
            return false;
        }

        let result = match ts.cache.insert(key.clone()) {
            Some(slot) => render_key(slot, &ts.layers, key).map(|_| false),
            None => render_key(&mut self.scratch, &ts.layers, key).map(|_| true),
        };
        match result {
            Ok(in_scratch) => in_scratch,
            Err(err) => {
                // Validation happens before keys are built, so this is a
                // logic error; make sure the claimed slot cannot serve
                // stale pixels.
                log::error!("tile compositing failed: {err}");
                ts.cache.invalidate_key(key);
                fill(&mut self.scratch, key_background(key));
                true
            }
        }
    }

    fn fetch(&self, key: &TileKey, in_scratch: bool, pos: Point) -> DrawResult<'_> {
        let pixels = match (&self.tileset, in_scratch) {
            (Some(ts), false) => ts.cache.lookup(key).unwrap_or(&self.scratch),
            _ => &self.scratch,
        };
        DrawResult {
            pixels: CellPixels::Borrowed(pixels),
            pos,
        }
    }
}

fn fill(canvas: &mut RgbaImage, color: Color) {
    let px = Rgba(color.to_bytes());
    for pixel in canvas.pixels_mut() {
        *pixel = px;
    }
}

fn key_background(key: &TileKey) -> Color {
    match key {
        TileKey::Single { colors, .. } => colors.first().copied().unwrap_or(Color::BLACK),
        TileKey::Pair { bg_colors, .. } => bg_colors.first().copied().unwrap_or(Color::BLACK),
    }
}

fn render_key(canvas: &mut RgbaImage, layers: &TileLayers, key: &TileKey) -> Result<(), TileError> {
    match key {
        TileKey::Single { index, colors } => composite_into(canvas, layers, *index, colors),
        TileKey::Pair {
            bg_index,
            fg_index,
            bg_colors,
            fg_colors,
        } => composite_pair_into(canvas, layers, *bg_index, bg_colors, *fg_index, fg_colors),
    }
}
