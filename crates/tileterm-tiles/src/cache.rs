//! The composited-tile cache.
//!
//! A fixed number of slots maps (tile, colour set) keys to pre-rendered
//! cell buffers. Admission is two-step: [`TileCache::insert`] claims a slot
//! and hands back its cleared buffer, and the compositor renders directly
//! into it — no copy. Eviction fills holes first, then walks a circular
//! FIFO pointer, so admission is O(1) and total memory stays bounded at
//! `capacity * cell_width * cell_height * 4` bytes.

use image::RgbaImage;
use tileterm_core::Color;

/// Key identifying one composited cell.
///
/// Keys are equal iff the tile indices and every colour that participates
/// in compositing match exactly. The pair variant stores the foreground
/// tile's per-layer colours only — its background colour is ignored during
/// compositing, so it must not affect equality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileKey {
    Single {
        index: u32,
        colors: Vec<Color>,
    },
    Pair {
        bg_index: u32,
        fg_index: u32,
        bg_colors: Vec<Color>,
        fg_colors: Vec<Color>,
    },
}

impl TileKey {
    /// Whether any colour in the key equals `color`.
    pub fn uses_color(&self, color: Color) -> bool {
        match self {
            Self::Single { colors, .. } => colors.contains(&color),
            Self::Pair {
                bg_colors,
                fg_colors,
                ..
            } => bg_colors.contains(&color) || fg_colors.contains(&color),
        }
    }
}

struct Slot {
    /// `None` marks a hole.
    key: Option<TileKey>,
    pixels: RgbaImage,
}

/// Bounded store of composited cells.
///
/// Capacity 0 disables the cache entirely: every lookup misses and inserts
/// return `None`, so callers always need the live-composite fallback.
pub struct TileCache {
    slots: Vec<Slot>,
    /// Next slot to evict once no holes remain.
    evict_at: usize,
}

impl TileCache {
    /// Create a cache of `capacity` cell buffers of the given size.
    ///
    /// All backing memory is allocated up front and reused across
    /// invalidations.
    pub fn new(capacity: usize, cell_width: u32, cell_height: u32) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                key: None,
                pixels: RgbaImage::new(cell_width.max(1), cell_height.max(1)),
            })
            .collect();
        Self { slots, evict_at: 0 }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of valid entries.
    pub fn valid_len(&self) -> usize {
        self.slots.iter().filter(|s| s.key.is_some()).count()
    }

    /// Find the cached buffer for `key`, if present.
    pub fn lookup(&self, key: &TileKey) -> Option<&RgbaImage> {
        self.slots
            .iter()
            .find(|s| s.key.as_ref() == Some(key))
            .map(|s| &s.pixels)
    }

    /// Claim a slot for `key` and return its cleared buffer for the
    /// compositor to render into. Returns `None` when the cache is
    /// disabled (capacity 0).
    pub fn insert(&mut self, key: TileKey) -> Option<&mut RgbaImage> {
        if self.slots.is_empty() {
            return None;
        }
        let slot_index = match self.slots.iter().position(|s| s.key.is_none()) {
            Some(hole) => hole,
            None => {
                // No holes: evict the oldest insertion.
                let index = self.evict_at;
                self.evict_at = (self.evict_at + 1) % self.slots.len();
                index
            }
        };
        let slot = &mut self.slots[slot_index];
        slot.key = Some(key);
        slot.pixels.fill(0);
        Some(&mut slot.pixels)
    }

    /// Mark the slot holding `key` (if any) as a hole.
    pub fn invalidate_key(&mut self, key: &TileKey) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.key.as_ref() == Some(key)) {
            slot.key = None;
        }
    }

    /// Mark every slot as a hole without freeing backing memory.
    pub fn invalidate_all(&mut self) {
        for slot in &mut self.slots {
            slot.key = None;
        }
    }

    /// Mark as holes all slots whose key uses `color`. Returns the number
    /// of entries dropped.
    pub fn invalidate_color(&mut self, color: Color) -> usize {
        let mut dropped = 0;
        for slot in &mut self.slots {
            if slot.key.as_ref().is_some_and(|k| k.uses_color(color)) {
                slot.key = None;
                dropped += 1;
            }
        }
        if dropped > 0 {
            log::debug!("invalidated {dropped} cached tiles using {color}");
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u32) -> TileKey {
        TileKey::Single {
            index: n,
            colors: vec![Color::from_rgb(n as u8, 0, 0), Color::WHITE],
        }
    }

    #[test]
    fn lookup_after_insert() {
        let mut cache = TileCache::new(8, 2, 2);
        assert!(cache.lookup(&key(1)).is_none());
        let buf = cache.insert(key(1)).unwrap();
        buf.put_pixel(0, 0, image::Rgba([1, 2, 3, 4]));
        let hit = cache.lookup(&key(1)).unwrap();
        assert_eq!(hit.get_pixel(0, 0).0, [1, 2, 3, 4]);
    }

    #[test]
    fn insert_hands_back_cleared_buffer() {
        let mut cache = TileCache::new(1, 2, 2);
        cache
            .insert(key(1))
            .unwrap()
            .put_pixel(1, 1, image::Rgba([9, 9, 9, 9]));
        // Evicting reuses the slot; the buffer must come back blank.
        let buf = cache.insert(key(2)).unwrap();
        assert!(buf.pixels().all(|p| p.0 == [0, 0, 0, 0]));
        assert!(cache.lookup(&key(1)).is_none());
    }

    /// Inserting 300 distinct keys into a 256-slot cache evicts exactly
    /// the first 44 keys, in insertion order.
    #[test]
    fn fifo_eviction_order() {
        let mut cache = TileCache::new(256, 1, 1);
        for n in 0..300 {
            cache.insert(key(n));
        }
        assert_eq!(cache.valid_len(), 256);
        for n in 0..44 {
            assert!(cache.lookup(&key(n)).is_none(), "key {n} should be evicted");
        }
        for n in 44..300 {
            assert!(cache.lookup(&key(n)).is_some(), "key {n} should remain");
        }
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let mut cache = TileCache::new(16, 1, 1);
        for n in 0..1000 {
            cache.insert(key(n));
            assert!(cache.valid_len() <= 16);
        }
    }

    #[test]
    fn invalidation_reuses_holes_first() {
        let mut cache = TileCache::new(4, 1, 1);
        for n in 0..4 {
            cache.insert(key(n));
        }
        cache.invalidate_color(Color::from_rgb(2, 0, 0));
        assert_eq!(cache.valid_len(), 3);
        assert!(cache.lookup(&key(2)).is_none());
        // The hole left by key 2 is refilled before anything is evicted.
        cache.insert(key(9));
        assert_eq!(cache.valid_len(), 4);
        for n in [0, 1, 3, 9] {
            assert!(cache.lookup(&key(n)).is_some());
        }
    }

    #[test]
    fn invalidate_all_keeps_capacity() {
        let mut cache = TileCache::new(4, 1, 1);
        for n in 0..4 {
            cache.insert(key(n));
        }
        cache.invalidate_all();
        assert_eq!(cache.valid_len(), 0);
        assert_eq!(cache.capacity(), 4);
    }

    #[test]
    fn pair_keys_distinguish_layers_not_fg_background() {
        let a = TileKey::Pair {
            bg_index: 1,
            fg_index: 2,
            bg_colors: vec![Color::BLACK, Color::WHITE],
            fg_colors: vec![Color::WHITE],
        };
        let mut b = a.clone();
        assert_eq!(a, b);
        if let TileKey::Pair { fg_colors, .. } = &mut b {
            fg_colors[0] = Color::from_rgb(1, 2, 3);
        }
        assert_ne!(a, b);
    }

    #[test]
    fn disabled_cache_always_misses() {
        let mut cache = TileCache::new(0, 8, 8);
        assert!(cache.insert(key(1)).is_none());
        assert!(cache.lookup(&key(1)).is_none());
        assert_eq!(cache.capacity(), 0);
    }
}
