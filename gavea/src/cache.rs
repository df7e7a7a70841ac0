//! Glyph cache: (glyph index, style) to atlas regions.
//!
//! Open addressing with linear probing over a fixed-capacity table
//! (4096 entries by default; the table never resizes). The cache owns
//! the atlas: a full table or a full atlas triggers exactly one
//! recovery (grow the atlas, drop every entry, retry), after which a
//! failing glyph is reported unavailable and skipped by callers.

use tracing::{debug, warn};

use crate::atlas::{Atlas, AtlasRegion};
use crate::font::{FontStore, FontStyle};

pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// A resident glyph: where it lives in the atlas and how to place it.
/// Zero-area glyphs (space) keep a degenerate region with `valid` set,
/// so repeated lookups stay cheap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedGlyph {
    pub region: AtlasRegion,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub advance_x: i32,
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Key {
    glyph_index: u32,
    style: u8,
}

struct Slot {
    key: Key,
    glyph: CachedGlyph,
}

enum Miss {
    TableFull,
    AtlasFull,
    Unrasterizable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub unavailable: u64,
}

pub struct GlyphCache {
    slots: Vec<Option<Slot>>,
    len: usize,
    atlas: Atlas,
    stats: CacheStats,
}

impl GlyphCache {
    pub fn new(atlas_size: u32) -> Self {
        Self::with_capacity(atlas_size, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(atlas_size: u32, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            len: 0,
            atlas: Atlas::new(atlas_size),
            stats: CacheStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    /// See [`Atlas::take_dirty`]; forwarded so the renderer never
    /// mutates the atlas directly.
    pub fn take_atlas_dirty(&mut self) -> bool {
        self.atlas.take_dirty()
    }

    /// Looks up a glyph, rasterizing and packing it on miss. Returns
    /// `None` when the glyph stays unavailable after the one recovery
    /// pass; the caller should skip the quad and advance by the
    /// nominal cell width.
    pub fn get(
        &mut self,
        glyph_index: u32,
        style: FontStyle,
        fonts: &FontStore,
    ) -> Option<CachedGlyph> {
        if glyph_index == 0 {
            return None;
        }
        let key = Key {
            glyph_index,
            style: style.bits(),
        };

        match self.lookup_or_insert(key, style, fonts) {
            Ok(glyph) => Some(glyph),
            Err(Miss::Unrasterizable) => {
                self.stats.unavailable += 1;
                None
            }
            Err(_) => {
                // One recovery: grow the atlas (a grow invalidates every
                // region, so the table goes with it) and retry once. At
                // the size cap the clear alone frees the space.
                debug!(glyph_index, ?style, "cache full, regrowing atlas");
                match self.atlas.grow() {
                    Ok(()) => self.clear_entries(),
                    Err(_) => self.clear(),
                }
                match self.lookup_or_insert(key, style, fonts) {
                    Ok(glyph) => Some(glyph),
                    Err(_) => {
                        warn!(glyph_index, ?style, "glyph unavailable after recovery");
                        self.stats.unavailable += 1;
                        None
                    }
                }
            }
        }
    }

    /// Codepoint entry point: resolves the glyph index through the
    /// styled face, retrying the regular face's charmap when the styled
    /// one has no mapping for the codepoint.
    pub fn get_by_codepoint(
        &mut self,
        codepoint: char,
        style: FontStyle,
        fonts: &FontStore,
    ) -> Option<CachedGlyph> {
        let mut index = fonts.glyph_index(codepoint, style);
        if index == 0 && style != FontStyle::Regular {
            index = fonts.glyph_index(codepoint, FontStyle::Regular);
        }
        if index == 0 {
            return None;
        }
        self.get(u32::from(index), style, fonts)
    }

    /// Warms the cache for a set of codepoints (typically printable
    /// ASCII at startup).
    pub fn prefetch(
        &mut self,
        codepoints: impl IntoIterator<Item = char>,
        style: FontStyle,
        fonts: &FontStore,
    ) {
        for cp in codepoints {
            self.get_by_codepoint(cp, style, fonts);
        }
    }

    /// Drops every entry and clears the atlas. Required after any font
    /// reload or size change: glyph indices and regions are both stale.
    pub fn clear(&mut self) {
        self.clear_entries();
        self.atlas.clear();
    }

    fn clear_entries(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.len = 0;
    }

    fn lookup_or_insert(
        &mut self,
        key: Key,
        style: FontStyle,
        fonts: &FontStore,
    ) -> Result<CachedGlyph, Miss> {
        let index = self.find_slot(key).ok_or(Miss::TableFull)?;
        if let Some(slot) = &self.slots[index] {
            self.stats.hits += 1;
            return Ok(slot.glyph);
        }
        self.stats.misses += 1;

        let bitmap = fonts
            .rasterize(key.glyph_index as u16, style)
            .ok_or(Miss::Unrasterizable)?;

        let region = if bitmap.width > 0 && bitmap.height > 0 {
            let region = self
                .atlas
                .allocate(bitmap.width, bitmap.height)
                .map_err(|_| Miss::AtlasFull)?;
            self.atlas.upload(&region, &bitmap.data);
            region
        } else {
            AtlasRegion::default()
        };

        let glyph = CachedGlyph {
            region,
            bearing_x: bitmap.bearing_x,
            bearing_y: bitmap.bearing_y,
            advance_x: bitmap.advance_x,
            valid: true,
        };
        self.slots[index] = Some(Slot { key, glyph });
        self.len += 1;
        Ok(glyph)
    }

    /// First empty or matching slot on the probe sequence; `None` when
    /// the table is saturated.
    fn find_slot(&self, key: Key) -> Option<usize> {
        let capacity = self.slots.len();
        let start = (hash_key(key) % capacity as u64) as usize;
        for i in 0..capacity {
            let index = (start + i) % capacity;
            match &self.slots[index] {
                None => return Some(index),
                Some(slot) if slot.key == key => return Some(index),
                Some(_) => {}
            }
        }
        None
    }
}

fn hash_key(key: Key) -> u64 {
    let mut h = (u64::from(key.glyph_index) << 8) | u64::from(key.style);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}
