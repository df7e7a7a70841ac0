//! Shelf-packed single-channel glyph atlas.
//!
//! The atlas owns a CPU-side pixel buffer; the GPU backend turns it
//! into a texture at flush time, keeping all platform texture handling
//! out of the packing logic. Regions are valid only for the generation
//! that produced them: grow() and clear() bump the generation and
//! invalidate every previously returned region.

use thiserror::Error;
use tracing::{debug, info, warn};

/// Guard space between glyphs on each axis, against bilinear bleed.
pub const ATLAS_PADDING: u32 = 1;
/// Side length cap; growth beyond this is refused.
pub const MAX_ATLAS_SIZE: u32 = 8192;

const DEFAULT_ATLAS_SIZE: u32 = 1024;
const MAX_SHELVES: usize = 256;
const FULL_USAGE_RATIO: f32 = 0.9;
const FULL_VERTICAL_MARGIN: u32 = 32;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AtlasError {
    #[error("atlas has no room for the requested region")]
    Full,
    #[error("atlas already at maximum size")]
    CapReached,
}

/// A packed rectangle plus its normalized texture coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

/// A horizontal strip of fixed height filled left to right.
struct Shelf {
    y: u32,
    height: u32,
    x_cursor: u32,
}

pub struct Atlas {
    size: u32,
    pixels: Vec<u8>,
    shelves: Vec<Shelf>,
    current_y: u32,
    allocated_pixels: u64,
    generation: u64,
    dirty: bool,
}

impl Atlas {
    /// Creates an atlas whose side is `initial_size` rounded up to the
    /// next power of two (1024 when zero).
    pub fn new(initial_size: u32) -> Self {
        let size = if initial_size == 0 {
            DEFAULT_ATLAS_SIZE
        } else {
            initial_size.next_power_of_two()
        };
        Self {
            size,
            pixels: vec![0; (size * size) as usize],
            shelves: Vec::new(),
            current_y: 0,
            allocated_pixels: 0,
            generation: 0,
            dirty: false,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Changes whenever existing regions become invalid (grow/clear).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// True once when the pixel buffer changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Reserves a `width` x `height` region with a 1px guard on each
    /// axis. Scans existing shelves first, then opens a new shelf at
    /// the vertical cursor.
    pub fn allocate(&mut self, width: u32, height: u32) -> Result<AtlasRegion, AtlasError> {
        if width == 0 || height == 0 {
            return Err(AtlasError::Full);
        }

        let padded_width = width + ATLAS_PADDING;
        let padded_height = height + ATLAS_PADDING;

        for shelf in &mut self.shelves {
            if shelf.height >= padded_height && shelf.x_cursor + padded_width <= self.size {
                let region = make_region(shelf.x_cursor, shelf.y, width, height, self.size);
                shelf.x_cursor += padded_width;
                self.allocated_pixels += u64::from(width) * u64::from(height);
                return Ok(region);
            }
        }

        if self.current_y + padded_height > self.size || self.shelves.len() >= MAX_SHELVES {
            return Err(AtlasError::Full);
        }

        let shelf = Shelf {
            y: self.current_y,
            height: padded_height,
            x_cursor: padded_width,
        };
        self.current_y += padded_height;
        let region = make_region(0, shelf.y, width, height, self.size);
        self.shelves.push(shelf);
        self.allocated_pixels += u64::from(width) * u64::from(height);
        Ok(region)
    }

    /// Copies bitmap rows into the region. No-op for an empty bitmap.
    pub fn upload(&mut self, region: &AtlasRegion, bitmap: &[u8]) {
        if bitmap.is_empty() || region.width == 0 || region.height == 0 {
            return;
        }
        let w = region.width as usize;
        for row in 0..region.height as usize {
            let dst = (region.y as usize + row) * self.size as usize + region.x as usize;
            self.pixels[dst..dst + w].copy_from_slice(&bitmap[row * w..row * w + w]);
        }
        self.dirty = true;
    }

    /// Fullness heuristic: >90% of pixels allocated, or the vertical
    /// cursor within 32px of running out. Fires before hard allocation
    /// failures so callers can regrow between frames.
    pub fn is_full(&self) -> bool {
        let total = u64::from(self.size) * u64::from(self.size);
        let usage = self.allocated_pixels as f32 / total as f32;
        usage > FULL_USAGE_RATIO || self.current_y + FULL_VERTICAL_MARGIN >= self.size
    }

    /// Doubles the side length, capped at [`MAX_ATLAS_SIZE`]. All
    /// previously allocated regions become invalid on success; on
    /// `CapReached` the atlas is left untouched.
    pub fn grow(&mut self) -> Result<(), AtlasError> {
        let new_size = self.size * 2;
        if new_size > MAX_ATLAS_SIZE {
            warn!(size = self.size, "atlas growth refused at cap");
            return Err(AtlasError::CapReached);
        }

        info!(from = self.size, to = new_size, "growing atlas");
        self.size = new_size;
        self.pixels = vec![0; (new_size * new_size) as usize];
        self.reset_packing();
        Ok(())
    }

    /// Zero-fills and resets packing state without resizing.
    pub fn clear(&mut self) {
        debug!(size = self.size, "clearing atlas");
        self.pixels.fill(0);
        self.reset_packing();
    }

    fn reset_packing(&mut self) {
        self.shelves.clear();
        self.current_y = 0;
        self.allocated_pixels = 0;
        self.generation += 1;
        self.dirty = true;
    }
}

fn make_region(x: u32, y: u32, width: u32, height: u32, size: u32) -> AtlasRegion {
    let inv = 1.0 / size as f32;
    AtlasRegion {
        x,
        y,
        width,
        height,
        u0: x as f32 * inv,
        v0: y as f32 * inv,
        u1: (x + width) as f32 * inv,
        v1: (y + height) as f32 * inv,
    }
}
