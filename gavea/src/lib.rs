//! gavea - GPU-batched monospace text rendering core.
//!
//! Pipeline, leaf first:
//! - **font** - per-style face loading, cell metrics, glyph rasterization
//! - **shaper** - UTF-8 runs to positioned glyph sequences (26.6 fixed point)
//! - **atlas** - shelf-packed single-channel texture with grow/clear
//! - **cache** - (glyph index, style) to atlas regions, one-shot recovery
//! - **renderer** - draw commands to capacity-bounded vertex batches
//! - **backend** - two-pipeline GPU leaf behind a flush trait
//!
//! A cache miss cascades: shaping (or direct rasterization) -> atlas
//! allocation -> upload -> textured quad. Everything is single-threaded
//! and synchronous; the caller owns the GPU surface and drives
//! begin_frame / submit / end_frame.

pub mod atlas;

pub mod backend;

pub mod cache;

pub mod config;

pub mod font;

pub mod renderer;

pub mod shaper;

// Re-exports for convenience

pub use atlas::{Atlas, AtlasError, AtlasRegion};

pub use backend::{BackendError, RenderBackend, WgpuBackend};

pub use cache::{CachedGlyph, GlyphCache};

pub use config::RendererConfig;

pub use font::{FontError, FontMetrics, FontStore, FontStyle, GlyphBitmap};

pub use renderer::{
    Cell, CellFlags, CursorShape, FrameStats, Rect, RenderCommand, Renderer, RendererError,
};

pub use shaper::{ShapeOptions, ShapedGlyph, Shaper};
