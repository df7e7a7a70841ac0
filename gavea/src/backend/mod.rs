//! GPU flush seam.
//!
//! The renderer batches into vertex slices and hands them across
//! [`RenderBackend`]; everything above this trait runs without a GPU.
//! [`WgpuBackend`] is the shipped implementation.

use thiserror::Error;

use crate::renderer::{RectVertex, TextVertex};

pub mod wgpu;

pub use self::wgpu::WgpuBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Pipeline or shader creation failed. Fatal: there is no software
    /// fallback.
    #[error("gpu pipeline initialization failed: {0}")]
    GpuInit(String),
}

/// Flush target for one frame of batched vertices.
///
/// Call order per frame: `begin_frame`, then any number of
/// `upload_atlas` / `draw_rects` / `draw_text` (rect slices always
/// arrive before the text slice of the same flush), then `end_frame`.
/// Vertex slices are only valid for the duration of the call.
pub trait RenderBackend {
    fn begin_frame(&mut self, width: u32, height: u32);

    /// Full single-channel atlas reupload. `pixels` is `size * size`
    /// bytes of coverage.
    fn upload_atlas(&mut self, size: u32, pixels: &[u8]);

    fn draw_rects(&mut self, vertices: &[RectVertex]);

    fn draw_text(&mut self, vertices: &[TextVertex]);

    fn end_frame(&mut self);
}
