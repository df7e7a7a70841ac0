//! Command-to-vertex batching.
//!
//! Frame protocol: `begin_frame` -> `submit`* -> `end_frame`. Commands
//! expand into two capacity-bounded vertex batches as they arrive (the
//! order is the submission order), and every flush hands rectangles to
//! the backend before text so glyphs always draw over backgrounds.
//! Hitting a batch cap flushes early and continues; it is never an
//! error.

pub mod command;
pub mod vertex;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, RenderBackend};
use crate::cache::GlyphCache;
use crate::config::RendererConfig;
use crate::font::{FontError, FontMetrics, FontStore, FontStyle};
use crate::shaper::{ShapeOptions, Shaper};

pub use command::{Cell, CellFlags, CursorShape, Rect, RenderCommand};
pub use vertex::{pack_color, unpack_color, RectVertex, TextVertex};

/// Per-frame batch caps. Exceeding one flushes early and continues.
pub const MAX_TEXT_VERTICES: usize = 65536;
pub const MAX_RECT_VERTICES: usize = 16384;

const VERTICES_PER_QUAD: usize = 6;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("font initialization failed: {0}")]
    Font(#[from] FontError),
    #[error("gpu backend failed: {0}")]
    Backend(#[from] BackendError),
}

/// Counters for the current frame, reset by `begin_frame`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub commands: u32,
    pub rect_quads: u32,
    pub text_quads: u32,
    pub flushes: u32,
    pub glyphs_unavailable: u32,
}

/// One renderer session: owns the font store, shaper, glyph cache (and
/// through it the atlas) and the GPU backend.
pub struct Renderer<B: RenderBackend> {
    config: RendererConfig,
    fonts: FontStore,
    shaper: Shaper,
    cache: GlyphCache,
    backend: B,
    metrics: FontMetrics,
    text_vertices: Vec<TextVertex>,
    rect_vertices: Vec<RectVertex>,
    viewport: (u32, u32),
    stats: FrameStats,
}

impl<B: RenderBackend> Renderer<B> {
    /// Brings a session up: loads the configured font (falling back to
    /// the platform defaults), binds the shaper for every style and
    /// creates the glyph cache. Failing to load any font at all is
    /// fatal.
    pub fn new(config: RendererConfig, backend: B) -> Result<Self, RendererError> {
        let mut fonts = FontStore::new();
        let size_pt = config.font_size_pt;
        let dpi = config.dpi;

        match &config.font_path {
            Some(path) => {
                if let Err(e) = fonts.load(path, FontStyle::Regular, size_pt, dpi) {
                    warn!(error = %e, "configured font rejected, trying defaults");
                    fonts.load_default(size_pt, dpi)?;
                }
            }
            None => fonts.load_default(size_pt, dpi)?,
        }

        let variants = [
            (&config.font_path_bold, FontStyle::Bold),
            (&config.font_path_italic, FontStyle::Italic),
            (&config.font_path_bold_italic, FontStyle::BoldItalic),
        ];
        for (path, style) in variants {
            if let Some(path) = path {
                if let Err(e) = fonts.load(path, style, size_pt, dpi) {
                    warn!(error = %e, ?style, "optional style face skipped");
                }
            }
        }

        let metrics = fonts.metrics().ok_or(FontError::NoDefaultFont)?;

        let mut shaper = Shaper::new();
        for style in FontStyle::ALL {
            shaper.rebuild(style, &fonts);
        }

        let cache = GlyphCache::new(config.atlas_size);
        info!(
            cell_width = metrics.cell_width,
            cell_height = metrics.cell_height,
            "renderer session ready"
        );

        Ok(Self {
            config,
            fonts,
            shaper,
            cache,
            backend,
            metrics,
            text_vertices: Vec::with_capacity(MAX_TEXT_VERTICES),
            rect_vertices: Vec::with_capacity(MAX_RECT_VERTICES),
            viewport: (0, 0),
            stats: FrameStats::default(),
        })
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    /// Size passed to the last `begin_frame`.
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn fonts(&self) -> &FontStore {
        &self.fonts
    }

    pub fn cache(&self) -> &GlyphCache {
        &self.cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Loads a new face for one style at the current size, then runs
    /// the reload cascade: shaper rebind first, cache clear second.
    pub fn load_font(
        &mut self,
        path: impl AsRef<std::path::Path>,
        style: FontStyle,
    ) -> Result<(), FontError> {
        self.fonts
            .load(path, style, self.fonts.size_pt(), self.fonts.dpi())?;
        if let Some(metrics) = self.fonts.metrics() {
            self.metrics = metrics;
        }
        self.shaper.rebuild(style, &self.fonts);
        self.cache.clear();
        Ok(())
    }

    /// Applies a new point size to every loaded face. All shaper
    /// bindings are rebuilt and the glyph cache is emptied before this
    /// returns; stale regions can never survive a resize.
    pub fn set_font_size(&mut self, size_pt: f32) -> Result<(), FontError> {
        self.fonts.set_size(size_pt, self.fonts.dpi())?;
        if let Some(metrics) = self.fonts.metrics() {
            self.metrics = metrics;
        }
        for style in FontStyle::ALL {
            self.shaper.rebuild(style, &self.fonts);
        }
        self.cache.clear();
        debug!(size_pt, "font size applied");
        Ok(())
    }

    pub fn begin_frame(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.text_vertices.clear();
        self.rect_vertices.clear();
        self.stats = FrameStats::default();
        self.backend.begin_frame(width, height);
    }

    pub fn submit(&mut self, command: RenderCommand<'_>) {
        self.stats.commands += 1;
        match command {
            RenderCommand::Clear { region, color } => {
                self.add_rect_quad(region, unpack_color(color));
            }
            RenderCommand::Rect {
                region,
                color,
                border_width,
            } => self.process_rect(region, color, border_width),
            RenderCommand::TextGrid {
                x,
                y,
                cells,
                columns,
                rows,
            } => self.process_grid(x, y, cells, columns, rows),
            RenderCommand::TextLine {
                x,
                y,
                text,
                fg,
                flags,
            } => self.process_line(x, y, text, fg, flags),
            RenderCommand::Cursor {
                column,
                row,
                color,
                shape,
                visible,
            } => self.process_cursor(column, row, color, shape, visible),
        }
    }

    /// Flushes whatever the submitted commands produced, rectangles
    /// before text, and closes the backend frame.
    pub fn end_frame(&mut self) {
        self.flush_batches();
        self.backend.end_frame();
    }

    fn process_rect(&mut self, region: Rect, color: u32, border_width: i32) {
        let rgba = unpack_color(color);
        if border_width <= 0 {
            self.add_rect_quad(region, rgba);
            return;
        }
        let bw = border_width;
        let Rect {
            x,
            y,
            width: w,
            height: h,
        } = region;
        self.add_rect_quad(Rect::new(x, y, w, bw), rgba);
        self.add_rect_quad(Rect::new(x, y + h - bw, w, bw), rgba);
        self.add_rect_quad(Rect::new(x, y + bw, bw, h - 2 * bw), rgba);
        self.add_rect_quad(Rect::new(x + w - bw, y + bw, bw, h - 2 * bw), rgba);
    }

    fn process_grid(&mut self, origin_x: i32, origin_y: i32, cells: &[Cell], columns: usize, rows: usize) {
        if columns == 0 || rows == 0 {
            return;
        }
        if cells.len() < columns * rows {
            warn!(
                cells = cells.len(),
                columns, rows, "grid payload smaller than its dimensions"
            );
            return;
        }

        let cell_w = self.metrics.cell_width;
        let cell_h = self.metrics.cell_height;
        let ascender = self.metrics.ascender;

        for row in 0..rows {
            for column in 0..columns {
                let cell = cells[row * columns + column];
                let x = origin_x + column as i32 * cell_w;
                let y = origin_y + row as i32 * cell_h;

                if (cell.bg & 0xFF) > 0 {
                    self.add_rect_quad(Rect::new(x, y, cell_w, cell_h), unpack_color(cell.bg));
                }

                if cell.codepoint != ' ' && cell.codepoint != '\0' {
                    let style = FontStyle::from_flags(
                        cell.flags.contains(CellFlags::BOLD),
                        cell.flags.contains(CellFlags::ITALIC),
                    );
                    match self.cache.get_by_codepoint(cell.codepoint, style, &self.fonts) {
                        Some(glyph) if glyph.valid && glyph.region.width > 0 => {
                            let gx = (x + glyph.bearing_x) as f32;
                            let gy = (y + ascender - glyph.bearing_y) as f32;
                            self.add_text_quad(gx, gy, &glyph, unpack_color(cell.fg));
                        }
                        Some(_) => {}
                        None => self.stats.glyphs_unavailable += 1,
                    }
                }

                // Decorations draw whether or not the glyph did.
                if cell.flags.contains(CellFlags::UNDERLINE) {
                    self.add_rect_quad(
                        Rect::new(
                            x,
                            y + self.metrics.underline_position,
                            cell_w,
                            self.metrics.underline_thickness,
                        ),
                        unpack_color(cell.fg),
                    );
                }
                if cell.flags.contains(CellFlags::STRIKETHROUGH) {
                    self.add_rect_quad(
                        Rect::new(
                            x,
                            y + self.metrics.strikethrough_position,
                            cell_w,
                            self.metrics.underline_thickness,
                        ),
                        unpack_color(cell.fg),
                    );
                }
            }
        }
    }

    fn process_line(&mut self, x: i32, y: i32, text: &str, fg: u32, flags: CellFlags) {
        if text.is_empty() {
            return;
        }
        let style = FontStyle::from_flags(
            flags.contains(CellFlags::BOLD),
            flags.contains(CellFlags::ITALIC),
        );
        let options = ShapeOptions {
            ligatures: self.config.ligatures,
            kerning: self.config.kerning,
            ..Default::default()
        };
        let shaped = self.shaper.shape(text, style, &options);
        let rgba = unpack_color(fg);

        // The pen stays in 26.6 until each quad is emitted; truncating
        // per glyph would drift long runs by whole pixels.
        let mut pen_x = i64::from(x) << 6;
        let mut pen_y = i64::from(y) << 6;
        let nominal_advance = i64::from(self.metrics.cell_width) << 6;

        for sg in &shaped {
            match self.cache.get(sg.glyph_index, style, &self.fonts) {
                Some(glyph) => {
                    if glyph.valid && glyph.region.width > 0 {
                        let gx = (pen_x + i64::from(sg.x_offset)) as f32 / 64.0
                            + glyph.bearing_x as f32;
                        let gy = pen_y as f32 / 64.0 - sg.y_offset as f32 / 64.0
                            - glyph.bearing_y as f32;
                        self.add_text_quad(gx, gy, &glyph, rgba);
                    }
                    pen_x += i64::from(sg.x_advance);
                    pen_y += i64::from(sg.y_advance);
                }
                None => {
                    // Keep the layout moving past an unavailable glyph.
                    self.stats.glyphs_unavailable += 1;
                    pen_x += nominal_advance;
                }
            }
        }
    }

    fn process_cursor(
        &mut self,
        column: i32,
        row: i32,
        color: u32,
        shape: CursorShape,
        visible: bool,
    ) {
        if !visible {
            return;
        }
        let cell_w = self.metrics.cell_width;
        let cell_h = self.metrics.cell_height;
        let x = column * cell_w;
        let y = row * cell_h;
        let rgba = unpack_color(color);

        match shape {
            CursorShape::Block => self.add_rect_quad(Rect::new(x, y, cell_w, cell_h), rgba),
            CursorShape::Underline => {
                self.add_rect_quad(Rect::new(x, y + cell_h - 2, cell_w, 2), rgba)
            }
            CursorShape::Bar => self.add_rect_quad(Rect::new(x, y, 2, cell_h), rgba),
        }
    }

    fn add_rect_quad(&mut self, rect: Rect, color: [f32; 4]) {
        if self.rect_vertices.len() + VERTICES_PER_QUAD > MAX_RECT_VERTICES {
            self.flush_batches();
        }
        let x0 = rect.x as f32;
        let y0 = rect.y as f32;
        let x1 = x0 + rect.width as f32;
        let y1 = y0 + rect.height as f32;

        let v = |position: [f32; 2]| RectVertex { position, color };
        self.rect_vertices.extend_from_slice(&[
            v([x0, y0]),
            v([x1, y0]),
            v([x1, y1]),
            v([x0, y0]),
            v([x1, y1]),
            v([x0, y1]),
        ]);
        self.stats.rect_quads += 1;
    }

    fn add_text_quad(&mut self, x: f32, y: f32, glyph: &crate::cache::CachedGlyph, color: [f32; 4]) {
        if self.text_vertices.len() + VERTICES_PER_QUAD > MAX_TEXT_VERTICES {
            self.flush_batches();
        }
        let r = &glyph.region;
        let x1 = x + r.width as f32;
        let y1 = y + r.height as f32;

        let v = |position: [f32; 2], uv: [f32; 2]| TextVertex {
            position,
            uv,
            color,
        };
        self.text_vertices.extend_from_slice(&[
            v([x, y], [r.u0, r.v0]),
            v([x1, y], [r.u1, r.v0]),
            v([x1, y1], [r.u1, r.v1]),
            v([x, y], [r.u0, r.v0]),
            v([x1, y1], [r.u1, r.v1]),
            v([x, y1], [r.u0, r.v1]),
        ]);
        self.stats.text_quads += 1;
    }

    /// Rectangles first, then text; the atlas is synced to the GPU
    /// before any text draw samples it.
    fn flush_batches(&mut self) {
        if self.cache.take_atlas_dirty() {
            self.backend
                .upload_atlas(self.cache.atlas().size(), self.cache.atlas().pixels());
        }
        if !self.rect_vertices.is_empty() {
            self.backend.draw_rects(&self.rect_vertices);
            self.rect_vertices.clear();
        }
        if !self.text_vertices.is_empty() {
            self.backend.draw_text(&self.text_vertices);
            self.text_vertices.clear();
        }
        self.stats.flushes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::find_system_font;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Begin(u32, u32),
        UploadAtlas(u32),
        Rects(usize),
        Text(usize),
        End,
    }

    /// Captures flush traffic so batching is testable without a GPU.
    #[derive(Default)]
    struct RecordingBackend {
        events: Vec<Event>,
        rect_vertices: Vec<RectVertex>,
        text_vertices: Vec<TextVertex>,
    }

    impl RenderBackend for RecordingBackend {
        fn begin_frame(&mut self, width: u32, height: u32) {
            self.events.push(Event::Begin(width, height));
        }
        fn upload_atlas(&mut self, size: u32, _pixels: &[u8]) {
            self.events.push(Event::UploadAtlas(size));
        }
        fn draw_rects(&mut self, vertices: &[RectVertex]) {
            self.events.push(Event::Rects(vertices.len()));
            self.rect_vertices.extend_from_slice(vertices);
        }
        fn draw_text(&mut self, vertices: &[TextVertex]) {
            self.events.push(Event::Text(vertices.len()));
            self.text_vertices.extend_from_slice(vertices);
        }
        fn end_frame(&mut self) {
            self.events.push(Event::End);
        }
    }

    fn test_renderer() -> Option<Renderer<RecordingBackend>> {
        find_system_font()?;
        Renderer::new(RendererConfig::default(), RecordingBackend::default()).ok()
    }

    fn cell(codepoint: char, flags: CellFlags) -> Cell {
        Cell {
            codepoint,
            fg: pack_color(255, 255, 255, 255),
            bg: pack_color(0, 0, 0, 0),
            flags,
        }
    }

    #[test]
    fn test_session_comes_up_with_positive_metrics() {
        let Some(renderer) = test_renderer() else {
            return;
        };
        let metrics = renderer.metrics();
        assert!(metrics.cell_width > 0);
        assert!(metrics.cell_height > 0);
    }

    #[test]
    fn test_clear_emits_one_quad() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::Clear {
            region: Rect::new(0, 0, 800, 600),
            color: pack_color(10, 20, 30, 255),
        });
        renderer.end_frame();

        let backend = renderer.backend();
        assert_eq!(backend.rect_vertices.len(), 6);
        assert!(backend.text_vertices.is_empty());
        assert_eq!(renderer.frame_stats().rect_quads, 1);
    }

    #[test]
    fn test_bordered_rect_emits_four_quads() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::Rect {
            region: Rect::new(10, 10, 100, 50),
            color: pack_color(255, 0, 0, 255),
            border_width: 2,
        });
        renderer.end_frame();
        assert_eq!(renderer.frame_stats().rect_quads, 4);
    }

    #[test]
    fn test_rects_flush_before_text() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        let cells = [Cell {
            codepoint: 'A',
            fg: pack_color(255, 255, 255, 255),
            bg: pack_color(20, 20, 20, 255),
            flags: CellFlags::empty(),
        }];

        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::TextGrid {
            x: 0,
            y: 0,
            cells: &cells,
            columns: 1,
            rows: 1,
        });
        renderer.end_frame();

        let events = &renderer.backend().events;
        let rects_at = events.iter().position(|e| matches!(e, Event::Rects(_)));
        let text_at = events.iter().position(|e| matches!(e, Event::Text(_)));
        let upload_at = events.iter().position(|e| matches!(e, Event::UploadAtlas(_)));
        assert!(rects_at.unwrap() < text_at.unwrap());
        assert!(upload_at.unwrap() < text_at.unwrap());
        assert_eq!(events.last(), Some(&Event::End));
    }

    #[test]
    fn test_space_and_nul_draw_no_glyph() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        let cells = [
            cell(' ', CellFlags::empty()),
            cell('\0', CellFlags::empty()),
        ];
        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::TextGrid {
            x: 0,
            y: 0,
            cells: &cells,
            columns: 2,
            rows: 1,
        });
        renderer.end_frame();
        assert_eq!(renderer.frame_stats().text_quads, 0);
    }

    #[test]
    fn test_decorations_draw_without_glyph() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        // Unmapped plane-16 codepoint: the glyph fails, the decorations
        // and background must not.
        let cells = [Cell {
            codepoint: '\u{10FFF0}',
            fg: pack_color(255, 255, 255, 255),
            bg: pack_color(30, 30, 30, 255),
            flags: CellFlags::UNDERLINE | CellFlags::STRIKETHROUGH,
        }];

        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::TextGrid {
            x: 0,
            y: 0,
            cells: &cells,
            columns: 1,
            rows: 1,
        });
        renderer.end_frame();

        let stats = renderer.frame_stats();
        assert_eq!(stats.text_quads, 0);
        assert_eq!(stats.rect_quads, 3); // bg + underline + strikethrough
        assert_eq!(stats.glyphs_unavailable, 1);
    }

    #[test]
    fn test_grid_payload_mismatch_is_skipped() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        let cells = [cell('A', CellFlags::empty())];
        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::TextGrid {
            x: 0,
            y: 0,
            cells: &cells,
            columns: 4,
            rows: 4,
        });
        renderer.end_frame();
        assert_eq!(renderer.frame_stats().rect_quads, 0);
        assert_eq!(renderer.frame_stats().text_quads, 0);
    }

    #[test]
    fn test_text_line_pen_advance_is_uniform() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::TextLine {
            x: 0,
            y: 100,
            text: "MMM",
            fg: pack_color(255, 255, 255, 255),
            flags: CellFlags::empty(),
        });
        renderer.end_frame();

        let verts = &renderer.backend().text_vertices;
        assert_eq!(verts.len(), 18);

        let x0 = verts[0].position[0];
        let x1 = verts[6].position[0];
        let x2 = verts[12].position[0];
        let first = x1 - x0;
        let second = x2 - x1;
        assert!(first > 0.0);
        assert!((first - second).abs() < 1e-3);
        // Monospace advance lands within half a pixel of the cell width.
        assert!((first - renderer.metrics().cell_width as f32).abs() <= 0.5 + 1e-3);
    }

    #[test]
    fn test_cursor_shapes() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::Cursor {
            column: 2,
            row: 1,
            color: pack_color(200, 200, 200, 255),
            shape: CursorShape::Block,
            visible: true,
        });
        renderer.submit(RenderCommand::Cursor {
            column: 0,
            row: 0,
            color: pack_color(200, 200, 200, 255),
            shape: CursorShape::Bar,
            visible: false,
        });
        renderer.end_frame();
        assert_eq!(renderer.frame_stats().rect_quads, 1);

        let v = &renderer.backend().rect_vertices;
        let metrics = renderer.metrics();
        assert_eq!(v[0].position[0], (2 * metrics.cell_width) as f32);
        assert_eq!(v[0].position[1], metrics.cell_height as f32);
    }

    #[test]
    fn test_capacity_overflow_flushes_early() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        let quads = MAX_RECT_VERTICES / VERTICES_PER_QUAD + 10;

        renderer.begin_frame(800, 600);
        for _ in 0..quads {
            renderer.submit(RenderCommand::Clear {
                region: Rect::new(0, 0, 1, 1),
                color: pack_color(0, 0, 0, 255),
            });
        }
        renderer.end_frame();

        let rect_events: Vec<usize> = renderer
            .backend()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Rects(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(rect_events.len(), 2);
        assert_eq!(
            rect_events.iter().sum::<usize>(),
            quads * VERTICES_PER_QUAD
        );
        assert!(rect_events[0] <= MAX_RECT_VERTICES);
        assert_eq!(renderer.frame_stats().flushes, 2);
    }

    #[test]
    fn test_atlas_uploads_only_when_dirty() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        let cells = [cell('Q', CellFlags::empty())];

        for _ in 0..2 {
            renderer.begin_frame(800, 600);
            renderer.submit(RenderCommand::TextGrid {
                x: 0,
                y: 0,
                cells: &cells,
                columns: 1,
                rows: 1,
            });
            renderer.end_frame();
        }

        let uploads = renderer
            .backend()
            .events
            .iter()
            .filter(|e| matches!(e, Event::UploadAtlas(_)))
            .count();
        assert_eq!(uploads, 1);
    }

    #[test]
    fn test_set_font_size_empties_cache() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        let cells = [cell('W', CellFlags::empty())];
        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::TextGrid {
            x: 0,
            y: 0,
            cells: &cells,
            columns: 1,
            rows: 1,
        });
        renderer.end_frame();
        assert!(!renderer.cache().is_empty());

        let old = renderer.metrics();
        renderer.set_font_size(10.0).unwrap();
        assert!(renderer.cache().is_empty());
        assert!(renderer.metrics().cell_height < old.cell_height);
    }

    #[test]
    fn test_load_font_rebinds_style_and_clears_cache() {
        let Some(mut renderer) = test_renderer() else {
            return;
        };
        let path = find_system_font().unwrap();
        let cells = [cell('x', CellFlags::empty())];
        renderer.begin_frame(800, 600);
        renderer.submit(RenderCommand::TextGrid {
            x: 0,
            y: 0,
            cells: &cells,
            columns: 1,
            rows: 1,
        });
        renderer.end_frame();
        assert!(!renderer.cache().is_empty());

        renderer.load_font(path, FontStyle::Bold).unwrap();
        assert!(renderer.fonts().has_style(FontStyle::Bold));
        assert!(renderer.cache().is_empty());
    }
}
