//! Font loading, cell metrics and single-glyph rasterization.
//!
//! One face slot per style (regular/bold/italic/bold-italic). Styles
//! without a dedicated face resolve through a fallback chain, and the
//! missing attributes are synthesized only when the chain lands on the
//! regular face.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

/// Well-known monospace fonts, tried in order by [`FontStore::load_default`].
pub const DEFAULT_FONT_PATHS: &[&str] = &[
    // macOS
    "/System/Library/Fonts/Monaco.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "/Library/Fonts/SF-Mono-Regular.otf",
    "/System/Library/Fonts/SFNSMono.ttf",
    // Linux
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeMono.ttf",
    "/usr/share/fonts/truetype/ubuntu/UbuntuMono-R.ttf",
    "/usr/share/fonts/truetype/noto/NotoMono-Regular.ttf",
];

/// Slant applied by the synthetic oblique transform (x += y * slant).
const OBLIQUE_SLANT: f32 = 0.2;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font file {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("invalid font size {size_pt}pt")]
    InvalidSize { size_pt: f32 },
    #[error("no default monospace font found")]
    NoDefaultFont,
}

/// Font style slots. The discriminant doubles as the cache key bitmask:
/// bit 0 = bold, bit 1 = italic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FontStyle {
    Regular = 0,
    Bold = 1,
    Italic = 2,
    BoldItalic = 3,
}

impl FontStyle {
    pub const COUNT: usize = 4;
    pub const ALL: [FontStyle; 4] = [
        FontStyle::Regular,
        FontStyle::Bold,
        FontStyle::Italic,
        FontStyle::BoldItalic,
    ];

    pub fn bits(self) -> u8 {
        self as u8
    }

    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontStyle::Regular,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (true, true) => FontStyle::BoldItalic,
        }
    }

    pub fn is_bold(self) -> bool {
        self.bits() & 1 != 0
    }

    pub fn is_italic(self) -> bool {
        self.bits() & 2 != 0
    }

    pub(crate) fn index(self) -> usize {
        self.bits() as usize
    }
}

/// Integer-pixel cell metrics derived from the regular face (or the
/// first loaded face). Only available once a face has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub cell_width: i32,
    pub cell_height: i32,
    pub ascender: i32,
    pub descender: i32,
    pub underline_position: i32,
    pub underline_thickness: i32,
    pub strikethrough_position: i32,
}

/// A rasterized glyph: owned grayscale coverage plus placement metrics.
/// `bearing_y` is the distance from the baseline up to the bitmap top.
#[derive(Debug, Clone, Default)]
pub struct GlyphBitmap {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub advance_x: i32,
    pub glyph_index: u16,
}

struct LoadedFace {
    /// Raw file bytes, shared with the shaper bindings.
    data: Arc<Vec<u8>>,
    font: fontdue::Font,
    units_per_em: f32,
    /// Underline (position, thickness) in font units, from the post table.
    underline: Option<(i16, i16)>,
    /// Advance of 'M' in font units, when the charmap has one.
    reference_advance: Option<u16>,
    /// Widest horizontal advance in the face, in font units.
    max_advance: u16,
}

pub struct FontStore {
    faces: [Option<LoadedFace>; FontStyle::COUNT],
    size_pt: f32,
    dpi: u32,
    metrics: Option<FontMetrics>,
}

impl Default for FontStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FontStore {
    pub fn new() -> Self {
        Self {
            faces: [None, None, None, None],
            size_pt: 12.0,
            dpi: 96,
            metrics: None,
        }
    }

    /// Loads a face for `style`, replacing any existing one. Parse or
    /// size failure fails the whole call; success recomputes metrics.
    pub fn load(
        &mut self,
        path: impl AsRef<Path>,
        style: FontStyle,
        size_pt: f32,
        dpi: u32,
    ) -> Result<(), FontError> {
        if size_pt <= 0.0 {
            return Err(FontError::InvalidSize { size_pt });
        }
        let path = path.as_ref();
        let path_display = path.display().to_string();

        // The slot is vacated up front: a failed reload must not leave
        // the previous face visible to the fallback chain.
        self.faces[style.index()] = None;

        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path_display.clone(),
            source,
        })?;

        let (units_per_em, underline, reference_advance, max_advance) = {
            let face = ttf_parser::Face::parse(&data, 0).map_err(|e| FontError::Parse {
                path: path_display.clone(),
                reason: e.to_string(),
            })?;
            let upem = face.units_per_em() as f32;
            let underline = face
                .underline_metrics()
                .map(|m| (m.position, m.thickness));
            let reference_advance = face
                .glyph_index('M')
                .and_then(|id| face.glyph_hor_advance(id));
            let max_advance = (0..face.number_of_glyphs())
                .filter_map(|id| face.glyph_hor_advance(ttf_parser::GlyphId(id)))
                .max()
                .unwrap_or(0);
            (upem, underline, reference_advance, max_advance)
        };

        let font = fontdue::Font::from_bytes(&data[..], fontdue::FontSettings::default())
            .map_err(|reason| FontError::Parse {
                path: path_display.clone(),
                reason: reason.to_string(),
            })?;

        self.faces[style.index()] = Some(LoadedFace {
            data: Arc::new(data),
            font,
            units_per_em,
            underline,
            reference_advance,
            max_advance,
        });
        self.size_pt = size_pt;
        self.dpi = if dpi == 0 { 96 } else { dpi };
        self.compute_metrics();

        info!(path = %path_display, ?style, size_pt, dpi, "loaded font face");
        Ok(())
    }

    /// Tries the well-known monospace paths in order; first success wins.
    pub fn load_default(&mut self, size_pt: f32, dpi: u32) -> Result<(), FontError> {
        for path in DEFAULT_FONT_PATHS {
            match self.load(path, FontStyle::Regular, size_pt, dpi) {
                Ok(()) => return Ok(()),
                Err(e) => debug!(path, error = %e, "default font candidate rejected"),
            }
        }
        warn!("no default monospace font found");
        Err(FontError::NoDefaultFont)
    }

    /// Re-applies a size to every loaded face and recomputes metrics
    /// from whichever face is available.
    pub fn set_size(&mut self, size_pt: f32, dpi: u32) -> Result<(), FontError> {
        if size_pt <= 0.0 {
            return Err(FontError::InvalidSize { size_pt });
        }
        self.size_pt = size_pt;
        if dpi > 0 {
            self.dpi = dpi;
        }
        self.compute_metrics();
        Ok(())
    }

    pub fn size_pt(&self) -> f32 {
        self.size_pt
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Current pixel size (points at the configured dpi).
    pub fn px_size(&self) -> f32 {
        self.size_pt * self.dpi as f32 / 72.0
    }

    /// `None` until at least one face has loaded.
    pub fn metrics(&self) -> Option<FontMetrics> {
        self.metrics
    }

    /// Whether a dedicated face is loaded for `style` (no fallback).
    pub fn has_style(&self, style: FontStyle) -> bool {
        self.faces[style.index()].is_some()
    }

    /// Raw file bytes of the face that `style` resolves to.
    pub(crate) fn face_data(&self, style: FontStyle) -> Option<Arc<Vec<u8>>> {
        self.resolve(style).map(|(_, f)| f.data.clone())
    }

    /// Glyph index for `codepoint` in the face that `style` resolves
    /// to; 0 when unmapped.
    pub fn glyph_index(&self, codepoint: char, style: FontStyle) -> u16 {
        match self.resolve(style) {
            Some((_, face)) => face.font.lookup_glyph_index(codepoint),
            None => 0,
        }
    }

    /// Rasterizes one glyph into a grayscale bitmap. The style resolves
    /// through the fallback chain; bold/oblique are synthesized only
    /// when the chain falls all the way to the regular face.
    pub fn rasterize(&self, glyph_index: u16, style: FontStyle) -> Option<GlyphBitmap> {
        let (resolved, face) = self.resolve(style)?;
        let px = self.px_size();

        let (metrics, data) = face.font.rasterize_indexed(glyph_index, px);
        let mut out = GlyphBitmap {
            data,
            width: metrics.width as u32,
            height: metrics.height as u32,
            bearing_x: metrics.xmin,
            bearing_y: metrics.ymin + metrics.height as i32,
            advance_x: metrics.advance_width.round() as i32,
            glyph_index,
        };

        // A partial match (real bold serving bold-italic) gets no
        // synthetic transform on top.
        if resolved == FontStyle::Regular && style != FontStyle::Regular {
            if style.is_bold() {
                embolden(&mut out);
            }
            if style.is_italic() {
                oblique(&mut out);
            }
        }

        Some(out)
    }

    /// bold-italic -> bold -> italic -> regular.
    fn resolve(&self, style: FontStyle) -> Option<(FontStyle, &LoadedFace)> {
        if let Some(face) = &self.faces[style.index()] {
            return Some((style, face));
        }
        if style == FontStyle::BoldItalic {
            if let Some(face) = &self.faces[FontStyle::Bold.index()] {
                return Some((FontStyle::Bold, face));
            }
            if let Some(face) = &self.faces[FontStyle::Italic.index()] {
                return Some((FontStyle::Italic, face));
            }
        }
        self.faces[FontStyle::Regular.index()]
            .as_ref()
            .map(|face| (FontStyle::Regular, face))
    }

    fn compute_metrics(&mut self) {
        let face = match self.faces[FontStyle::Regular.index()]
            .as_ref()
            .or_else(|| self.faces.iter().flatten().next())
        {
            Some(face) => face,
            None => {
                self.metrics = None;
                return;
            }
        };

        let px = self.px_size();
        let line = match face.font.horizontal_line_metrics(px) {
            Some(line) => line,
            None => {
                warn!("face has no horizontal line metrics");
                self.metrics = None;
                return;
            }
        };

        let ascender = line.ascent.round() as i32;
        let descender = (-line.descent).round() as i32;
        let cell_height = line.new_line_size.round().max(1.0) as i32;

        let scale = px / face.units_per_em;
        let advance_units = face.reference_advance.unwrap_or(face.max_advance);
        let cell_width = (advance_units as f32 * scale).round().max(1.0) as i32;

        let (underline_position, underline_thickness) = match face.underline {
            Some((position, thickness)) if position != 0 => (
                ascender - (position as f32 * scale).round() as i32,
                ((thickness as f32 * scale).round() as i32).max(1),
            ),
            _ => (ascender + 2, 1),
        };

        self.metrics = Some(FontMetrics {
            cell_width,
            cell_height,
            ascender,
            descender,
            underline_position,
            underline_thickness,
            strikethrough_position: ascender / 2,
        });
    }
}

/// Synthetic bold: 1px horizontal smear of the coverage.
fn embolden(glyph: &mut GlyphBitmap) {
    let w = glyph.width as usize;
    let h = glyph.height as usize;
    if w == 0 || h == 0 {
        return;
    }
    let new_w = w + 1;
    let mut out = vec![0u8; new_w * h];
    for y in 0..h {
        for x in 0..new_w {
            let cur = if x < w { glyph.data[y * w + x] } else { 0 };
            let prev = if x > 0 { glyph.data[y * w + x - 1] } else { 0 };
            out[y * new_w + x] = cur.max(prev);
        }
    }
    glyph.data = out;
    glyph.width = new_w as u32;
}

/// Synthetic oblique: shears rows right in proportion to their height
/// above the baseline (rows below the baseline shift left).
fn oblique(glyph: &mut GlyphBitmap) {
    let w = glyph.width as usize;
    let h = glyph.height as usize;
    if w == 0 || h == 0 {
        return;
    }

    let shift = |row: usize| -> i32 {
        let y_above_baseline = glyph.bearing_y - 1 - row as i32;
        (y_above_baseline as f32 * OBLIQUE_SLANT).round() as i32
    };
    let min_shift = (0..h).map(&shift).min().unwrap_or(0);
    let max_shift = (0..h).map(&shift).max().unwrap_or(0);

    let new_w = w + (max_shift - min_shift) as usize;
    let mut out = vec![0u8; new_w * h];
    for y in 0..h {
        let dx = (shift(y) - min_shift) as usize;
        out[y * new_w + dx..y * new_w + dx + w].copy_from_slice(&glyph.data[y * w..(y + 1) * w]);
    }

    glyph.data = out;
    glyph.width = new_w as u32;
    glyph.bearing_x += min_shift;
}

#[cfg(test)]
pub(crate) fn find_system_font() -> Option<&'static str> {
    DEFAULT_FONT_PATHS
        .iter()
        .copied()
        .find(|p| std::path::Path::new(p).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_bits_round_trip() {
        assert_eq!(FontStyle::from_flags(false, false), FontStyle::Regular);
        assert_eq!(FontStyle::from_flags(true, false), FontStyle::Bold);
        assert_eq!(FontStyle::from_flags(false, true), FontStyle::Italic);
        assert_eq!(FontStyle::from_flags(true, true), FontStyle::BoldItalic);
        assert_eq!(FontStyle::BoldItalic.bits(), 3);
        assert!(FontStyle::BoldItalic.is_bold());
        assert!(FontStyle::BoldItalic.is_italic());
        assert!(!FontStyle::Bold.is_italic());
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let mut store = FontStore::new();
        let err = store
            .load("/nonexistent/font.ttf", FontStyle::Regular, 14.0, 96)
            .unwrap_err();
        assert!(matches!(err, FontError::Io { .. }));
        assert!(store.metrics().is_none());
    }

    #[test]
    fn test_invalid_size_rejected() {
        let mut store = FontStore::new();
        assert!(matches!(
            store.load("/nonexistent/font.ttf", FontStyle::Regular, 0.0, 96),
            Err(FontError::InvalidSize { .. })
        ));
        assert!(matches!(
            store.set_size(-3.0, 96),
            Err(FontError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_default_font_metrics_are_positive() {
        // Scenario: default font at 14pt / 96dpi.
        if find_system_font().is_none() {
            return;
        }
        let mut store = FontStore::new();
        store.load_default(14.0, 96).unwrap();

        let metrics = store.metrics().expect("metrics valid after load");
        assert!(metrics.cell_width > 0);
        assert!(metrics.cell_height > 0);
        assert!(metrics.ascender > 0);
        assert!(metrics.underline_thickness >= 1);
        assert!(metrics.strikethrough_position > 0);
        assert!(store.has_style(FontStyle::Regular));
        assert!(!store.has_style(FontStyle::Bold));
    }

    #[test]
    fn test_metrics_recomputed_on_set_size() {
        if find_system_font().is_none() {
            return;
        }
        let mut store = FontStore::new();
        store.load_default(14.0, 96).unwrap();
        let before = store.metrics().unwrap();

        store.set_size(28.0, 96).unwrap();
        let after = store.metrics().unwrap();
        assert!(after.cell_height > before.cell_height);
        assert!(after.cell_width > before.cell_width);
    }

    #[test]
    fn test_style_fallback_reaches_regular() {
        if find_system_font().is_none() {
            return;
        }
        let mut store = FontStore::new();
        store.load_default(14.0, 96).unwrap();

        let idx = store.glyph_index('A', FontStyle::BoldItalic);
        assert_ne!(idx, 0);
        assert!(store.rasterize(idx, FontStyle::BoldItalic).is_some());
    }

    #[test]
    fn test_synthetic_bold_widens_bitmap() {
        if find_system_font().is_none() {
            return;
        }
        let mut store = FontStore::new();
        store.load_default(14.0, 96).unwrap();

        let idx = store.glyph_index('H', FontStyle::Regular);
        let regular = store.rasterize(idx, FontStyle::Regular).unwrap();
        let bold = store.rasterize(idx, FontStyle::Bold).unwrap();
        assert_eq!(bold.width, regular.width + 1);
        assert_eq!(bold.height, regular.height);
    }

    #[test]
    fn test_space_rasterizes_to_zero_area() {
        if find_system_font().is_none() {
            return;
        }
        let mut store = FontStore::new();
        store.load_default(14.0, 96).unwrap();

        let idx = store.glyph_index(' ', FontStyle::Regular);
        let glyph = store.rasterize(idx, FontStyle::Regular).unwrap();
        assert_eq!(glyph.width, 0);
        assert_eq!(glyph.height, 0);
        assert!(glyph.advance_x > 0);
    }

    #[test]
    fn test_embolden_smears_right() {
        let mut glyph = GlyphBitmap {
            data: vec![255, 0, 0, 255],
            width: 2,
            height: 2,
            bearing_y: 2,
            ..Default::default()
        };
        embolden(&mut glyph);
        assert_eq!(glyph.width, 3);
        assert_eq!(glyph.data, vec![255, 255, 0, 0, 255, 255]);
    }

    #[test]
    fn test_oblique_shears_rows() {
        // Tall thin column: the top rows must end up further right
        // than the bottom rows.
        let h = 10u32;
        let mut glyph = GlyphBitmap {
            data: vec![255; h as usize],
            width: 1,
            height: h,
            bearing_y: h as i32,
            ..Default::default()
        };
        oblique(&mut glyph);
        assert!(glyph.width > 1);

        let w = glyph.width as usize;
        let top = glyph.data[..w].iter().position(|&p| p > 0).unwrap();
        let bottom = glyph.data[(h as usize - 1) * w..].iter().position(|&p| p > 0).unwrap();
        assert!(top > bottom);
    }

    #[test]
    fn test_zero_area_inputs_pass_through_transforms() {
        let mut glyph = GlyphBitmap::default();
        embolden(&mut glyph);
        oblique(&mut glyph);
        assert_eq!(glyph.width, 0);
        assert_eq!(glyph.height, 0);
    }
}
