//! Text shaping: UTF-8 runs to positioned glyph sequences.
//!
//! One shaping-engine binding per style, rebuilt whenever that style's
//! font (or the size) changes. Output positions are 26.6 fixed point,
//! converted from the engine's font-unit space at shape time.

use std::sync::Arc;

use rustybuzz::ttf_parser::Tag;
use rustybuzz::{Direction, Face, Feature, UnicodeBuffer};
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::font::{FontStore, FontStyle};

/// One shaped glyph. All positional fields are 26.6 fixed point
/// (divide by 64 for pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapedGlyph {
    pub glyph_index: u32,
    /// Byte index of the source cluster in the shaped run.
    pub cluster: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub x_advance: i32,
    pub y_advance: i32,
}

/// Feature toggles and hints for one shaping call.
#[derive(Debug, Clone, Copy)]
pub struct ShapeOptions<'a> {
    pub ligatures: bool,
    pub kerning: bool,
    /// BCP 47 language tag, e.g. "en".
    pub language: Option<&'a str>,
    /// ISO 15924 script tag, e.g. "latn". Defaults to common behavior.
    pub script: Option<&'a str>,
}

impl Default for ShapeOptions<'_> {
    fn default() -> Self {
        Self {
            ligatures: true,
            kerning: true,
            language: None,
            script: None,
        }
    }
}

struct Binding {
    // Field order matters: `face` borrows from `data` and must drop first.
    face: Face<'static>,
    data: Arc<Vec<u8>>,
    /// Pixels per font unit at the size the binding was built for.
    scale: f32,
}

impl Binding {
    fn new(data: Arc<Vec<u8>>, px_size: f32) -> Option<Self> {
        let face = Face::from_slice(&data, 0)?;
        let scale = px_size / face.units_per_em() as f32;
        // SAFETY: `face` borrows the heap allocation behind `data`,
        // which is owned by this Binding and never mutated. The Vec's
        // buffer address is stable across moves of the Arc, and `face`
        // is dropped before `data`.
        let face: Face<'static> = unsafe { std::mem::transmute(face) };
        Some(Self { face, data, scale })
    }
}

/// Per-style shaping engine over [`FontStore`]'s current faces.
#[derive(Default)]
pub struct Shaper {
    bindings: [Option<Binding>; FontStyle::COUNT],
}

impl Shaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)binds the engine for `style` to the store's current face.
    /// Must be called after every font load or size change for that
    /// style. Returns false when the store has no face to bind.
    pub fn rebuild(&mut self, style: FontStyle, fonts: &FontStore) -> bool {
        self.bindings[style.index()] = None;

        let Some(data) = fonts.face_data(style) else {
            debug!(?style, "no face available for shaper binding");
            return false;
        };
        match Binding::new(data, fonts.px_size()) {
            Some(binding) => {
                self.bindings[style.index()] = Some(binding);
                true
            }
            None => {
                warn!(?style, "shaping engine rejected face");
                false
            }
        }
    }

    /// Whether the regular binding exists (the minimum to shape anything).
    pub fn is_ready(&self) -> bool {
        self.bindings[FontStyle::Regular.index()].is_some()
    }

    /// Shapes a UTF-8 run left-to-right. A style with no binding falls
    /// back to the regular binding; an empty or unshapeable run yields
    /// an empty sequence, never an error.
    pub fn shape(&self, text: &str, style: FontStyle, options: &ShapeOptions) -> Vec<ShapedGlyph> {
        if text.is_empty() {
            return Vec::new();
        }
        let binding = self.bindings[style.index()]
            .as_ref()
            .or_else(|| self.bindings[FontStyle::Regular.index()].as_ref());
        let Some(binding) = binding else {
            return Vec::new();
        };

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.set_direction(Direction::LeftToRight);
        buffer.set_script(resolve_script(options.script));
        if let Some(language) = options.language {
            match language.parse() {
                Ok(language) => buffer.set_language(language),
                Err(_) => debug!(language, "ignoring unparsable language tag"),
            }
        }

        let toggle = |on: bool| u32::from(on);
        let mut features: SmallVec<[Feature; 4]> = SmallVec::new();
        features.push(Feature::new(
            Tag::from_bytes(b"liga"),
            toggle(options.ligatures),
            ..,
        ));
        features.push(Feature::new(
            Tag::from_bytes(b"clig"),
            toggle(options.ligatures),
            ..,
        ));
        features.push(Feature::new(
            Tag::from_bytes(b"kern"),
            toggle(options.kerning),
            ..,
        ));

        let glyphs = rustybuzz::shape(&binding.face, &features, buffer);

        let to_fixed = |units: i32| (units as f32 * binding.scale * 64.0).round() as i32;
        glyphs
            .glyph_infos()
            .iter()
            .zip(glyphs.glyph_positions())
            .map(|(info, pos)| ShapedGlyph {
                glyph_index: info.glyph_id,
                cluster: info.cluster,
                x_offset: to_fixed(pos.x_offset),
                y_offset: to_fixed(pos.y_offset),
                x_advance: to_fixed(pos.x_advance),
                y_advance: to_fixed(pos.y_advance),
            })
            .collect()
    }
}

fn resolve_script(tag: Option<&str>) -> rustybuzz::Script {
    if let Some(tag) = tag {
        let bytes = tag.as_bytes();
        if bytes.len() == 4 {
            let tag = Tag::from_bytes(&[bytes[0], bytes[1], bytes[2], bytes[3]]);
            if let Some(script) = rustybuzz::Script::from_iso15924_tag(tag) {
                return script;
            }
        }
        debug!(tag, "ignoring unknown script tag");
    }
    rustybuzz::script::COMMON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::find_system_font;

    fn shaper_with_default_font() -> Option<(FontStore, Shaper)> {
        find_system_font()?;
        let mut fonts = FontStore::new();
        fonts.load_default(14.0, 96).ok()?;
        let mut shaper = Shaper::new();
        assert!(shaper.rebuild(FontStyle::Regular, &fonts));
        Some((fonts, shaper))
    }

    #[test]
    fn test_empty_run_yields_empty_sequence() {
        let shaper = Shaper::new();
        assert!(shaper
            .shape("", FontStyle::Regular, &ShapeOptions::default())
            .is_empty());
    }

    #[test]
    fn test_unbound_shaper_yields_empty_sequence() {
        let shaper = Shaper::new();
        assert!(!shaper.is_ready());
        assert!(shaper
            .shape("hello", FontStyle::Regular, &ShapeOptions::default())
            .is_empty());
    }

    #[test]
    fn test_shape_ascii_run() {
        let Some((_fonts, shaper)) = shaper_with_default_font() else {
            return;
        };
        assert!(shaper.is_ready());

        let glyphs = shaper.shape("hello", FontStyle::Regular, &ShapeOptions::default());
        assert_eq!(glyphs.len(), 5);
        for (i, g) in glyphs.iter().enumerate() {
            assert_ne!(g.glyph_index, 0);
            assert_eq!(g.cluster, i as u32);
            assert!(g.x_advance > 0);
        }
    }

    #[test]
    fn test_unbound_style_falls_back_to_regular() {
        let Some((_fonts, shaper)) = shaper_with_default_font() else {
            return;
        };
        let regular = shaper.shape("abc", FontStyle::Regular, &ShapeOptions::default());
        let bold = shaper.shape("abc", FontStyle::Bold, &ShapeOptions::default());
        assert_eq!(regular, bold);
    }

    #[test]
    fn test_rebuild_after_size_change_rescales_advances() {
        let Some((mut fonts, mut shaper)) = shaper_with_default_font() else {
            return;
        };
        let small = shaper.shape("M", FontStyle::Regular, &ShapeOptions::default());

        fonts.set_size(28.0, 96).unwrap();
        assert!(shaper.rebuild(FontStyle::Regular, &fonts));
        let large = shaper.shape("M", FontStyle::Regular, &ShapeOptions::default());

        assert!(large[0].x_advance > small[0].x_advance);
    }

    #[test]
    fn test_monospace_advances_sum_exactly() {
        let Some((fonts, shaper)) = shaper_with_default_font() else {
            return;
        };
        let options = ShapeOptions {
            ligatures: false,
            kerning: false,
            ..Default::default()
        };

        const N: usize = 32;
        let run: String = std::iter::repeat('M').take(N).collect();
        let glyphs = shaper.shape(&run, FontStyle::Regular, &options);
        assert_eq!(glyphs.len(), N);

        let first = glyphs[0].x_advance;
        let sum: i64 = glyphs.iter().map(|g| g.x_advance as i64).sum();
        assert_eq!(sum, first as i64 * N as i64);

        // The 26.6 sum stays within half a pixel per glyph of the
        // integer nominal advance.
        let nominal = fonts.metrics().unwrap().cell_width;
        let sum_px = sum as f64 / 64.0;
        assert!((sum_px - (nominal as i64 * N as i64) as f64).abs() <= 0.5 * N as f64 + 1e-6);
    }

    #[test]
    fn test_ligatures_collapse_clusters() {
        // Ligature-bearing faces are probed separately from the
        // monospace defaults, which commonly carry none.
        const CANDIDATES: &[&str] = &[
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf",
            "/usr/share/fonts/truetype/freefont/FreeSerif.ttf",
        ];

        let mut probed = false;
        let mut ligated = false;
        for path in CANDIDATES {
            if !std::path::Path::new(path).exists() {
                continue;
            }
            let mut fonts = FontStore::new();
            if fonts.load(path, FontStyle::Regular, 14.0, 96).is_err() {
                continue;
            }
            let mut shaper = Shaper::new();
            assert!(shaper.rebuild(FontStyle::Regular, &fonts));
            probed = true;

            let off = shaper.shape(
                "fi!",
                FontStyle::Regular,
                &ShapeOptions {
                    ligatures: false,
                    ..Default::default()
                },
            );
            let on = shaper.shape("fi!", FontStyle::Regular, &ShapeOptions::default());

            assert_eq!(off.len(), 3);
            assert!(on.len() <= off.len());
            if on.len() == 2 {
                // "fi" fused into a single ligature glyph, "!" kept.
                assert_eq!(on[0].cluster, 0);
                assert_eq!(on[1].cluster, 2);
                ligated = true;
            }
        }

        if probed {
            assert!(ligated, "no probed face formed an fi ligature");
        }
    }
}
