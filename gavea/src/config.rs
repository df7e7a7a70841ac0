//! Renderer configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Everything needed to bring a renderer session up. Unset font paths
/// fall back to the platform default list; unset style paths leave the
/// style to the synthetic fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub font_path: Option<PathBuf>,
    pub font_path_bold: Option<PathBuf>,
    pub font_path_italic: Option<PathBuf>,
    pub font_path_bold_italic: Option<PathBuf>,
    pub font_size_pt: f32,
    pub dpi: u32,
    pub atlas_size: u32,
    pub ligatures: bool,
    pub kerning: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_path_bold: None,
            font_path_italic: None,
            font_path_bold_italic: None,
            font_size_pt: 14.0,
            dpi: 96,
            atlas_size: 1024,
            ligatures: true,
            kerning: true,
        }
    }
}
