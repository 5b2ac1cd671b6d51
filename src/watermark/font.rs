//! Font faces used to rasterize watermark text.
//!
//! The embedded face is parsed once per process and shared read-only by every
//! render call; `FontArc` keeps clones cheap. A face can also be loaded from a
//! TTF/OTF file named in the configuration.

use super::WatermarkError;
use crate::constants::FALLBACK_LINE_HEIGHT;
use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use std::path::Path;
use std::sync::OnceLock;

/// DejaVu Sans Mono (Bitstream Vera derived, freely redistributable).
/// Monospace keeps widths predictable when lines are measured by char count.
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

static DEFAULT_FONT: OnceLock<FontArc> = OnceLock::new();

/// Get the embedded font, parsing it on first use.
fn default_font() -> Result<FontArc, WatermarkError> {
    if let Some(font) = DEFAULT_FONT.get() {
        return Ok(font.clone());
    }

    let parsed = FontArc::try_from_slice(EMBEDDED_FONT_DATA)
        .map_err(|e| WatermarkError::Font(format!("embedded font: {}", e)))?;
    // A concurrent initializer may have won; either copy is identical.
    let _ = DEFAULT_FONT.set(parsed);

    DEFAULT_FONT
        .get()
        .cloned()
        .ok_or_else(|| WatermarkError::Font("Failed to initialize font".to_string()))
}

/// A loaded font face.
#[derive(Clone)]
pub struct FontFace {
    font: FontArc,
    name: String,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("name", &self.name)
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl FontFace {
    /// The embedded default face.
    pub fn embedded() -> Result<Self, WatermarkError> {
        Ok(Self {
            font: default_font()?,
            name: "embedded:DejaVuSansMono".to_string(),
        })
    }

    /// Load a face from a TTF/OTF file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WatermarkError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| WatermarkError::Font(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(data, path.display().to_string())
    }

    /// Parse a face from raw font bytes.
    pub fn from_bytes(data: Vec<u8>, name: impl Into<String>) -> Result<Self, WatermarkError> {
        let name = name.into();
        let font = FontArc::try_from_vec(data)
            .map_err(|e| WatermarkError::Font(format!("{}: {}", name, e)))?;
        Ok(Self { font, name })
    }

    /// Either the face at `path` or the embedded one.
    pub fn load(path: Option<&Path>) -> Result<Self, WatermarkError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::embedded(),
        }
    }

    pub fn font(&self) -> &FontArc {
        &self.font
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ascent in pixels at `size`.
    pub fn ascent(&self, size: f32) -> f32 {
        self.font.as_scaled(PxScale::from(size)).ascent()
    }

    /// Height of one text line (ascent plus descent) at `size`.
    pub fn line_height(&self, size: f32) -> u32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        // ab_glyph reports descent as a negative offset below the baseline.
        let height = (scaled.ascent() - scaled.descent()).ceil();
        if height.is_finite() && height > 0.0 {
            height as u32
        } else {
            FALLBACK_LINE_HEIGHT
        }
    }

    /// Horizontal advance of `line` at `size`, including kerning.
    pub fn measure_line(&self, line: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        let mut width = 0.0f32;
        let mut prev: Option<GlyphId> = None;

        for c in line.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }

        width
    }
}
