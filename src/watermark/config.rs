//! Watermark appearance configuration.
//!
//! Controls how the mark looks: tiling density, glyph size, rotation, color
//! and opacity, the font face and the text rendering strategy.

use crate::constants::{
    DEFAULT_ANGLE_DEGREES, DEFAULT_COLOR, DEFAULT_OPACITY, DEFAULT_TILE_COLUMNS,
    DEFAULT_TILE_ROWS, MAX_FONT_SIZE,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Default values
fn default_tile_columns() -> u32 {
    DEFAULT_TILE_COLUMNS
}

fn default_tile_rows() -> u32 {
    DEFAULT_TILE_ROWS
}

fn default_angle() -> f32 {
    DEFAULT_ANGLE_DEGREES
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_opacity() -> f32 {
    DEFAULT_OPACITY
}

/// How watermark text becomes a colored, rotated raster.
///
/// - `mask`: rasterize coverage only, rotate the mask, colorize at the end
/// - `colored`: rasterize colored text onto a transparent canvas and rotate
///   all four channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStrategy {
    #[default]
    Mask,
    Colored,
}

impl TextStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mask => "mask",
            Self::Colored => "colored",
        }
    }
}

/// Appearance of the tiled text mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceConfig {
    /// Tiles per row used to derive horizontal spacing (default: 5)
    #[serde(default = "default_tile_columns")]
    pub tile_columns: u32,

    /// Tiles per column used to derive vertical spacing (default: 5)
    #[serde(default = "default_tile_rows")]
    pub tile_rows: u32,

    /// Glyph size in points. Derived from each image's dimensions when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,

    /// Rotation in degrees, clockwise in image coordinates (default: -30)
    #[serde(default = "default_angle")]
    pub angle: f32,

    /// Text color as hex string (default: "#FFFFFF")
    #[serde(default = "default_color")]
    pub color: String,

    /// Opacity from 0.0 (transparent) to 1.0 (opaque) (default: 100/255)
    #[serde(default = "default_opacity")]
    pub opacity: f32,

    /// TTF/OTF face to render with instead of the embedded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,

    #[serde(default)]
    pub strategy: TextStrategy,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            tile_columns: default_tile_columns(),
            tile_rows: default_tile_rows(),
            font_size: None,
            angle: default_angle(),
            color: default_color(),
            opacity: default_opacity(),
            font_path: None,
            strategy: TextStrategy::default(),
        }
    }
}

impl AppearanceConfig {
    /// Validate the appearance configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_columns == 0 || self.tile_rows == 0 {
            return Err(format!(
                "Tile grid must have at least one column and one row, got {}x{}",
                self.tile_columns, self.tile_rows
            ));
        }

        if let Some(size) = self.font_size {
            if !size.is_finite() || size <= 0.0 || size > MAX_FONT_SIZE {
                return Err(format!(
                    "Font size must be a finite value in (0, {}], got {}",
                    MAX_FONT_SIZE, size
                ));
            }
        }

        if !self.angle.is_finite() {
            return Err(format!("Angle must be finite, got {}", self.angle));
        }

        // Check for NaN/Infinity and valid range
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(format!(
                "Opacity must be a finite value between 0.0 and 1.0, got {}",
                self.opacity
            ));
        }

        validate_hex_color(&self.color)
    }
}

/// Validate hex color format (#RGB or #RRGGBB)
pub(crate) fn validate_hex_color(color: &str) -> Result<(), String> {
    if let Some(hex_part) = color.strip_prefix('#') {
        let len = hex_part.len();
        if (len != 3 && len != 6) || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!(
                "Color must be in #RGB or #RRGGBB format with valid hex characters, got '{}'",
                color
            ));
        }
        Ok(())
    } else {
        Err(format!(
            "Color must be a hex string starting with '#', got '{}'",
            color
        ))
    }
}
