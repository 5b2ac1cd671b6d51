//! Text watermark rasterization.
//!
//! Renders multi-line watermark text into a raster exactly large enough for
//! the glyphs plus a fixed transparent padding. Two output strategies exist:
//!
//! - **mask** (default): an alpha-only coverage mask, rotated as a mask and
//!   tinted only at the end, so no color ever bleeds into the glyph edges.
//! - **colored** (legacy): text drawn in its final color onto a transparent
//!   RGBA background and rotated as color.
//!
//! The strategy is picked once when the engine is built; everything
//! downstream (tiling, encoding) only ever sees the finished RGBA mark.

use super::compositor::blend_pixels;
use super::config::TextStrategy;
use super::font::FontFace;
use super::rotate::{rotate_mask, rotate_rgba};
use super::WatermarkError;
use crate::constants::{
    FONT_SIZE_DIVISOR, MAX_FONT_SIZE, MAX_LINE_CHARS, MAX_MARK_PIXELS, MIN_DERIVED_FONT_SIZE,
    TEXT_PADDING,
};
use ab_glyph::{point, Font, GlyphId, PxScale, ScaleFont};
use image::{GrayImage, Luma, Rgba, RgbaImage};

/// Parsed RGB color from hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// White color.
    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    /// Black color.
    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    /// Combine with an opacity in 0.0..=1.0 into a translucent RGBA value.
    pub fn with_opacity(self, opacity: f32) -> Rgba<u8> {
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([self.r, self.g, self.b, alpha])
    }
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let hex = hex
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::Render("Color must start with '#'".to_string()))?;

    let digit = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| WatermarkError::Render(format!("Invalid hex digit in '#{}'", hex)))
    };

    if !hex.is_ascii() {
        return Err(WatermarkError::Render(format!(
            "Invalid hex digit in '#{}'",
            hex
        )));
    }

    match hex.len() {
        // #RGB: each digit doubled, 0xF -> 0xFF
        3 => Ok(Color::new(
            digit(&hex[0..1])? * 17,
            digit(&hex[1..2])? * 17,
            digit(&hex[2..3])? * 17,
        )),
        6 => Ok(Color::new(
            digit(&hex[0..2])?,
            digit(&hex[2..4])?,
            digit(&hex[4..6])?,
        )),
        _ => Err(WatermarkError::Render(format!(
            "Color must be #RGB or #RRGGBB format, got {} characters",
            hex.len()
        ))),
    }
}

/// Glyph size derived from the image being stamped: one fortieth of the
/// short side, never below 18 nor above [`MAX_FONT_SIZE`].
pub fn derive_font_size(width: u32, height: u32) -> f32 {
    (width.min(height) as f32 / FONT_SIZE_DIVISOR).clamp(MIN_DERIVED_FONT_SIZE, MAX_FONT_SIZE)
}

/// Measured layout of a block of watermark text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Lines after splitting and truncation.
    pub lines: Vec<String>,
    pub font_size: f32,
    pub line_height: u32,
    pub ascent: f32,
    /// Raster width: advance of the longest line plus padding on both sides.
    pub width: u32,
    /// Raster height: one line height per line plus padding top and bottom.
    pub height: u32,
}

/// Split `text` into lines, cut each at [`MAX_LINE_CHARS`], and size the
/// raster that will hold them.
pub fn layout_text(
    face: &FontFace,
    text: &str,
    font_size: f32,
) -> Result<TextLayout, WatermarkError> {
    if text.is_empty() {
        return Err(WatermarkError::Render(
            "Cannot render empty text".to_string(),
        ));
    }
    if !(font_size.is_finite() && font_size > 0.0 && font_size <= MAX_FONT_SIZE) {
        return Err(WatermarkError::Render(format!(
            "Font size must be in (0, {}], got {}",
            MAX_FONT_SIZE, font_size
        )));
    }

    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            line.trim_end_matches('\r')
                .chars()
                .take(MAX_LINE_CHARS)
                .collect()
        })
        .collect();

    // Widest by character count, as the mark is measured for a monospace face.
    let longest = lines
        .iter()
        .fold("", |best, line| {
            if line.chars().count() > best.chars().count() {
                line.as_str()
            } else {
                best
            }
        });

    let advance = face.measure_line(longest, font_size).ceil().max(0.0) as u32;
    let line_height = face.line_height(font_size);

    let too_large = || {
        WatermarkError::Render(format!(
            "Text block of {} lines at size {} is too large to rasterize",
            lines.len(),
            font_size
        ))
    };
    let width = advance
        .checked_add(TEXT_PADDING * 2)
        .ok_or_else(too_large)?;
    let height = u32::try_from(lines.len())
        .ok()
        .and_then(|count| line_height.checked_mul(count))
        .and_then(|block| block.checked_add(TEXT_PADDING * 2))
        .ok_or_else(too_large)?;
    if u64::from(width) * u64::from(height) > MAX_MARK_PIXELS {
        return Err(too_large());
    }

    Ok(TextLayout {
        width,
        height,
        ascent: face.ascent(font_size),
        lines,
        font_size,
        line_height,
    })
}

/// Walk every glyph of the layout and report `(x, y, coverage)` for each
/// covered pixel inside the raster.
fn draw_glyphs<F>(face: &FontFace, layout: &TextLayout, mut plot: F)
where
    F: FnMut(u32, u32, f32),
{
    let font = face.font();
    let scale = PxScale::from(layout.font_size);
    let scaled = font.as_scaled(scale);
    let (w, h) = (layout.width as i32, layout.height as i32);

    for (i, line) in layout.lines.iter().enumerate() {
        let baseline = TEXT_PADDING as f32 + layout.ascent + (i as u32 * layout.line_height) as f32;
        let mut cursor_x = TEXT_PADDING as f32;
        let mut prev: Option<GlyphId> = None;

        for c in line.chars() {
            let id = scaled.glyph_id(c);
            if let Some(prev) = prev {
                cursor_x += scaled.kern(prev, id);
            }

            let glyph = id.with_scale_and_position(scale, point(cursor_x, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|px, py, coverage| {
                    let x = px as i32 + bounds.min.x as i32;
                    let y = py as i32 + bounds.min.y as i32;
                    if x >= 0 && y >= 0 && x < w && y < h {
                        plot(x as u32, y as u32, coverage);
                    }
                });
            }

            cursor_x += scaled.h_advance(id);
            prev = Some(id);
        }
    }
}

/// Render text into an alpha-only coverage mask.
pub fn render_mask(
    face: &FontFace,
    text: &str,
    font_size: f32,
) -> Result<GrayImage, WatermarkError> {
    let layout = layout_text(face, text, font_size)?;
    let mut mask = GrayImage::new(layout.width, layout.height);

    draw_glyphs(face, &layout, |x, y, coverage| {
        let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
        let existing = mask.get_pixel(x, y)[0];
        if value > existing {
            mask.put_pixel(x, y, Luma([value]));
        }
    });

    Ok(mask)
}

/// Render text in `color` onto a transparent RGBA background.
pub fn render_colored(
    face: &FontFace,
    text: &str,
    font_size: f32,
    color: Rgba<u8>,
) -> Result<RgbaImage, WatermarkError> {
    let layout = layout_text(face, text, font_size)?;
    let mut image = RgbaImage::new(layout.width, layout.height);
    let alpha = color[3] as f32;

    draw_glyphs(face, &layout, |x, y, coverage| {
        let pixel_alpha = (coverage.clamp(0.0, 1.0) * alpha) as u8;
        let pixel = Rgba([color[0], color[1], color[2], pixel_alpha]);
        // Blend with the existing pixel where glyph bounds overlap.
        let existing = image.get_pixel(x, y);
        let blended = blend_pixels(*existing, pixel);
        image.put_pixel(x, y, blended);
    });

    Ok(image)
}

/// Tint a coverage mask: every pixel takes `color`, with alpha scaled by
/// the mask value.
pub fn colorize_mask(mask: &GrayImage, color: Rgba<u8>) -> RgbaImage {
    let alpha = color[3] as u32;
    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        let coverage = mask.get_pixel(x, y)[0] as u32;
        let a = (coverage * alpha + 127) / 255;
        Rgba([color[0], color[1], color[2], a as u8])
    })
}

/// Appearance of one rendered mark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkStyle {
    pub font_size: f32,
    pub color: Rgba<u8>,
    pub angle: f32,
}

/// Produces the rotated, colored mark that gets tiled over the image.
pub trait MarkRenderer: Send + Sync + std::fmt::Debug {
    fn strategy(&self) -> TextStrategy;

    fn render_mark(
        &self,
        face: &FontFace,
        text: &str,
        style: &MarkStyle,
    ) -> Result<RgbaImage, WatermarkError>;
}

/// Rasterize to a mask, rotate the mask, tint last.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaskRenderer;

impl MarkRenderer for MaskRenderer {
    fn strategy(&self) -> TextStrategy {
        TextStrategy::Mask
    }

    fn render_mark(
        &self,
        face: &FontFace,
        text: &str,
        style: &MarkStyle,
    ) -> Result<RgbaImage, WatermarkError> {
        let mask = render_mask(face, text, style.font_size)?;
        let rotated = rotate_mask(&mask, style.angle);
        Ok(colorize_mask(&rotated, style.color))
    }
}

/// Legacy path: draw colored text, rotate the colored raster.
#[derive(Debug, Default, Clone, Copy)]
pub struct ColoredRenderer;

impl MarkRenderer for ColoredRenderer {
    fn strategy(&self) -> TextStrategy {
        TextStrategy::Colored
    }

    fn render_mark(
        &self,
        face: &FontFace,
        text: &str,
        style: &MarkStyle,
    ) -> Result<RgbaImage, WatermarkError> {
        let image = render_colored(face, text, style.font_size, style.color)?;
        Ok(rotate_rgba(&image, style.angle))
    }
}

/// The renderer for a configured strategy.
pub fn renderer_for(strategy: TextStrategy) -> Box<dyn MarkRenderer> {
    match strategy {
        TextStrategy::Mask => Box::new(MaskRenderer),
        TextStrategy::Colored => Box::new(ColoredRenderer),
    }
}
