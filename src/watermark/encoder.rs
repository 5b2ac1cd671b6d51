//! Canvas encoder abstraction
//!
//! Serializes a composited canvas back into the container format of its
//! source image:
//! - PNG sources are re-encoded as RGBA PNG, keeping transparency
//! - JPEG sources, and anything else, become a JPEG at quality 100 with
//!   full-resolution (4:4:4) chroma
//!
//! Chroma subsampling smears the thin, light watermark strokes into the
//! neighbouring pixels, so the JPEG path verifies the frame header it wrote
//! and refuses output whose chroma planes are subsampled.

use super::WatermarkError;
use crate::constants::JPEG_QUALITY;
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// Container format of an encoded canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Output format for a decoded source format. Only PNG keeps its own
    /// container; unknown formats fall back to JPEG.
    pub fn for_source(source: Option<ImageFormat>) -> Self {
        match source {
            Some(ImageFormat::Png) => OutputFormat::Png,
            _ => OutputFormat::Jpeg,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of encoding a canvas
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
    /// The output format
    pub format: OutputFormat,
}

/// Trait for canvas encoders
///
/// The trait is object-safe so the engine can pick an encoder per source.
pub trait CanvasEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode an RGBA canvas
    fn encode(&self, canvas: &RgbaImage) -> Result<EncodedImage, WatermarkError>;
}

/// PNG encoder using the image crate
pub struct PngEncoder;

impl CanvasEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, canvas: &RgbaImage) -> Result<EncodedImage, WatermarkError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;

        let mut output = Cursor::new(Vec::new());
        ImagePngEncoder::new(&mut output)
            .write_image(
                canvas.as_raw(),
                canvas.width(),
                canvas.height(),
                image::ColorType::Rgba8,
            )
            .map_err(|e| encode_failed(OutputFormat::Png, e))?;

        Ok(EncodedImage {
            data: output.into_inner(),
            format: OutputFormat::Png,
        })
    }
}

/// JPEG encoder with full-resolution chroma
///
/// The image crate's baseline encoder converts RGB to YCbCr per 8x8 block
/// and writes all three components with 1x1 sampling factors, i.e. 4:4:4.
pub struct JpegEncoder {
    pub quality: u8,
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self {
            quality: JPEG_QUALITY,
        }
    }
}

impl CanvasEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(&self, canvas: &RgbaImage) -> Result<EncodedImage, WatermarkError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;

        // JPEG has no alpha channel
        let rgb_data = rgba_to_rgb(canvas.as_raw());

        let mut output = Cursor::new(Vec::new());
        ImageJpegEncoder::new_with_quality(&mut output, self.quality.clamp(1, 100))
            .write_image(
                &rgb_data,
                canvas.width(),
                canvas.height(),
                image::ColorType::Rgb8,
            )
            .map_err(|e| encode_failed(OutputFormat::Jpeg, e))?;

        let data = output.into_inner();
        match jpeg_sampling_factors(&data) {
            Some(factors) if factors.iter().all(|&f| f == (1, 1)) => {}
            other => {
                return Err(WatermarkError::Encode {
                    format: OutputFormat::Jpeg.to_string(),
                    message: format!("expected 4:4:4 sampling, frame header has {:?}", other),
                })
            }
        }

        Ok(EncodedImage {
            data,
            format: OutputFormat::Jpeg,
        })
    }
}

/// Encoder for the given output format
pub fn encoder_for(format: OutputFormat) -> Box<dyn CanvasEncoder> {
    match format {
        OutputFormat::Png => Box::new(PngEncoder),
        OutputFormat::Jpeg => Box::new(JpegEncoder::default()),
    }
}

/// Encode `canvas` for a source of format `source`.
pub fn encode_canvas(
    canvas: &RgbaImage,
    source: Option<ImageFormat>,
) -> Result<EncodedImage, WatermarkError> {
    encoder_for(OutputFormat::for_source(source)).encode(canvas)
}

/// Per-component `(horizontal, vertical)` sampling factors from the first
/// start-of-frame header of a JPEG stream.
pub fn jpeg_sampling_factors(data: &[u8]) -> Option<Vec<(u8, u8)>> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Fill bytes and parameterless markers
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let is_sof = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            // length(2) precision(1) height(2) width(2) count(1) then 3 bytes per component
            let header = data.get(pos + 4..pos + 2 + len)?;
            let count = *header.get(5)? as usize;
            let components = header.get(6..6 + count * 3)?;
            return Some(
                components
                    .chunks_exact(3)
                    .map(|c| (c[1] >> 4, c[1] & 0x0F))
                    .collect(),
            );
        }
        if marker == 0xDA {
            // Scan data reached without a frame header
            return None;
        }
        pos += 2 + len;
    }

    None
}

fn encode_failed(format: OutputFormat, err: image::ImageError) -> WatermarkError {
    WatermarkError::Encode {
        format: format.to_string(),
        message: err.to_string(),
    }
}

/// Convert RGBA to RGB by discarding alpha channel
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let pixel_count = rgba.len() / 4;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }

    rgb
}
