//! Arbitrary-angle rotation of masks and RGBA rasters.
//!
//! Rotation is done by inverse mapping: the destination canvas is sized to the
//! axis-aligned bounding box of the rotated source corners, and every
//! destination pixel is mapped back into the source and sampled bilinearly.
//! Forward scattering would leave holes; nearest-neighbour sampling would
//! alias.
//!
//! Angles are in degrees, clockwise in image coordinates (y grows downward),
//! so a negative angle makes horizontal text rise to the right.

use crate::constants::MASK_ALPHA_THRESHOLD;
use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgba, RgbaImage};

/// Slack subtracted before rounding the canvas up, so that `cos(90°)` being
/// 6e-17 instead of 0 does not add a spurious row or column.
const SIZE_EPSILON: f64 = 1e-9;

/// Size of the canvas needed to hold a `width` x `height` raster rotated by
/// `degrees` without clipping.
pub fn rotated_size(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let geometry = Geometry::new(width, height, degrees);
    (geometry.dst_w, geometry.dst_h)
}

/// The four source corners rotated about the source center, expressed in
/// destination canvas coordinates.
pub fn rotated_corners(width: u32, height: u32, degrees: f32) -> [(f64, f64); 4] {
    let geometry = Geometry::new(width, height, degrees);
    let (w, h) = (width as f64, height as f64);
    [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)].map(|(x, y)| {
        let (rx, ry) = geometry.forward(x - geometry.src_cx, y - geometry.src_cy);
        (rx + geometry.dst_cx, ry + geometry.dst_cy)
    })
}

/// Rotate an alpha-only mask.
///
/// Interpolated values at or below half coverage are dropped to zero so the
/// rotated glyph edges carry no faint haze of noise pixels.
pub fn rotate_mask(src: &GrayImage, degrees: f32) -> GrayImage {
    rotate_buffer(src, degrees, |values| {
        let a = values[0];
        if a <= f64::from(MASK_ALPHA_THRESHOLD) {
            None
        } else {
            Some(Luma([clamp_channel(a)]))
        }
    })
}

/// Rotate an RGBA raster, interpolating every channel independently.
pub fn rotate_rgba(src: &RgbaImage, degrees: f32) -> RgbaImage {
    rotate_buffer(src, degrees, |values| {
        Some(Rgba([
            clamp_channel(values[0]),
            clamp_channel(values[1]),
            clamp_channel(values[2]),
            clamp_channel(values[3]),
        ]))
    })
}

fn clamp_channel(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Rotation geometry shared by the bounding box and the sampler.
struct Geometry {
    cos: f64,
    sin: f64,
    src_cx: f64,
    src_cy: f64,
    dst_w: u32,
    dst_h: u32,
    dst_cx: f64,
    dst_cy: f64,
}

impl Geometry {
    fn new(width: u32, height: u32, degrees: f32) -> Self {
        let radians = f64::from(degrees).to_radians();
        let (sin, cos) = radians.sin_cos();
        let (w, h) = (width as f64, height as f64);
        let src_cx = w / 2.0;
        let src_cy = h / 2.0;

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (x, y) in [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)] {
            let dx = x - src_cx;
            let dy = y - src_cy;
            let rx = dx * cos - dy * sin;
            let ry = dx * sin + dy * cos;
            min_x = min_x.min(rx);
            min_y = min_y.min(ry);
            max_x = max_x.max(rx);
            max_y = max_y.max(ry);
        }

        let dst_w = (max_x - min_x - SIZE_EPSILON).ceil().max(1.0) as u32;
        let dst_h = (max_y - min_y - SIZE_EPSILON).ceil().max(1.0) as u32;

        Self {
            cos,
            sin,
            src_cx,
            src_cy,
            dst_w,
            dst_h,
            dst_cx: dst_w as f64 / 2.0,
            dst_cy: dst_h as f64 / 2.0,
        }
    }

    /// Source-centered offset to destination-centered offset.
    fn forward(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.cos - y * self.sin, x * self.sin + y * self.cos)
    }

    /// Destination pixel to source coordinates (inverse rotation).
    fn inverse(&self, dx: u32, dy: u32) -> (f64, f64) {
        let x = dx as f64 - self.dst_cx;
        let y = dy as f64 - self.dst_cy;
        (
            x * self.cos + y * self.sin + self.src_cx,
            -x * self.sin + y * self.cos + self.src_cy,
        )
    }
}

/// Inverse-map every destination pixel into `src` and hand the bilinearly
/// interpolated channel values to `finish`. Pixels that map outside the
/// source, or for which `finish` returns `None`, stay zero.
fn rotate_buffer<P, F>(
    src: &ImageBuffer<P, Vec<u8>>,
    degrees: f32,
    finish: F,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
    F: Fn(&[f64]) -> Option<P>,
{
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 {
        return ImageBuffer::new(0, 0);
    }

    let geometry = Geometry::new(sw, sh, degrees);
    let mut dst: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(geometry.dst_w, geometry.dst_h);

    let channels = P::CHANNEL_COUNT as usize;
    let max_x = (sw - 1) as f64;
    let max_y = (sh - 1) as f64;
    let raw = src.as_raw();
    let stride = sw as usize * channels;
    let mut values = [0f64; 4];

    for dy in 0..geometry.dst_h {
        for dx in 0..geometry.dst_w {
            let (sx, sy) = geometry.inverse(dx, dy);
            if sx < 0.0 || sy < 0.0 || sx > max_x || sy > max_y {
                continue;
            }

            let x0 = sx.floor() as usize;
            let y0 = sy.floor() as usize;
            let x1 = (x0 + 1).min(sw as usize - 1);
            let y1 = (y0 + 1).min(sh as usize - 1);
            let fx = sx - x0 as f64;
            let fy = sy - y0 as f64;

            let w00 = (1.0 - fx) * (1.0 - fy);
            let w10 = fx * (1.0 - fy);
            let w01 = (1.0 - fx) * fy;
            let w11 = fx * fy;

            let o00 = y0 * stride + x0 * channels;
            let o10 = y0 * stride + x1 * channels;
            let o01 = y1 * stride + x0 * channels;
            let o11 = y1 * stride + x1 * channels;

            for (c, value) in values.iter_mut().enumerate().take(channels) {
                *value = f64::from(raw[o00 + c]) * w00
                    + f64::from(raw[o10 + c]) * w10
                    + f64::from(raw[o01 + c]) * w01
                    + f64::from(raw[o11 + c]) * w11;
            }

            if let Some(pixel) = finish(&values[..channels]) {
                dst.put_pixel(dx, dy, pixel);
            }
        }
    }

    dst
}
