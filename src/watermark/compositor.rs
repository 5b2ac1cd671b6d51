//! Tiled watermark compositing.
//!
//! Covers a base canvas with repeated copies of a single rotated mark laid
//! out on a brick pattern: every odd row is shifted by half the horizontal
//! spacing so no straight vertical seam runs through the image. Each copy is
//! alpha-blended onto the base with the "over" operator.
//!
//! # Example
//!
//! ```ignore
//! use inkstamp::watermark::compositor::{tile_mark, TileGrid};
//!
//! let tiles = tile_mark(&mut canvas, &mark, TileGrid::default());
//! ```

use crate::constants::{DEFAULT_TILE_COLUMNS, DEFAULT_TILE_ROWS};
use image::{Rgba, RgbaImage};

/// Top-left corner of one tile, in base canvas coordinates. May be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i64,
    pub y: i64,
}

/// Target tile density across the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub columns: u32,
    pub rows: u32,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            columns: DEFAULT_TILE_COLUMNS,
            rows: DEFAULT_TILE_ROWS,
        }
    }
}

/// Where the copies of a mark go on a particular canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePlan {
    pub spacing_x: u32,
    pub spacing_y: u32,
    pub positions: Vec<PlacementPosition>,
}

/// Lay out the brick grid for a `mark_w` x `mark_h` mark on a
/// `base_w` x `base_h` canvas.
///
/// Spacing is the larger of the mark size and the canvas size divided by the
/// target column/row count. Rows start one full mark above the canvas and end
/// one full mark past the bottom edge; columns likewise, with odd rows pulled
/// back a whole step after their half-spacing shift so the left edge is never
/// left uncovered. Returns `None` for zero-sized marks or canvases.
pub fn plan_tiles(
    base_w: u32,
    base_h: u32,
    mark_w: u32,
    mark_h: u32,
    grid: TileGrid,
) -> Option<TilePlan> {
    if mark_w == 0 || mark_h == 0 || base_w == 0 || base_h == 0 {
        return None;
    }

    let spacing_x = mark_w.max(base_w / grid.columns.max(1));
    let spacing_y = mark_h.max(base_h / grid.rows.max(1));

    let (mw, mh) = (i64::from(mark_w), i64::from(mark_h));
    let (sx, sy) = (i64::from(spacing_x), i64::from(spacing_y));
    let start_x = -mw;
    let start_y = -mh;
    let end_x = i64::from(base_w) + mw;
    let end_y = i64::from(base_h) + mh;

    let mut positions = Vec::new();
    let mut y = start_y;
    let mut row = 0u64;
    while y < end_y {
        let mut x = if row % 2 == 1 {
            start_x + sx / 2 - sx
        } else {
            start_x
        };
        while x < end_x {
            positions.push(PlacementPosition { x, y });
            x += sx;
        }
        y += sy;
        row += 1;
    }

    Some(TilePlan {
        spacing_x,
        spacing_y,
        positions,
    })
}

/// Tile `mark` over `base` in place. Returns the number of copies drawn;
/// zero means the base was left untouched.
pub fn tile_mark(base: &mut RgbaImage, mark: &RgbaImage, grid: TileGrid) -> usize {
    let plan = match plan_tiles(base.width(), base.height(), mark.width(), mark.height(), grid) {
        Some(plan) => plan,
        None => return 0,
    };

    for position in &plan.positions {
        blend_at(base, mark, *position);
    }

    tracing::trace!(
        tiles = plan.positions.len(),
        spacing_x = plan.spacing_x,
        spacing_y = plan.spacing_y,
        "Tiled watermark across canvas"
    );

    plan.positions.len()
}

/// Blend one copy of `mark` onto `target` with its top-left at `position`,
/// clipped to the target bounds.
pub fn blend_at(target: &mut RgbaImage, mark: &RgbaImage, position: PlacementPosition) {
    let target_width = i64::from(target.width());
    let target_height = i64::from(target.height());

    let x_start = position.x.max(0);
    let y_start = position.y.max(0);
    let x_end = (position.x + i64::from(mark.width())).min(target_width);
    let y_end = (position.y + i64::from(mark.height())).min(target_height);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wm_pixel = mark.get_pixel((tx - position.x) as u32, (ty - position.y) as u32);
            if wm_pixel[3] == 0 {
                continue;
            }
            let target_pixel = target.get_pixel_mut(tx as u32, ty as u32);
            *target_pixel = blend_pixels(*target_pixel, *wm_pixel);
        }
    }
}

/// Blend two pixels using the Porter-Duff "over" operator.
///
/// Over an opaque background this reduces to
/// `src * src_alpha + dst * (1 - src_alpha)` per channel.
pub(crate) fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>) -> Rgba<u8> {
    let fg_alpha = foreground[3] as f32 / 255.0;
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
