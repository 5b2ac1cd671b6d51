//! Watermark module for stamping tiled, rotated text over raster images.
//!
//! Every render of a (source path, text) pair goes through the same pipeline
//! and ends up as one file in a TTL-bounded on-disk cache:
//!
//! - **Font rasterizer** ([`text_renderer`]): multi-line text to a coverage
//!   mask or a colored raster
//! - **Rotator** ([`rotate`]): arbitrary-angle bilinear rotation onto a canvas
//!   sized to fit
//! - **Tile compositor** ([`compositor`]): brick-offset tiling over the whole
//!   image with source-over blending
//! - **Encoder** ([`encoder`]): PNG for PNG sources, full-chroma JPEG otherwise
//! - **Engine** ([`engine`]): the cache-aware facade
//!
//! # Configuration Example
//!
//! ```yaml
//! cache:
//!   root: /var/cache/inkstamp
//!   ttl_seconds: 86400
//! appearance:
//!   tile_columns: 5
//!   tile_rows: 5
//!   angle: -30
//!   color: "#FFFFFF"
//!   opacity: 0.39
//!   strategy: mask
//! ```

pub mod coalescing;
pub mod compositor;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod font;
pub mod rotate;
pub mod text_renderer;

// Re-export main types for convenience
pub use coalescing::{CoalescingSlot, RenderCoalescer};
pub use compositor::{blend_at, plan_tiles, tile_mark, PlacementPosition, TileGrid, TilePlan};
pub use config::{AppearanceConfig, TextStrategy};
pub use encoder::{encode_canvas, CanvasEncoder, EncodedImage, OutputFormat};
pub use engine::{RenderOutcome, RenderRequest, WatermarkEngine};
pub use error::WatermarkError;
pub use font::FontFace;
pub use rotate::{rotate_mask, rotate_rgba, rotated_size};
pub use text_renderer::{
    derive_font_size, layout_text, parse_hex_color, renderer_for, Color, ColoredRenderer,
    MarkRenderer, MarkStyle, MaskRenderer, TextLayout,
};
