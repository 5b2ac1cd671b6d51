// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers keeps the rendering geometry
// and cache policy in one place.

// =============================================================================
// Cache defaults
// =============================================================================

/// Default cache root, relative to the working directory
pub const DEFAULT_CACHE_ROOT: &str = "cache/watermark";

/// Default time-to-live for rendered artifacts (24 hours)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Default interval between cache sweeps (6 hours)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 6 * 60 * 60;

/// Extension used for every cache file, whatever the payload format
pub const CACHE_FILE_EXTENSION: &str = "jpg";

/// Name reported by the periodic cleanup task
pub const SWEEPER_TASK_NAME: &str = "WatermarkCacheCleanup";

// =============================================================================
// Text layout defaults
// =============================================================================

/// Maximum number of characters kept per line; longer lines are cut
pub const MAX_LINE_CHARS: usize = 64;

/// Transparent margin around the rendered text block, in pixels
pub const TEXT_PADDING: u32 = 12;

/// Line height used when the face reports non-positive metrics
pub const FALLBACK_LINE_HEIGHT: u32 = 16;

/// Smallest glyph size picked when the font size is derived from the image
pub const MIN_DERIVED_FONT_SIZE: f32 = 18.0;

/// Image short side is divided by this to derive the glyph size
pub const FONT_SIZE_DIVISOR: f32 = 40.0;

/// Largest accepted glyph size, configured or derived
pub const MAX_FONT_SIZE: f32 = 1000.0;

/// Upper bound on the pixel area of a rasterized text block
pub const MAX_MARK_PIXELS: u64 = 64 * 1024 * 1024;

// =============================================================================
// Appearance defaults
// =============================================================================

/// Default rotation in degrees (negative rises to the right)
pub const DEFAULT_ANGLE_DEGREES: f32 = -30.0;

/// Default number of tile columns across the image
pub const DEFAULT_TILE_COLUMNS: u32 = 5;

/// Default number of tile rows down the image
pub const DEFAULT_TILE_ROWS: u32 = 5;

/// Default mark color
pub const DEFAULT_COLOR: &str = "#FFFFFF";

/// Default mark opacity (alpha 100 of 255)
pub const DEFAULT_OPACITY: f32 = 100.0 / 255.0;

/// Interpolated mask values at or below this are dropped after rotation
pub const MASK_ALPHA_THRESHOLD: f32 = 127.5;

// =============================================================================
// Encoder defaults
// =============================================================================

/// JPEG quality used for every lossy encode
pub const JPEG_QUALITY: u8 = 100;
