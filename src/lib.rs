// Inkstamp watermarking library
// Tiled text watermarks with a TTL-bounded on-disk render cache

pub mod cache;
pub mod config;
pub mod constants;
pub mod logging;
pub mod metrics;
pub mod watermark;

pub use cache::{CacheKey, CacheManager, CacheSweeper};
pub use config::WatermarkConfig;
pub use watermark::{RenderOutcome, RenderRequest, WatermarkEngine, WatermarkError};
