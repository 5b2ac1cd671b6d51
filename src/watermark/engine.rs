//! Watermark engine facade.
//!
//! One call stamps tiled, rotated text over a source image and returns the
//! path of the cached result:
//!
//! 1. Derive the cache key and look it up. A fresh entry is returned as is.
//! 2. Decode the source, rasterize the text, rotate it, tile it over the
//!    canvas and encode in the source's container format.
//! 3. Store the encoded bytes under the key and return the cache path.
//!
//! Every render runs to completion on the calling thread. Failures are
//! reported once and never leave an entry behind.

use super::coalescing::{CoalescingSlot, RenderCoalescer};
use super::compositor::{tile_mark, TileGrid};
use super::config::AppearanceConfig;
use super::encoder::{encode_canvas, EncodedImage, OutputFormat};
use super::font::FontFace;
use super::text_renderer::{
    derive_font_size, parse_hex_color, renderer_for, Color, MarkRenderer, MarkStyle,
};
use super::WatermarkError;
use crate::cache::{CacheKey, CacheManager, CacheStats, CacheSweeper, SweepReport};
use crate::config::WatermarkConfig;
use crate::constants::MAX_FONT_SIZE;
use crate::metrics::WatermarkMetrics;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A single render call: what to stamp where, plus optional appearance
/// overrides on top of the engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub source_path: PathBuf,
    pub text: String,
    pub color: Option<String>,
    pub opacity: Option<f32>,
    pub angle: Option<f32>,
    pub tile_grid: Option<TileGrid>,
    pub font_size: Option<f32>,
}

impl RenderRequest {
    pub fn new(source_path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            text: text.into(),
            color: None,
            opacity: None,
            angle: None,
            tile_grid: None,
            font_size: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = Some(angle);
        self
    }

    pub fn with_tile_grid(mut self, grid: TileGrid) -> Self {
        self.tile_grid = Some(grid);
        self
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = Some(font_size);
        self
    }

    pub fn has_overrides(&self) -> bool {
        self.color.is_some()
            || self.opacity.is_some()
            || self.angle.is_some()
            || self.tile_grid.is_some()
            || self.font_size.is_some()
    }
}

/// Result of a render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Cached artifact path
    pub path: PathBuf,
    /// Served from the cache without rendering
    pub cache_hit: bool,
    pub format: OutputFormat,
    pub bytes: u64,
}

/// Appearance after request overrides are applied. The font size stays
/// optional until the source dimensions are known.
#[derive(Debug, Clone, Copy)]
struct ResolvedAppearance {
    color: Color,
    opacity: f32,
    angle: f32,
    grid: TileGrid,
    font_size: Option<f32>,
}

impl ResolvedAppearance {
    fn fingerprint(&self) -> String {
        let font_size = match self.font_size {
            Some(size) => size.to_string(),
            None => "auto".to_string(),
        };
        format!(
            "color={:02x}{:02x}{:02x};opacity={};angle={};grid={}x{};font_size={}",
            self.color.r,
            self.color.g,
            self.color.b,
            self.opacity,
            self.angle,
            self.grid.columns,
            self.grid.rows,
            font_size
        )
    }
}

pub struct WatermarkEngine {
    cache: Arc<CacheManager>,
    appearance: AppearanceConfig,
    color: Color,
    face: FontFace,
    renderer: Box<dyn MarkRenderer>,
    coalescer: Option<RenderCoalescer>,
    sweep_interval: Duration,
}

impl std::fmt::Debug for WatermarkEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkEngine")
            .field("cache_root", &self.cache.root())
            .field("font", &self.face.name())
            .field("strategy", &self.renderer.strategy())
            .field("coalesce_renders", &self.coalescer.is_some())
            .finish()
    }
}

impl WatermarkEngine {
    /// Build an engine from validated configuration. Loads the font face
    /// once; every render shares it.
    pub fn new(config: WatermarkConfig) -> Result<Self, WatermarkError> {
        config.validate().map_err(WatermarkError::Config)?;

        let color = parse_hex_color(&config.appearance.color)?;
        let face = FontFace::load(config.appearance.font_path.as_deref())?;
        let renderer = renderer_for(config.appearance.strategy);
        let cache = Arc::new(CacheManager::new(
            config.cache.root.clone(),
            config.cache.ttl(),
        ));

        tracing::info!(
            cache_root = %config.cache.root.display(),
            ttl_secs = config.cache.ttl_seconds,
            font = %face.name(),
            strategy = config.appearance.strategy.as_str(),
            coalesce_renders = config.coalesce_renders,
            "Watermark engine initialized"
        );

        Ok(Self {
            cache,
            color,
            face,
            renderer,
            coalescer: config.coalesce_renders.then(RenderCoalescer::new),
            sweep_interval: config.cache.sweep_interval(),
            appearance: config.appearance,
        })
    }

    /// Stamp `text` over the image at `source_path` with the configured
    /// appearance and return the cached artifact path.
    pub fn render(
        &self,
        source_path: impl AsRef<Path>,
        text: &str,
    ) -> Result<PathBuf, WatermarkError> {
        let request = RenderRequest::new(source_path.as_ref(), text);
        Ok(self.render_request(&request)?.path)
    }

    /// Render with per-request overrides and report how it was served.
    pub fn render_request(
        &self,
        request: &RenderRequest,
    ) -> Result<RenderOutcome, WatermarkError> {
        let appearance = self.resolve(request)?;
        let source = request.source_path.to_string_lossy();
        let key = if request.has_overrides() {
            CacheKey::with_fingerprint(&source, &request.text, &appearance.fingerprint())
        } else {
            CacheKey::new(&source, &request.text)
        };

        let span = tracing::info_span!("watermark_render", cache_key = %key);
        let _entered = span.enter();
        let metrics = WatermarkMetrics::global();

        if let Some(outcome) = self.cached_outcome(&key) {
            metrics.cache_hits.inc();
            tracing::debug!(path = %outcome.path.display(), "Watermark cache hit");
            return Ok(outcome);
        }
        metrics.cache_misses.inc();
        tracing::debug!(source = %request.source_path.display(), "Watermark cache miss");

        let _leader = match self.coalescer.as_ref().map(|c| c.acquire(&key)) {
            Some(CoalescingSlot::Follower) => match self.cached_outcome(&key) {
                Some(outcome) => return Ok(outcome),
                // The leader failed; render on our own.
                None => None,
            },
            Some(CoalescingSlot::Leader(guard)) => Some(guard),
            None => None,
        };

        let started = Instant::now();
        match self.render_uncached(request, &key, &appearance) {
            Ok((path, encoded)) => {
                let elapsed = started.elapsed();
                metrics.render_duration.observe(elapsed.as_secs_f64());
                tracing::info!(
                    path = %path.display(),
                    format = %encoded.format,
                    content_type = encoded.format.content_type(),
                    bytes = encoded.data.len(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Watermark rendered"
                );
                Ok(RenderOutcome {
                    path,
                    cache_hit: false,
                    format: encoded.format,
                    bytes: encoded.data.len() as u64,
                })
            }
            Err(e) => {
                metrics.render_failures.inc();
                tracing::warn!(
                    source = %request.source_path.display(),
                    error = %e,
                    input_error = e.is_input_error(),
                    "Watermark render failed"
                );
                Err(e)
            }
        }
    }

    /// Delete expired cache entries. This is the entry point the periodic
    /// sweeper drives.
    pub fn cleanup(&self) -> Result<SweepReport, WatermarkError> {
        let report = self.cache.sweep()?;
        tracing::info!(
            removed = report.removed,
            cache_size = report.remaining_bytes,
            unit = "bytes",
            "Watermark cache cleanup finished"
        );
        Ok(report)
    }

    pub fn cache_size(&self) -> Result<u64, WatermarkError> {
        Ok(self.cache.size()?)
    }

    pub fn cache_stats(&self) -> Result<CacheStats, WatermarkError> {
        Ok(self.cache.stats()?)
    }

    /// Remove every cached artifact.
    pub fn clear_cache(&self) -> Result<(), WatermarkError> {
        self.cache.clear()?;
        tracing::info!(cache_root = %self.cache.root().display(), "Watermark cache cleared");
        Ok(())
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    /// A sweeper over this engine's cache at the configured interval.
    /// It is not started.
    pub fn sweeper(&self) -> CacheSweeper {
        CacheSweeper::new(Arc::clone(&self.cache), self.sweep_interval)
    }

    fn resolve(&self, request: &RenderRequest) -> Result<ResolvedAppearance, WatermarkError> {
        let color = match &request.color {
            Some(hex) => parse_hex_color(hex)?,
            None => self.color,
        };
        let opacity = request.opacity.unwrap_or(self.appearance.opacity);
        if !opacity.is_finite() || !(0.0..=1.0).contains(&opacity) {
            return Err(WatermarkError::Render(format!(
                "Opacity must be between 0.0 and 1.0, got {}",
                opacity
            )));
        }
        let angle = request.angle.unwrap_or(self.appearance.angle);
        if !angle.is_finite() {
            return Err(WatermarkError::Render(format!("Angle must be finite, got {}", angle)));
        }
        let grid = request.tile_grid.unwrap_or(TileGrid {
            columns: self.appearance.tile_columns,
            rows: self.appearance.tile_rows,
        });
        if grid.columns == 0 || grid.rows == 0 {
            return Err(WatermarkError::Render(format!(
                "Tile grid must be at least 1x1, got {}x{}",
                grid.columns, grid.rows
            )));
        }

        let font_size = request.font_size.or(self.appearance.font_size);
        if let Some(size) = font_size {
            if !size.is_finite() || size <= 0.0 || size > MAX_FONT_SIZE {
                return Err(WatermarkError::Render(format!(
                    "Font size must be in (0, {}], got {}",
                    MAX_FONT_SIZE, size
                )));
            }
        }

        Ok(ResolvedAppearance {
            color,
            opacity,
            angle,
            grid,
            font_size,
        })
    }

    fn cached_outcome(&self, key: &CacheKey) -> Option<RenderOutcome> {
        let path = self.cache.lookup(key)?;
        let (format, bytes) = sniff_cached(&path)?;
        Some(RenderOutcome {
            path,
            cache_hit: true,
            format,
            bytes,
        })
    }

    fn render_uncached(
        &self,
        request: &RenderRequest,
        key: &CacheKey,
        appearance: &ResolvedAppearance,
    ) -> Result<(PathBuf, EncodedImage), WatermarkError> {
        let path = &request.source_path;
        let source_read = |source: std::io::Error| WatermarkError::SourceRead {
            path: path.clone(),
            source,
        };

        let reader = image::io::Reader::open(path)
            .map_err(source_read)?
            .with_guessed_format()
            .map_err(source_read)?;
        let source_format = reader.format();
        let decoded = reader.decode().map_err(|e| WatermarkError::Decode {
            path: path.clone(),
            message: e.to_string(),
        })?;

        let mut canvas = decoded.to_rgba8();
        let (width, height) = canvas.dimensions();

        let style = MarkStyle {
            font_size: appearance
                .font_size
                .unwrap_or_else(|| derive_font_size(width, height)),
            color: appearance.color.with_opacity(appearance.opacity),
            angle: appearance.angle,
        };
        let mark = self.renderer.render_mark(&self.face, &request.text, &style)?;
        let tiles = tile_mark(&mut canvas, &mark, appearance.grid);
        tracing::debug!(
            width,
            height,
            mark_width = mark.width(),
            mark_height = mark.height(),
            font_size = style.font_size,
            tiles,
            "Composited watermark tiles"
        );

        let encoded = encode_canvas(&canvas, source_format)?;
        if encoded.data.is_empty() {
            return Err(WatermarkError::EmptyOutput {
                key: key.to_string(),
            });
        }

        let stored = self.cache.store(key, &encoded.data)?;
        Ok((stored, encoded))
    }
}

/// Payload format and size of a cached artifact. Every cache file carries
/// the same extension, so the format comes from the magic bytes.
fn sniff_cached(path: &Path) -> Option<(OutputFormat, u64)> {
    let mut file = std::fs::File::open(path).ok()?;
    let bytes = file.metadata().ok()?.len();
    let mut magic = [0u8; 8];
    let read = file.read(&mut magic).ok()?;
    let format = match image::guess_format(&magic[..read]) {
        Ok(image::ImageFormat::Png) => OutputFormat::Png,
        _ => OutputFormat::Jpeg,
    };
    Some((format, bytes))
}
