// Watermark Prometheus metrics
//
// Process-global collectors for the render pipeline and its cache:
// - Cache operation counters (hit, miss, store, expired_removed)
// - Render duration histogram and failure counter
// - Cache size gauge, refreshed on every cleanup pass

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, IntCounter, IntGauge, TextEncoder,
};
use std::sync::OnceLock;

/// Global metrics for watermark rendering and caching
pub struct WatermarkMetrics {
    /// Lookups that returned a fresh artifact
    pub cache_hits: IntCounter,

    /// Lookups that required a render
    pub cache_misses: IntCounter,

    /// Artifacts written to the cache
    pub cache_stores: IntCounter,

    /// Files deleted by cleanup passes
    pub expired_removed: IntCounter,

    /// Duration of uncached renders (decode through store), in seconds
    pub render_duration: Histogram,

    /// Render calls that returned an error
    pub render_failures: IntCounter,

    /// Bytes held by the cache after the last cleanup pass
    pub cache_size_bytes: IntGauge,
}

/// Global singleton instance of metrics
static METRICS: OnceLock<WatermarkMetrics> = OnceLock::new();

impl WatermarkMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Collectors are registered with the default Prometheus registry on the
    /// first call. Subsequent calls return the same instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let cache_ops = register_int_counter_vec!(
                "inkstamp_cache_operations_total",
                "Total number of watermark cache operations by type",
                &["operation"] // hit, miss, store, expired_removed
            )
            .expect("Failed to register inkstamp_cache_operations_total metric");

            let render_duration = register_histogram!(
                "inkstamp_render_duration_seconds",
                "Duration of uncached watermark renders in seconds",
                vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0] // 5ms to 10s
            )
            .expect("Failed to register inkstamp_render_duration_seconds metric");

            let render_failures = register_int_counter!(
                "inkstamp_render_failures_total",
                "Total number of failed watermark renders"
            )
            .expect("Failed to register inkstamp_render_failures_total metric");

            let cache_size_bytes = register_int_gauge!(
                "inkstamp_cache_size_bytes",
                "Total size of the watermark cache after the last cleanup pass"
            )
            .expect("Failed to register inkstamp_cache_size_bytes metric");

            WatermarkMetrics {
                cache_hits: cache_ops.with_label_values(&["hit"]),
                cache_misses: cache_ops.with_label_values(&["miss"]),
                cache_stores: cache_ops.with_label_values(&["store"]),
                expired_removed: cache_ops.with_label_values(&["expired_removed"]),
                render_duration,
                render_failures,
                cache_size_bytes,
            }
        })
    }

    /// Record the cache size, saturating at `i64::MAX`.
    pub fn set_cache_size(&self, bytes: u64) {
        self.cache_size_bytes
            .set(i64::try_from(bytes).unwrap_or(i64::MAX));
    }
}

/// Render the default registry in the Prometheus text exposition format.
pub fn export() -> Result<String, prometheus::Error> {
    // Make sure our collectors exist even if nothing has rendered yet.
    let _ = WatermarkMetrics::global();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
