use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use inkstamp::config::WatermarkConfig;
use inkstamp::logging::{init_subscriber, LogFormat};
use inkstamp::watermark::{RenderRequest, TileGrid, WatermarkEngine};
use std::path::PathBuf;

/// Inkstamp - tiled text watermarks with an on-disk render cache
#[derive(Parser, Debug)]
#[command(name = "inkstamp")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log format: json or pretty
    #[arg(long, default_value = "json")]
    log_format: LogFormat,

    /// Print Prometheus metrics to stdout before exiting
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamp text over an image and print the cached artifact path
    Render {
        /// Source image
        source: PathBuf,

        /// Watermark text; `\n` separates lines
        text: String,

        /// Override the mark color (#RGB or #RRGGBB)
        #[arg(long)]
        color: Option<String>,

        /// Override the mark opacity (0.0 to 1.0)
        #[arg(long)]
        opacity: Option<f32>,

        /// Override the rotation in degrees
        #[arg(long, allow_hyphen_values = true)]
        angle: Option<f32>,

        /// Override the glyph size in points
        #[arg(long)]
        font_size: Option<f32>,

        /// Override the tile grid as COLUMNSxROWS, e.g. 4x3
        #[arg(long, value_parser = parse_grid)]
        grid: Option<TileGrid>,

        /// Print the full outcome as JSON instead of just the path
        #[arg(long)]
        json: bool,
    },
    /// Delete expired cache entries once
    Cleanup,
    /// Print the cache size in bytes
    Size,
    /// Remove the whole cache directory
    Clear,
    /// Run the periodic cache sweeper until interrupted
    Sweeper,
}

fn parse_grid(value: &str) -> Result<TileGrid, String> {
    let (columns, rows) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected COLUMNSxROWS, got '{}'", value))?;
    let columns = columns
        .trim()
        .parse()
        .map_err(|e| format!("invalid column count: {}", e))?;
    let rows = rows
        .trim()
        .parse()
        .map_err(|e| format!("invalid row count: {}", e))?;
    Ok(TileGrid { columns, rows })
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging subsystem
    init_subscriber(args.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    let config = match &args.config {
        Some(path) => WatermarkConfig::from_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => WatermarkConfig::default(),
    };

    tracing::info!(
        config_file = ?args.config,
        cache_root = %config.cache.root.display(),
        ttl_secs = config.cache.ttl_seconds,
        "Configuration loaded successfully"
    );

    let engine = WatermarkEngine::new(config).context("Failed to initialize watermark engine")?;

    match args.command {
        Command::Render {
            source,
            text,
            color,
            opacity,
            angle,
            font_size,
            grid,
            json,
        } => {
            let request = RenderRequest {
                source_path: source,
                text: text.replace("\\n", "\n"),
                color,
                opacity,
                angle,
                tile_grid: grid,
                font_size,
            };
            let outcome = engine
                .render_request(&request)
                .with_context(|| format!("Failed to watermark {}", request.source_path.display()))?;
            if json {
                let value = serde_json::json!({
                    "path": outcome.path,
                    "cache_hit": outcome.cache_hit,
                    "format": outcome.format.as_str(),
                    "content_type": outcome.format.content_type(),
                    "bytes": outcome.bytes,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", outcome.path.display());
            }
        }
        Command::Cleanup => {
            let report = engine.cleanup().context("Cache cleanup failed")?;
            println!(
                "removed {} expired entries, {} bytes remaining",
                report.removed, report.remaining_bytes
            );
        }
        Command::Size => {
            let stats = engine.cache_stats().context("Failed to size cache")?;
            println!("{} bytes in {} files", stats.bytes, stats.files);
        }
        Command::Clear => {
            engine.clear_cache().context("Failed to clear cache")?;
            println!("cache cleared");
        }
        Command::Sweeper => run_sweeper(&engine)?,
    }

    if args.metrics {
        print!("{}", inkstamp::metrics::export()?);
    }

    Ok(())
}

fn run_sweeper(engine: &WatermarkEngine) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        let sweeper = engine.sweeper();
        tracing::info!(
            task = sweeper.name(),
            interval_secs = sweeper.interval().as_secs(),
            "Running cache sweeper, press Ctrl-C to stop"
        );
        sweeper.start();
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        sweeper.shutdown().await;
        tracing::info!(task = sweeper.name(), "Cache sweeper stopped");
        Ok::<(), anyhow::Error>(())
    })
}
