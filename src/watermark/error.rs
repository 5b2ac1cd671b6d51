//! Watermark error types.
//!
//! Every failure of a render call surfaces as one of these. Cache lookups
//! never produce an error; they fail open to a regeneration instead.

use crate::cache::CacheError;
use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while rendering or caching a watermark.
#[derive(Debug)]
pub enum WatermarkError {
    /// The source image could not be opened or read.
    SourceRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The source image could not be decoded.
    Decode { path: PathBuf, message: String },

    /// The font could not be loaded or parsed.
    Font(String),

    /// Text could not be rasterized (empty text, bad color, ...).
    Render(String),

    /// The composited canvas could not be encoded.
    Encode { format: String, message: String },

    /// The encoder produced zero bytes.
    EmptyOutput { key: String },

    /// Storing, sweeping or sizing the cache failed.
    Cache(CacheError),

    /// Invalid configuration.
    Config(String),
}

impl WatermarkError {
    /// Input errors are caused by what the caller handed in and are
    /// never worth retrying.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::SourceRead { .. } | Self::Decode { .. } | Self::Font(_)
        )
    }
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceRead { path, source } => {
                write!(f, "Failed to read source image {}: {}", path.display(), source)
            }
            Self::Decode { path, message } => {
                write!(f, "Failed to decode source image {}: {}", path.display(), message)
            }
            Self::Font(msg) => write!(f, "Failed to load font: {}", msg),
            Self::Render(msg) => write!(f, "Failed to render text watermark: {}", msg),
            Self::Encode { format, message } => {
                write!(f, "Failed to encode watermarked image as {}: {}", format, message)
            }
            Self::EmptyOutput { key } => {
                write!(f, "Watermark output for {} is empty", key)
            }
            Self::Cache(err) => write!(f, "Watermark cache error: {}", err),
            Self::Config(msg) => write!(f, "Watermark configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SourceRead { source, .. } => Some(source),
            Self::Cache(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CacheError> for WatermarkError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::EmptyEntry { key } => Self::EmptyOutput { key },
            other => Self::Cache(other),
        }
    }
}
