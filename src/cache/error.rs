//! Error types for render cache operations

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Refusing to store an empty cache entry for {key}")]
    EmptyEntry { key: String },

    #[error("Cache root {} exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

impl CacheError {
    /// Build an I/O error that names the path it failed on.
    pub(crate) fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        CacheError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }
}
