//! Cache keys for rendered artifacts

use crate::constants::CACHE_FILE_EXTENSION;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest identifying one rendered artifact.
///
/// The digest covers the source path and the watermark text, each prefixed
/// with its byte length, so no choice of field contents can make two
/// different field lists hash the same input. Renders with non-default
/// appearance also fold in an appearance fingerprint as a third field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    digest: String,
}

impl CacheKey {
    /// Key for `text` stamped onto the image at `source_path`.
    pub fn new(source_path: &str, text: &str) -> Self {
        Self::build(source_path, text, None)
    }

    /// Key for a render whose appearance differs from the engine defaults.
    pub fn with_fingerprint(source_path: &str, text: &str, fingerprint: &str) -> Self {
        Self::build(source_path, text, Some(fingerprint))
    }

    fn build(source_path: &str, text: &str, fingerprint: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        update_field(&mut hasher, source_path);
        update_field(&mut hasher, text);
        if let Some(fingerprint) = fingerprint {
            update_field(&mut hasher, fingerprint);
        }
        Self {
            digest: hex::encode(hasher.finalize()),
        }
    }

    /// Lowercase hex digest
    pub fn as_str(&self) -> &str {
        &self.digest
    }

    /// Name of the cache file holding this key's artifact
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.digest, CACHE_FILE_EXTENSION)
    }
}

fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digest)
    }
}
