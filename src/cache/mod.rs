// Cache module

use crate::constants::{DEFAULT_CACHE_ROOT, DEFAULT_CACHE_TTL_SECS, DEFAULT_SWEEP_INTERVAL_SECS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod error;
pub mod key;
pub mod manager;
pub mod sweeper;

pub use error::CacheError;
pub use key::CacheKey;
pub use manager::{CacheManager, CacheStats, SweepReport};
pub use sweeper::CacheSweeper;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            ttl_seconds: default_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_ROOT)
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECS // 24 hours
}

fn default_sweep_interval_seconds() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS // 6 hours
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("cache root cannot be empty".to_string());
        }
        if self.ttl_seconds == 0 {
            return Err("cache ttl_seconds must be greater than 0".to_string());
        }
        if self.sweep_interval_seconds == 0 {
            return Err("cache sweep_interval_seconds must be greater than 0".to_string());
        }
        Ok(())
    }
}
