// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::cache::CacheConfig;
use crate::watermark::AppearanceConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub appearance: AppearanceConfig,
    /// Let concurrent misses for one key wait on a single render
    #[serde(default)]
    pub coalesce_renders: bool,
}

impl WatermarkConfig {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        let mut values = HashMap::new();
        for caps in re.captures_iter(yaml) {
            let var_name = caps[1].to_string();
            let value = std::env::var(&var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
            values.insert(var_name, value);
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        });

        // An empty document is a valid, all-defaults configuration
        if substituted.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.cache
            .validate()
            .map_err(|e| format!("cache: {}", e))?;
        self.appearance
            .validate()
            .map_err(|e| format!("appearance: {}", e))?;
        Ok(())
    }
}
