//! Medium store configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MediumError;

/// Medium store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediumConfig {
    /// Maximum total number of cached bytes
    pub max_cache_size: u64,
    /// Maximum size of a single cached region in bytes
    pub max_cache_region_size: u64,
    /// Maximum size of a single read or write against the medium
    pub max_read_write_block_size: u64,
    /// Whether read data is kept in the cache
    pub caching_enabled: bool,
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 1_048_576,        // 1 MiB
            max_cache_region_size: 8192,      // one block per region
            max_read_write_block_size: 8192,
            caching_enabled: true,
        }
    }
}

impl MediumConfig {
    /// Checks size bounds for consistency.
    ///
    /// # Returns
    /// `Result<(), MediumError>` with `InvalidArgument` for zero sizes or a
    /// region size exceeding the cache size.
    pub fn validate(&self) -> Result<(), MediumError> {
        if self.max_cache_size == 0 {
            return Err(MediumError::InvalidArgument(
                "max_cache_size must be > 0".to_string(),
            ));
        }
        if self.max_cache_region_size == 0 {
            return Err(MediumError::InvalidArgument(
                "max_cache_region_size must be > 0".to_string(),
            ));
        }
        if self.max_read_write_block_size == 0 {
            return Err(MediumError::InvalidArgument(
                "max_read_write_block_size must be > 0".to_string(),
            ));
        }
        if self.max_cache_region_size > self.max_cache_size {
            return Err(MediumError::InvalidArgument(format!(
                "max_cache_region_size {} exceeds max_cache_size {}",
                self.max_cache_region_size, self.max_cache_size
            )));
        }
        Ok(())
    }

    /// Parses a configuration from JSON, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self, MediumError> {
        let config: MediumConfig = serde_json::from_str(json)
            .map_err(|e| MediumError::InvalidArgument(format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, MediumError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            crate::accessor::io_utils::classify_io_error(
                e,
                &format!("reading config {}", path.display()),
            )
        })?;
        Self::from_json_str(&json)
    }
}
