//! Configuration types for the network-call store.

mod provider;

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use provider::{SettingsProvider, SharedSettings, StaticSettings};

pub const DEFAULT_MAX_STORED_CALLS: usize = 1000;
pub const DEFAULT_MAX_BODY_CACHE_SIZE_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_MAX_BODY_SIZE_BYTES: usize = 1024 * 1024;

/// Capacity and codec limits, read at the start of every store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSettings {
    /// Maximum number of call records kept (oldest evicted first)
    #[serde(default = "default_max_stored_calls")]
    pub max_stored_calls: usize,

    /// Byte budget of the body cache (least recently used evicted first)
    #[serde(default = "default_max_body_cache_size_bytes")]
    pub max_body_cache_size_bytes: usize,

    /// Bodies longer than this are truncated; 0 disables truncation
    #[serde(default = "default_max_body_size_bytes")]
    pub max_body_size_bytes: usize,

    /// Gzip bodies when that makes them smaller
    #[serde(default = "default_compression_enabled")]
    pub compression_enabled: bool,
}

fn default_max_stored_calls() -> usize {
    DEFAULT_MAX_STORED_CALLS
}

fn default_max_body_cache_size_bytes() -> usize {
    DEFAULT_MAX_BODY_CACHE_SIZE_BYTES
}

fn default_max_body_size_bytes() -> usize {
    DEFAULT_MAX_BODY_SIZE_BYTES
}

fn default_compression_enabled() -> bool {
    true
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_stored_calls: DEFAULT_MAX_STORED_CALLS,
            max_body_cache_size_bytes: DEFAULT_MAX_BODY_CACHE_SIZE_BYTES,
            max_body_size_bytes: DEFAULT_MAX_BODY_SIZE_BYTES,
            compression_enabled: true,
        }
    }
}

impl StoreSettings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {path:?}"))?;
        let settings: StoreSettings = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file {path:?}"))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_stored_calls == 0 {
            anyhow::bail!("maxStoredCalls must be at least 1");
        }

        if self.max_body_size_bytes > 0 && self.max_body_cache_size_bytes < self.max_body_size_bytes
        {
            tracing::warn!(
                "maxBodyCacheSizeBytes ({}) is smaller than maxBodySizeBytes ({})",
                self.max_body_cache_size_bytes,
                self.max_body_size_bytes
            );
        }

        Ok(())
    }
}
