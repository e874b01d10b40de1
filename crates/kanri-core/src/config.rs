//! Board configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunable parameters for the board data layer.
///
/// Loadable from a TOML file; every field has a default so a partial (or
/// absent) file is fine.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct KanriConfig {
    /// Base URL of the task API.
    pub api_url: String,
    /// Tasks per page for infinite scroll.
    pub page_size: usize,
    /// Seconds a cache entry stays fresh.
    pub stale_after_secs: u64,
    /// Seconds of inactivity before an unused cache entry is collected.
    pub gc_after_secs: u64,
    /// Retry count for read operations.
    pub read_retries: u32,
    /// Retry count for write operations.
    pub write_retries: u32,
    /// Quiet window for search input, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for KanriConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:4000".to_string(),
            page_size: 10,
            stale_after_secs: 30,
            gc_after_secs: 300,
            read_retries: 2,
            write_retries: 1,
            debounce_ms: 300,
        }
    }
}

impl KanriConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(crate::error::KanriError::internal(format!(
                "failed to read config {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn gc_after(&self) -> Duration {
        Duration::from_secs(self.gc_after_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
