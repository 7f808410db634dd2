//! Built-in engine defaults (layer 1) and the typed view of the merged
//! configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scoped threads used for dataset batches of one pass (default: 4)
    pub worker_threads: usize,

    /// Budget for one merge pass in milliseconds; 0 disables it (default: 30000)
    pub resolve_timeout_ms: u64,

    /// Longest link chain followed (default: 8)
    pub max_link_depth: usize,

    #[serde(default)]
    pub log: LogConfig,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing-subscriber` filter directive, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            resolve_timeout_ms: 30_000,
            max_link_depth: 8,
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "worker_threads": self.worker_threads,
            "resolve_timeout_ms": self.resolve_timeout_ms,
            "max_link_depth": self.max_link_depth,
            "log": {
                "filter": self.log.filter
            }
        })
    }

    /// Pass budget, `None` when disabled
    pub fn resolve_timeout(&self) -> Option<Duration> {
        (self.resolve_timeout_ms > 0).then(|| Duration::from_millis(self.resolve_timeout_ms))
    }
}
