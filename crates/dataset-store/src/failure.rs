//! Failure injection for dataset reads
//!
//! Supports configurable per-dataset failures and latency for testing error
//! paths and cancellation.

use std::collections::HashMap;
use std::time::Duration;

/// Failure configuration for one dataset
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error message to return (None = only delay)
    pub error_message: Option<String>,
    /// Delay to add before answering
    pub delay: Option<Duration>,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Create a config that returns an error
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error_message: Some(message.into()),
            delay: None,
            fail_count: None,
        }
    }

    /// Create a config that just adds delay
    pub fn delay(duration: Duration) -> Self {
        Self {
            error_message: None,
            delay: Some(duration),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Failure injector keyed by dataset id
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<String, FailureConfig>,
    call_counts: HashMap<String, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for a dataset
    pub fn inject(&mut self, dataset_id: impl Into<String>, config: FailureConfig) {
        let dataset_id = dataset_id.into();
        self.configs.insert(dataset_id.clone(), config);
        self.call_counts.insert(dataset_id, 0);
    }

    /// Inject an error for a dataset
    pub fn inject_error(&mut self, dataset_id: impl Into<String>, message: impl Into<String>) {
        self.inject(dataset_id, FailureConfig::error(message));
    }

    /// Inject a delay for a dataset
    pub fn inject_delay(&mut self, dataset_id: impl Into<String>, delay: Duration) {
        self.inject(dataset_id, FailureConfig::delay(delay));
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Check whether a read of `dataset_id` should be disturbed.
    ///
    /// Returns the failure config if one applies, None otherwise.
    pub fn check(&mut self, dataset_id: &str) -> Option<FailureConfig> {
        let config = self.configs.get(dataset_id)?;
        let count = self.call_counts.entry(dataset_id.to_string()).or_insert(0);
        *count += 1;

        if let Some(limit) = config.fail_count {
            if *count > limit {
                return None;
            }
        }
        Some(config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_injector_basic() {
        let mut injector = FailureInjector::new();
        assert!(injector.check("ds-1").is_none());

        injector.inject_error("ds-1", "connection reset");
        let config = injector.check("ds-1").unwrap();
        assert_eq!(config.error_message.as_deref(), Some("connection reset"));
        assert!(injector.check("ds-2").is_none());
    }

    #[test]
    fn test_failure_injector_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject("ds-1", FailureConfig::error("flaky").with_fail_count(2));

        assert!(injector.check("ds-1").is_some());
        assert!(injector.check("ds-1").is_some());
        assert!(injector.check("ds-1").is_none());
    }

    #[test]
    fn test_failure_injector_clear() {
        let mut injector = FailureInjector::new();
        injector.inject_delay("ds-1", Duration::from_millis(5));
        assert!(injector.check("ds-1").is_some());

        injector.clear();
        assert!(injector.check("ds-1").is_none());
    }
}
