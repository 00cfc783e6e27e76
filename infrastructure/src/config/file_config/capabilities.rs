//! Capability call limits from TOML (`[capabilities]` section)

use atlance_application::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts and retry limits for model and search calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCapabilitiesConfig {
    pub search_timeout_seconds: u64,
    pub model_timeout_seconds: u64,
    /// Attempts per call, including the first
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub max_concurrent_searches: usize,
}

impl Default for FileCapabilitiesConfig {
    fn default() -> Self {
        Self {
            search_timeout_seconds: 15,
            model_timeout_seconds: 120,
            max_attempts: 3,
            retry_backoff_ms: 500,
            max_concurrent_searches: 4,
        }
    }
}

impl FileCapabilitiesConfig {
    fn policy(&self, timeout_seconds: u64) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(self.max_attempts)
            .with_backoff(Duration::from_millis(self.retry_backoff_ms))
            .with_timeout(Duration::from_secs(timeout_seconds))
    }

    pub fn model_retry(&self) -> RetryPolicy {
        self.policy(self.model_timeout_seconds)
    }

    pub fn search_retry(&self) -> RetryPolicy {
        self.policy(self.search_timeout_seconds)
    }
}
