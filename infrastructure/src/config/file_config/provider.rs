//! Model provider and logging configuration (`[provider]`, `[logging]`)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ollama connection settings
///
/// ```toml
/// [provider]
/// base_url = "http://gpu-box:11434"
/// request_timeout_seconds = 300
/// keep_alive = "10m"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    pub base_url: String,
    /// HTTP timeout for a single request to the provider
    pub request_timeout_seconds: u64,
    /// How long the provider keeps the model loaded between requests
    pub keep_alive: Option<String>,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            request_timeout_seconds: 300,
            keep_alive: None,
        }
    }
}

/// Log destinations. Both are off unless set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for per-run JSONL transcripts
    pub run_log_dir: Option<PathBuf>,
    /// Directory for daily diagnostic log files
    pub log_dir: Option<PathBuf>,
}
