//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into [`PipelineParams`]
//! once validated.

mod capabilities;
mod models;
mod pipeline;
mod provider;

pub use capabilities::FileCapabilitiesConfig;
pub use models::FileModelsConfig;
pub use pipeline::FilePipelineConfig;
pub use provider::{FileLoggingConfig, FileProviderConfig};

use atlance_application::{PipelineParams, StageModels};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    InvalidTimeout(&'static str),

    #[error("{0} must be at least 1")]
    InvalidLimit(&'static str),

    #[error("{field}: model name cannot be empty")]
    EmptyModelName { field: String },

    #[error("models.stages: unknown stage '{0}'")]
    UnknownStage(String),

    #[error("provider.base_url cannot be empty")]
    EmptyBaseUrl,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Model per stage
    pub models: FileModelsConfig,
    /// Graph shape and stage limits
    pub pipeline: FilePipelineConfig,
    /// Timeouts and retries for model and search calls
    pub capabilities: FileCapabilitiesConfig,
    /// Ollama connection
    pub provider: FileProviderConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let caps = &self.capabilities;
        if caps.search_timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "capabilities.search_timeout_seconds",
            ));
        }
        if caps.model_timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "capabilities.model_timeout_seconds",
            ));
        }
        if self.provider.request_timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout(
                "provider.request_timeout_seconds",
            ));
        }

        let limits = [
            ("pipeline.max_selected", self.pipeline.max_selected),
            ("pipeline.max_delegation_turns", self.pipeline.max_delegation_turns),
            ("capabilities.max_attempts", caps.max_attempts as usize),
            ("capabilities.max_concurrent_searches", caps.max_concurrent_searches),
        ];
        if let Some((field, _)) = limits.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigValidationError::InvalidLimit(field));
        }

        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyBaseUrl);
        }

        self.models.parse_default()?;
        self.models.parse_overrides()?;
        Ok(())
    }

    /// Validate and convert into pipeline parameters.
    pub fn to_params(&self) -> Result<PipelineParams, ConfigValidationError> {
        self.validate()?;
        let pipeline = &self.pipeline;

        Ok(PipelineParams {
            mode: pipeline.mode,
            max_selected: pipeline.max_selected,
            enable_landmarks: pipeline.enable_landmarks,
            landmarks_optional: pipeline.landmarks_optional,
            enable_questions: pipeline.enable_questions,
            max_questions: pipeline.max_questions,
            contract_retries: pipeline.contract_retries,
            max_delegation_turns: pipeline.max_delegation_turns,
            model_retry: self.capabilities.model_retry(),
            search_retry: self.capabilities.search_retry(),
            max_concurrent_searches: self.capabilities.max_concurrent_searches,
            models: StageModels {
                default: self.models.parse_default()?,
                overrides: self.models.parse_overrides()?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlance_application::PipelineMode;
    use atlance_domain::{Model, StageId};
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[models]
default = "gemma3:27b"

[models.stages]
root = "qwen2.5vl:32b"

[pipeline]
mode = "delegating"
max_selected = 5
enable_questions = false

[capabilities]
search_timeout_seconds = 10
max_concurrent_searches = 2

[provider]
base_url = "http://gpu-box:11434"
keep_alive = "10m"

[logging]
run_log_dir = "/var/log/atlance"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.pipeline.mode, PipelineMode::Delegating);
        assert_eq!(config.pipeline.max_selected, 5);
        assert!(!config.pipeline.enable_questions);
        assert_eq!(config.capabilities.search_timeout_seconds, 10);
        assert_eq!(config.provider.base_url, "http://gpu-box:11434");
        assert_eq!(config.provider.keep_alive.as_deref(), Some("10m"));
        assert!(config.logging.run_log_dir.is_some());

        let params = config.to_params().unwrap();
        assert_eq!(params.models.for_stage(StageId::Root), &Model::Qwen25Vl32b);
        assert_eq!(params.models.for_stage(StageId::Selection), &Model::Gemma3_27b);
        assert_eq!(params.search_retry.timeout, Duration::from_secs(10));
        assert_eq!(params.max_concurrent_searches, 2);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: FileConfig = toml::from_str("[pipeline]\nmax_questions = 1\n").unwrap();
        assert_eq!(config.pipeline.max_questions, 1);
        // Defaults should apply
        assert_eq!(config.pipeline.max_selected, 3);
        assert!(config.pipeline.landmarks_optional);
        assert_eq!(config.provider.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_default_config_matches_default_params() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());

        let params = config.to_params().unwrap();
        let defaults = PipelineParams::default();
        assert_eq!(params.mode, defaults.mode);
        assert_eq!(params.max_selected, defaults.max_selected);
        assert_eq!(params.contract_retries, defaults.contract_retries);
        assert_eq!(params.models, defaults.models);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config: FileConfig =
            toml::from_str("[capabilities]\nsearch_timeout_seconds = 0\n").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidTimeout(
                "capabilities.search_timeout_seconds"
            ))
        );
    }

    #[test]
    fn test_zero_max_selected_rejected() {
        let config: FileConfig = toml::from_str("[pipeline]\nmax_selected = 0\n").unwrap();
        let err = config.to_params().unwrap_err();
        assert_eq!(err.to_string(), "pipeline.max_selected must be at least 1");
    }

    #[test]
    fn test_empty_default_model_rejected() {
        let config: FileConfig = toml::from_str("[models]\ndefault = \"\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::EmptyModelName { .. })
        ));
    }

    #[test]
    fn test_unknown_mode_is_a_parse_error() {
        assert!(toml::from_str::<FileConfig>("[pipeline]\nmode = \"parallel\"\n").is_err());
    }
}
