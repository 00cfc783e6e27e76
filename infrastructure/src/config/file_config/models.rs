//! Per-stage model configuration from TOML (`[models]` section)

use super::ConfigValidationError;
use atlance_domain::{Model, StageId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model selection per stage
///
/// # Example
///
/// ```toml
/// [models]
/// default = "qwen2.5vl:7b"
///
/// [models.stages]
/// duplicate_remover = "gemma3:12b"   # Selection can run on a model without tools
/// root = "qwen2.5vl:32b"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    /// Model used by every stage without an override
    pub default: String,
    /// Overrides keyed by stage name
    pub stages: BTreeMap<String, String>,
}

impl Default for FileModelsConfig {
    fn default() -> Self {
        Self {
            default: Model::default().to_string(),
            stages: BTreeMap::new(),
        }
    }
}

impl FileModelsConfig {
    fn parse_model(field: String, value: &str) -> Result<Model, ConfigValidationError> {
        if value.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName { field });
        }
        let Ok(model) = value.trim().parse::<Model>();
        Ok(model)
    }

    pub fn parse_default(&self) -> Result<Model, ConfigValidationError> {
        Self::parse_model("models.default".to_string(), &self.default)
    }

    /// Parse the overrides, rejecting unknown stage names and empty models.
    pub fn parse_overrides(&self) -> Result<BTreeMap<StageId, Model>, ConfigValidationError> {
        let mut overrides = BTreeMap::new();
        for (stage, model) in &self.stages {
            let id: StageId = stage
                .parse()
                .map_err(|_| ConfigValidationError::UnknownStage(stage.clone()))?;
            let model = Self::parse_model(format!("models.stages.{}", stage), model)?;
            overrides.insert(id, model);
        }
        Ok(overrides)
    }
}
