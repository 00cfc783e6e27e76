//! Pipeline shape configuration from TOML (`[pipeline]` section)

use atlance_application::PipelineMode;
use serde::{Deserialize, Serialize};

/// Raw pipeline configuration from TOML
///
/// # Example
///
/// ```toml
/// [pipeline]
/// mode = "delegating"
/// max_selected = 5
/// enable_questions = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    pub mode: PipelineMode,
    pub max_selected: usize,
    pub enable_landmarks: bool,
    /// Skip the landmark stage instead of failing the run when it fails
    pub landmarks_optional: bool,
    pub enable_questions: bool,
    pub max_questions: usize,
    pub contract_retries: usize,
    pub max_delegation_turns: usize,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Sequential,
            max_selected: 3,
            enable_landmarks: true,
            landmarks_optional: true,
            enable_questions: true,
            max_questions: 3,
            contract_retries: 1,
            max_delegation_turns: 8,
        }
    }
}
