//! Model value object representing a vision-capable LLM

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Available LLM models (Value Object)
///
/// Every stage runs against one of these. Names follow the tag format of the
/// local model provider (`family:size`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    // Gemma models
    Gemma3_4b,
    Gemma3_12b,
    Gemma3_27b,
    // Qwen models
    Qwen25Vl7b,
    Qwen25Vl32b,
    // Llama models
    Llama32Vision,
    // Text-only models
    Qwen3_8b,
    Llama31_8b,
    // Custom
    Custom(String),
}

impl Model {
    /// Get the string identifier for this model
    pub fn as_str(&self) -> &str {
        match self {
            Model::Gemma3_4b => "gemma3:4b",
            Model::Gemma3_12b => "gemma3:12b",
            Model::Gemma3_27b => "gemma3:27b",
            Model::Qwen25Vl7b => "qwen2.5vl:7b",
            Model::Qwen25Vl32b => "qwen2.5vl:32b",
            Model::Llama32Vision => "llama3.2-vision",
            Model::Qwen3_8b => "qwen3:8b",
            Model::Llama31_8b => "llama3.1:8b",
            Model::Custom(s) => s,
        }
    }

    /// Whether the model accepts image attachments.
    ///
    /// Custom models are assumed to be vision capable; the provider reports
    /// an error otherwise.
    pub fn supports_images(&self) -> bool {
        !matches!(self, Model::Qwen3_8b | Model::Llama31_8b)
    }

    /// Whether the model supports native tool calls (required by the
    /// delegating root stage).
    pub fn supports_tools(&self) -> bool {
        !matches!(self, Model::Gemma3_4b | Model::Gemma3_12b | Model::Gemma3_27b)
    }
}

impl Default for Model {
    /// Returns the default model (Qwen 2.5 VL 7B: vision and tool use)
    fn default() -> Self {
        Model::Qwen25Vl7b
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "gemma3:4b" => Model::Gemma3_4b,
            "gemma3:12b" | "gemma3" => Model::Gemma3_12b,
            "gemma3:27b" => Model::Gemma3_27b,
            "qwen2.5vl:7b" | "qwen2.5vl" => Model::Qwen25Vl7b,
            "qwen2.5vl:32b" => Model::Qwen25Vl32b,
            "llama3.2-vision" | "llama3.2-vision:11b" => Model::Llama32Vision,
            "qwen3:8b" => Model::Qwen3_8b,
            "llama3.1:8b" => Model::Llama31_8b,
            other => Model::Custom(other.to_string()),
        })
    }
}

impl Serialize for Model {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let Ok(model) = s.parse::<Model>();
        Ok(model)
    }
}
