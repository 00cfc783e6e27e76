//! Tool domain entities

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Definition of a tool offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "duplicate_remover")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameter specifications
    pub parameters: Vec<ToolParameter>,
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// JSON schema type (e.g., "string", "integer", "array")
    pub param_type: String,
    /// Item type when `param_type` is "array"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// JSON schema of the parameters object, as native tool APIs expect it.
    pub fn input_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        for p in &self.parameters {
            let mut prop = serde_json::json!({
                "type": p.param_type,
                "description": p.description,
            });
            if let Some(item_type) = &p.item_type {
                prop["items"] = serde_json::json!({ "type": item_type });
            }
            properties.insert(p.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
            item_type: None,
        }
    }

    pub fn array_of(mut self, item_type: impl Into<String>) -> Self {
        self.param_type = "array".to_string();
        self.item_type = Some(item_type.into());
        self
    }
}

/// A call to a tool with arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to call
    pub tool_name: String,
    /// Arguments passed to the tool
    pub arguments: HashMap<String, serde_json::Value>,
    /// Provider-assigned call id, used to pair the result with this call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_id: Option<String>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
            native_id: None,
        }
    }

    /// Build a call from a native tool-use block.
    pub fn from_native(
        id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            native_id: Some(id.into()),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get an array of non-negative integers, skipping anything else
    pub fn get_indices(&self, key: &str) -> Option<Vec<usize>> {
        self.arguments.get(key).and_then(|v| v.as_array()).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_u64())
                .filter_map(|n| usize::try_from(n).ok())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_definition_schema() {
        let tool = ToolDefinition::new("data_extractor", "Extract metadata")
            .with_parameter(ToolParameter::new("indices", "Images to analyse", false).array_of("integer"))
            .with_parameter(ToolParameter::new("note", "Extra guidance", true));

        let schema = tool.input_schema();
        assert_eq!(schema["properties"]["indices"]["type"], "array");
        assert_eq!(schema["properties"]["indices"]["items"]["type"], "integer");
        assert_eq!(schema["required"], json!(["note"]));
    }

    #[test]
    fn test_tool_call_arguments() {
        let call = ToolCall::new("data_extractor")
            .with_arg("note", "focus on food")
            .with_arg("indices", json!([0, 4, "x", -1, 7]));

        assert_eq!(call.get_string("note"), Some("focus on food"));
        assert_eq!(call.get_indices("indices"), Some(vec![0, 4, 7]));
        assert_eq!(call.get_indices("missing"), None);
        assert_eq!(call.native_id, None);
    }

    #[test]
    fn test_from_native_keeps_id() {
        let call = ToolCall::from_native("call_1", "landmark_search", HashMap::new());
        assert_eq!(call.native_id.as_deref(), Some("call_1"));
        assert_eq!(call.tool_name, "landmark_search");
    }
}
