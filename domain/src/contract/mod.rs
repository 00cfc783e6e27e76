//! Structured output contracts.
//!
//! A contract is pure data describing the exact shape a stage's model output
//! must have. [`StructuredContract::validate`] turns a candidate JSON value
//! into the typed result or a [`ContractError`] naming the offending field or
//! constraint. Validation is synchronous and deterministic.
//!
//! | Contract | Output | Stage |
//! |----------|--------|-------|
//! | [`SelectionContract`] | [`SelectionResult`](crate::analysis::SelectionResult) | duplicate_remover |
//! | [`LandmarkCandidatesContract`] | `Vec<LandmarkCandidate>` | landmark_search (first pass) |
//! | [`LandmarkContract`] | [`LandmarkReport`](crate::analysis::LandmarkReport) | landmark_search |
//! | [`ExtractionContract`] | [`ExtractionResult`](crate::analysis::ExtractionResult) | data_extractor |

pub mod error;
pub mod extraction;
mod fields;
pub mod landmark;
pub mod selection;

pub use error::ContractError;
pub use extraction::ExtractionContract;
pub use landmark::{LandmarkCandidatesContract, LandmarkContract};
pub use selection::SelectionContract;

use serde_json::Value;

/// Schema and validation rules for one stage's output.
pub trait StructuredContract: Send + Sync {
    type Output;

    /// Stable contract name (used in prompts, logs and traces)
    fn name(&self) -> &'static str;

    /// Contract version; bumped whenever the accepted shape changes
    fn version(&self) -> u32 {
        1
    }

    /// JSON schema handed to the model provider as the requested output shape
    fn schema(&self) -> Value;

    /// Validate a candidate value, producing the typed output
    fn validate(&self, candidate: &Value) -> Result<Self::Output, ContractError>;

    /// Extract JSON from raw model text, then validate it
    fn validate_text(&self, text: &str) -> Result<Self::Output, ContractError> {
        let candidate = extract_json(text)?;
        self.validate(&candidate)
    }
}

/// Pull a JSON object out of model text.
///
/// Accepts, in order: the whole text as JSON, the first ` ```json ` (or bare
/// ` ``` `) fenced block, or the first balanced `{...}` span.
pub fn extract_json(text: &str) -> Result<Value, ContractError> {
    let trimmed = text.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(block) = fenced_block(trimmed)
        && let Ok(value) = serde_json::from_str::<Value>(block)
    {
        return Ok(value);
    }

    if let Some(span) = balanced_object(trimmed)
        && let Ok(value) = serde_json::from_str::<Value>(span)
    {
        return Ok(value);
    }

    Err(ContractError::mismatch(
        "$",
        "JSON object",
        fields::describe(&Value::String(trimmed.to_string())),
    ))
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip the info string (e.g. "json") up to the end of the line
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_plain_json() {
        let v = extract_json(r#"  {"a": 1} "#).unwrap();
        assert_eq!(v, json!({"a": 1}));
    }

    #[test]
    fn test_extract_fenced_json() {
        let text = "Here you go:\n```json\n{\"selected_indices\": [1, 2]}\n```\nDone.";
        let v = extract_json(text).unwrap();
        assert_eq!(v, json!({"selected_indices": [1, 2]}));
    }

    #[test]
    fn test_extract_embedded_object_with_braces_in_strings() {
        let text = r#"Result: {"reasons": "a {tricky} one", "n": {"x": 1}} trailing"#;
        let v = extract_json(text).unwrap();
        assert_eq!(v["reasons"], "a {tricky} one");
        assert_eq!(v["n"]["x"], 1);
    }

    #[test]
    fn test_extract_rejects_prose() {
        let err = extract_json("I could not decide.").unwrap_err();
        assert!(matches!(err, ContractError::TypeMismatch { .. }));
        assert_eq!(err.location(), "$");
    }
}
