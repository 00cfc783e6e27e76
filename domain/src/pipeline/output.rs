//! Stage outputs

use crate::analysis::{ExtractionResult, Interview, LandmarkReport, SelectionResult};
use crate::core::string::{single_line, truncate};
use serde::{Deserialize, Serialize};

/// Result of one stage invocation.
///
/// The first three variants were validated by a contract. `Interview` and
/// `Text` come from stages without a contract and are surfaced as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StageOutput {
    Selection(SelectionResult),
    Landmarks(LandmarkReport),
    Extraction(ExtractionResult),
    Interview(Interview),
    Text(String),
}

impl StageOutput {
    /// Whether this output passed a structured contract.
    pub fn is_contract_bearing(&self) -> bool {
        matches!(
            self,
            StageOutput::Selection(_) | StageOutput::Landmarks(_) | StageOutput::Extraction(_)
        )
    }

    /// Free text for the end user, if this output carries any.
    pub fn narrative(&self) -> Option<&str> {
        match self {
            StageOutput::Interview(interview) => Some(&interview.story),
            StageOutput::Text(text) => Some(text),
            StageOutput::Extraction(result) => Some(&result.preliminary_story),
            _ => None,
        }
    }

    /// One-line summary for logs, traces and tool results.
    pub fn summary(&self) -> String {
        match self {
            StageOutput::Selection(s) => format!(
                "selected {:?}: {}",
                s.selected_indices,
                truncate(&single_line(&s.reasons), 80)
            ),
            StageOutput::Landmarks(r) => format!(
                "{} findings ({} verified)",
                r.findings.len(),
                r.verified_count()
            ),
            StageOutput::Extraction(e) => format!(
                "{} images analysed: {}",
                e.images.len(),
                truncate(&single_line(&e.preliminary_story), 80)
            ),
            StageOutput::Interview(i) => format!("{} questions answered", i.exchanges.len()),
            StageOutput::Text(t) => truncate(&single_line(t), 100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_bearing() {
        assert!(StageOutput::Selection(SelectionResult::new(vec![1], "x")).is_contract_bearing());
        assert!(!StageOutput::Text("story".to_string()).is_contract_bearing());
        assert!(
            !StageOutput::Interview(Interview {
                story: "s".to_string(),
                exchanges: vec![]
            })
            .is_contract_bearing()
        );
    }

    #[test]
    fn test_serde_shape() {
        let output = StageOutput::Selection(SelectionResult::new(vec![4, 0], "two views"));
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["kind"], "selection");
        assert_eq!(json["value"]["selected_indices"], serde_json::json!([0, 4]));
    }
}
