//! Stage identifiers

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of a pipeline stage (Value Object)
///
/// The string forms double as tool names in delegating-root mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageId {
    #[serde(rename = "duplicate_remover")]
    Selection,
    #[serde(rename = "landmark_search")]
    Landmark,
    #[serde(rename = "data_extractor")]
    Extraction,
    #[serde(rename = "question_asker")]
    Question,
    #[serde(rename = "root")]
    Root,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown stage: {0}")]
pub struct UnknownStage(pub String);

impl StageId {
    pub const ALL: [StageId; 5] = [
        StageId::Selection,
        StageId::Landmark,
        StageId::Extraction,
        StageId::Question,
        StageId::Root,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Selection => "duplicate_remover",
            StageId::Landmark => "landmark_search",
            StageId::Extraction => "data_extractor",
            StageId::Question => "question_asker",
            StageId::Root => "root",
        }
    }

    /// One-line description, used for tool definitions and help text.
    pub fn description(&self) -> &'static str {
        match self {
            StageId::Selection => {
                "Removes near-duplicates and selects the most interesting photos of the batch"
            }
            StageId::Landmark => {
                "Identifies landmarks in the selected photos and verifies them with web search"
            }
            StageId::Extraction => {
                "Extracts timestamp, location and subjects per photo and drafts a short story"
            }
            StageId::Question => {
                "Asks the traveller follow-up questions, one at a time, and refines the story"
            }
            StageId::Root => "Coordinates the other stages to produce a travel blog draft",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StageId {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duplicate_remover" | "selection" => Ok(StageId::Selection),
            "landmark_search" | "landmark" | "landmarks" => Ok(StageId::Landmark),
            "data_extractor" | "extraction" => Ok(StageId::Extraction),
            "question_asker" | "questions" | "question" => Ok(StageId::Question),
            "root" => Ok(StageId::Root),
            other => Err(UnknownStage(other.to_string())),
        }
    }
}
