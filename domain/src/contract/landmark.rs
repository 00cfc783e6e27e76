//! Contracts for the landmark stage.
//!
//! The stage talks to the model twice: first to spot landmark candidates and
//! the queries that would verify them, then to compose findings from the
//! search snippets.

use super::error::ContractError;
use super::fields::{
    array, index, item_path, location, object, optional, optional_string, path, required, string,
};
use super::StructuredContract;
use crate::analysis::landmark::{FindingSubject, LandmarkCandidate, LandmarkFinding, LandmarkReport};
use serde_json::{Value, json};

fn image_index_in_range(
    value: &Value,
    field: &str,
    image_count: usize,
) -> Result<usize, ContractError> {
    let i = index(value, field)?;
    if i >= image_count {
        return Err(ContractError::constraint(
            "index_in_range",
            format!("{} = {} is outside a batch of {} images", field, i, image_count),
        ));
    }
    Ok(i)
}

/// Candidate landmarks proposed by the model before any search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkCandidatesContract {
    pub image_count: usize,
}

impl LandmarkCandidatesContract {
    pub fn new(image_count: usize) -> Self {
        Self { image_count }
    }
}

impl StructuredContract for LandmarkCandidatesContract {
    type Output = Vec<LandmarkCandidate>;

    fn name(&self) -> &'static str {
        "landmark_candidates"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "candidates": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "image_index": {
                                "type": "integer",
                                "minimum": 0,
                                "maximum": self.image_count.saturating_sub(1)
                            },
                            "description": { "type": "string" },
                            "search_query": { "type": "string" }
                        },
                        "required": ["image_index", "description", "search_query"]
                    }
                }
            },
            "required": ["candidates"]
        })
    }

    fn validate(&self, candidate: &Value) -> Result<Vec<LandmarkCandidate>, ContractError> {
        let obj = object(candidate, "")?;
        let raw = array(required(obj, "", "candidates")?, "candidates")?;

        raw.iter()
            .enumerate()
            .map(|(i, v)| {
                let field = item_path("candidates", i);
                let item = object(v, &field)?;
                let image_index = image_index_in_range(
                    required(item, &field, "image_index")?,
                    &path(&field, "image_index"),
                    self.image_count,
                )?;
                let description =
                    string(required(item, &field, "description")?, &path(&field, "description"))?;
                let query_field = path(&field, "search_query");
                let search_query = string(required(item, &field, "search_query")?, &query_field)?;
                if search_query.trim().is_empty() {
                    return Err(ContractError::mismatch(
                        query_field,
                        "non-empty search query",
                        "empty string",
                    ));
                }
                Ok(LandmarkCandidate {
                    image_index,
                    description: description.to_string(),
                    search_query: search_query.trim().to_string(),
                })
            })
            .collect()
    }
}

/// Verified landmark findings composed from search snippets.
///
/// Every finding must be keyed to an image of the batch or to a location.
/// `verified` is never taken from the model; the stage sets it from the
/// search results it actually received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkContract {
    pub image_count: usize,
}

impl LandmarkContract {
    pub fn new(image_count: usize) -> Self {
        Self { image_count }
    }

    fn validate_finding(&self, value: &Value, position: usize) -> Result<LandmarkFinding, ContractError> {
        let field = item_path("findings", position);
        let obj = object(value, &field)?;

        let image_index = optional(obj, "image_index")
            .map(|v| image_index_in_range(v, &path(&field, "image_index"), self.image_count))
            .transpose()?;
        let place = optional(obj, "location")
            .map(|v| location(v, &path(&field, "location")))
            .transpose()?;

        let subject = match (image_index, place) {
            (Some(index), _) => FindingSubject::Image { index },
            (None, Some(location)) => FindingSubject::Location { location },
            (None, None) => {
                return Err(ContractError::constraint(
                    "finding_subject",
                    format!("{} names neither an image_index nor a location", field),
                ));
            }
        };

        let text = string(required(obj, &field, "text")?, &path(&field, "text"))?;

        Ok(LandmarkFinding {
            subject,
            text: text.to_string(),
            name: optional_string(obj, &field, "name")?,
            region: optional_string(obj, &field, "region")?,
            significance: optional_string(obj, &field, "significance")?,
            verified: false,
        })
    }
}

impl StructuredContract for LandmarkContract {
    type Output = LandmarkReport;

    fn name(&self) -> &'static str {
        "landmark"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "summary": { "type": "string" },
                "findings": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "image_index": {
                                "type": ["integer", "null"],
                                "minimum": 0,
                                "maximum": self.image_count.saturating_sub(1)
                            },
                            "location": {
                                "type": ["object", "null"],
                                "properties": {
                                    "lat": { "type": "number" },
                                    "lng": { "type": "number" }
                                }
                            },
                            "text": { "type": "string" },
                            "name": { "type": ["string", "null"] },
                            "region": { "type": ["string", "null"] },
                            "significance": { "type": ["string", "null"] }
                        },
                        "required": ["text"]
                    }
                }
            },
            "required": ["summary", "findings"]
        })
    }

    fn validate(&self, candidate: &Value) -> Result<LandmarkReport, ContractError> {
        let obj = object(candidate, "")?;
        let summary = string(required(obj, "", "summary")?, "summary")?;
        let findings = array(required(obj, "", "findings")?, "findings")?
            .iter()
            .enumerate()
            .map(|(i, v)| self.validate_finding(v, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LandmarkReport {
            summary: summary.to_string(),
            findings,
        })
    }
}
