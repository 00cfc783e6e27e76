//! Contract for the extraction stage

use super::error::ContractError;
use super::fields::{array, item_path, location, object, optional, path, required, string};
use super::StructuredContract;
use crate::analysis::extraction::{ExtractionResult, ImageAnalysis};
use crate::image::ImageRef;
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Extraction output must describe exactly the images routed into the
/// stage, in the order they were routed.
///
/// A candidate `path` matches the expected image when it is the same handle
/// or its file name; the validated result always carries the expected
/// handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionContract {
    pub expected: Vec<ImageRef>,
}

impl ExtractionContract {
    pub fn new(expected: Vec<ImageRef>) -> Self {
        Self { expected }
    }

    fn validate_image(
        &self,
        value: &Value,
        position: usize,
    ) -> Result<ImageAnalysis, ContractError> {
        let field = item_path("images", position);
        let obj = object(value, &field)?;
        let expected = &self.expected[position];

        let candidate_path = string(required(obj, &field, "path")?, &path(&field, "path"))?;
        if candidate_path != expected.as_str() && candidate_path != expected.file_name() {
            return Err(ContractError::constraint(
                "input_order",
                format!(
                    "images[{}] describes {:?} but {} was routed at that position",
                    position, candidate_path, expected
                ),
            ));
        }

        let timestamp = match optional(obj, "timestamp") {
            Some(v) => {
                let ts_field = path(&field, "timestamp");
                let raw = string(v, &ts_field)?;
                if !is_iso8601(raw) {
                    return Err(ContractError::mismatch(
                        ts_field,
                        "ISO-8601 timestamp",
                        format!("{:?}", raw),
                    ));
                }
                Some(raw.to_string())
            }
            None => None,
        };

        let location = optional(obj, "location")
            .map(|v| location(v, &path(&field, "location")))
            .transpose()?;

        let subjects_field = path(&field, "subjects");
        let subjects = array(required(obj, &field, "subjects")?, &subjects_field)?
            .iter()
            .enumerate()
            .map(|(i, v)| {
                string(v, &item_path(&subjects_field, i)).map(|s| s.trim().to_string())
            })
            .filter(|s| !matches!(s, Ok(s) if s.is_empty()))
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(ImageAnalysis {
            path: expected.as_str().to_string(),
            timestamp,
            location,
            subjects,
        })
    }
}

/// Accepts RFC 3339 date-times, zone-less date-times and plain dates.
pub fn is_iso8601(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

impl StructuredContract for ExtractionContract {
    type Output = ExtractionResult;

    fn name(&self) -> &'static str {
        "extraction"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "images": {
                    "type": "array",
                    "minItems": self.expected.len(),
                    "maxItems": self.expected.len(),
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": { "type": "string" },
                            "timestamp": { "type": ["string", "null"], "format": "date-time" },
                            "location": {
                                "type": ["object", "null"],
                                "properties": {
                                    "lat": { "type": "number", "minimum": -90, "maximum": 90 },
                                    "lng": { "type": "number", "minimum": -180, "maximum": 180 }
                                },
                                "required": ["lat", "lng"]
                            },
                            "subjects": { "type": "array", "items": { "type": "string" } }
                        },
                        "required": ["path", "subjects"]
                    }
                },
                "preliminary_story": { "type": "string" }
            },
            "required": ["images", "preliminary_story"]
        })
    }

    fn validate(&self, candidate: &Value) -> Result<ExtractionResult, ContractError> {
        let obj = object(candidate, "")?;
        let images = array(required(obj, "", "images")?, "images")?;
        let preliminary_story = string(
            required(obj, "", "preliminary_story")?,
            "preliminary_story",
        )?;

        if images.len() != self.expected.len() {
            return Err(ContractError::constraint(
                "image_count",
                format!(
                    "{} images described, {} were routed into extraction",
                    images.len(),
                    self.expected.len()
                ),
            ));
        }

        let images = images
            .iter()
            .enumerate()
            .map(|(i, v)| self.validate_image(v, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ExtractionResult {
            images,
            preliminary_story: preliminary_story.to_string(),
        })
    }
}
