//! Landmark stage results

use super::location::Location;
use serde::{Deserialize, Serialize};

/// What a landmark finding describes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingSubject {
    /// An image of the batch (0-based index)
    Image { index: usize },
    /// A place, independent of any single image
    Location { location: Location },
}

/// A possible landmark spotted in one image, with the query used to verify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkCandidate {
    pub image_index: usize,
    pub description: String,
    pub search_query: String,
}

/// Enrichment text for one image or place.
///
/// Consumed by the extraction stage only; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFinding {
    pub subject: FindingSubject,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<String>,
    /// Whether at least one search snippet backed this finding
    #[serde(default)]
    pub verified: bool,
}

/// All landmark enrichment for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkReport {
    pub summary: String,
    pub findings: Vec<LandmarkFinding>,
}

impl LandmarkReport {
    /// Findings keyed to the given image index.
    pub fn for_image(&self, index: usize) -> impl Iterator<Item = &LandmarkFinding> {
        self.findings
            .iter()
            .filter(move |f| matches!(f.subject, FindingSubject::Image { index: i } if i == index))
    }

    pub fn verified_count(&self) -> usize {
        self.findings.iter().filter(|f| f.verified).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(subject: FindingSubject) -> LandmarkFinding {
        LandmarkFinding {
            subject,
            text: "Wrought-iron lattice tower".to_string(),
            name: Some("Eiffel Tower".to_string()),
            region: None,
            significance: None,
            verified: true,
        }
    }

    #[test]
    fn test_for_image_filters_by_index() {
        let report = LandmarkReport {
            summary: String::new(),
            findings: vec![
                finding(FindingSubject::Image { index: 2 }),
                finding(FindingSubject::Location {
                    location: Location { lat: 48.8584, lng: 2.2945 },
                }),
                finding(FindingSubject::Image { index: 5 }),
            ],
        };
        assert_eq!(report.for_image(2).count(), 1);
        assert_eq!(report.for_image(3).count(), 0);
        assert_eq!(report.verified_count(), 3);
    }
}
