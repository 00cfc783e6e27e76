//! Extraction stage result

use super::location::Location;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Metadata and detected subjects for one selected image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub path: String,
    /// ISO-8601 capture time; `None` when unknown
    pub timestamp: Option<String>,
    /// Capture position; `None` when unknown
    pub location: Option<Location>,
    pub subjects: BTreeSet<String>,
}

/// Per-image analysis plus a short narrative of the whole trip.
///
/// `images` has exactly one entry per image routed into extraction, in the
/// order they were routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub images: Vec<ImageAnalysis>,
    pub preliminary_story: String,
}

impl ExtractionResult {
    /// Images whose location is known.
    pub fn located(&self) -> impl Iterator<Item = (&ImageAnalysis, Location)> {
        self.images
            .iter()
            .filter_map(|i| i.location.map(|loc| (i, loc)))
    }
}
