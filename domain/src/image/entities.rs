//! Image batch entities

use crate::analysis::location::Location;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Reference to one photograph (Value Object)
///
/// Supplied by the caller and never created by the pipeline. The handle is
/// usually a filesystem path but may be any identifier the model provider
/// understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path component, or the whole handle when it has none.
    pub fn file_name(&self) -> &str {
        self.0.rsplit(['/', '\\']).next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied metadata for one image.
///
/// Every field is optional and stays `None` when unknown; the pipeline never
/// substitutes defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageMetadata {
    /// Capture time as an ISO-8601 string, if pre-extracted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// GPS position, if pre-extracted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Raw EXIF tags as already decoded by the caller
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub exif: BTreeMap<String, String>,
}

impl ImageMetadata {
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none() && self.location.is_none() && self.exif.is_empty()
    }
}

/// Errors raised when assembling a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidBatch {
    #[error("image batch is empty")]
    Empty,

    #[error("image {0} appears more than once in the batch")]
    Duplicate(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct BatchEntry {
    image: ImageRef,
    #[serde(default)]
    metadata: ImageMetadata,
}

/// Ordered batch of photographs for one run (Entity)
///
/// Position `i` in the batch is the 0-based index every contract refers to.
/// Cloning is cheap; entries are shared immutably.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    entries: Arc<[BatchEntry]>,
}

impl ImageBatch {
    /// Build a batch from images and their metadata, preserving order.
    pub fn new(
        images: impl IntoIterator<Item = (ImageRef, ImageMetadata)>,
    ) -> Result<Self, InvalidBatch> {
        let entries: Vec<BatchEntry> = images
            .into_iter()
            .map(|(image, metadata)| BatchEntry { image, metadata })
            .collect();

        if entries.is_empty() {
            return Err(InvalidBatch::Empty);
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.image.as_str()) {
                return Err(InvalidBatch::Duplicate(entry.image.to_string()));
            }
        }

        Ok(Self {
            entries: entries.into(),
        })
    }

    /// Build a batch of images without metadata.
    pub fn from_refs(images: impl IntoIterator<Item = ImageRef>) -> Result<Self, InvalidBatch> {
        Self::new(images.into_iter().map(|i| (i, ImageMetadata::default())))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn image(&self, index: usize) -> Option<&ImageRef> {
        self.entries.get(index).map(|e| &e.image)
    }

    pub fn metadata(&self, index: usize) -> Option<&ImageMetadata> {
        self.entries.get(index).map(|e| &e.metadata)
    }

    /// Iterate `(index, image, metadata)` in batch order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ImageRef, &ImageMetadata)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, &e.image, &e.metadata))
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRef> {
        self.entries.iter().map(|e| &e.image)
    }

    /// All indices of the batch, ascending.
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.len()).collect()
    }

    /// Image refs for the given indices, in the given order. Unknown
    /// indices are skipped.
    pub fn select(&self, indices: &[usize]) -> Vec<ImageRef> {
        indices
            .iter()
            .filter_map(|&i| self.image(i).cloned())
            .collect()
    }
}
