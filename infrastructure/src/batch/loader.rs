//! Local file system batch loader
//!
//! Turns command-line paths into an ordered [`ImageBatch`]:
//!
//! - files are taken as given, in argument order
//! - directories contribute their image files (by extension), sorted by name,
//!   without recursing
//! - an optional metadata sidecar (JSON object keyed by file name) supplies
//!   pre-extracted timestamps, GPS positions and EXIF tags
//!
//! ```json
//! {
//!   "IMG_0412.jpg": { "timestamp": "2026-04-12T18:03:00+02:00",
//!                     "location": { "lat": 48.8584, "lng": 2.2945 } }
//! }
//! ```

use atlance_domain::{ImageBatch, ImageMetadata, ImageRef, InvalidBatch};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// File extensions treated as photos when expanding a directory.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "heic", "heif"];

#[derive(Error, Debug)]
pub enum BatchLoadError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid metadata file {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    #[error(transparent)]
    Batch(#[from] InvalidBatch),
}

impl BatchLoadError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchLoader {
    metadata: HashMap<String, ImageMetadata>,
}

impl BatchLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a metadata sidecar.
    pub fn with_metadata_file(mut self, path: &Path) -> Result<Self, BatchLoadError> {
        let content = fs::read_to_string(path).map_err(|e| BatchLoadError::io(path, e))?;
        self.metadata =
            serde_json::from_str(&content).map_err(|e| BatchLoadError::Metadata {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!(
            "Loaded metadata for {} images from {}",
            self.metadata.len(),
            path.display()
        );
        Ok(self)
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    }

    fn expand_dir(dir: &Path) -> Result<Vec<PathBuf>, BatchLoadError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| BatchLoadError::io(dir, e))? {
            let path = entry.map_err(|e| BatchLoadError::io(dir, e))?.path();
            if path.is_file() && Self::is_image(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Resolve `paths` into files, in batch order.
    pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, BatchLoadError> {
        let mut files = Vec::new();
        for path in paths {
            let meta = fs::metadata(path).map_err(|e| BatchLoadError::io(path, e))?;
            if meta.is_dir() {
                let found = Self::expand_dir(path)?;
                if found.is_empty() {
                    warn!("No images found in {}", path.display());
                }
                files.extend(found);
            } else {
                files.push(path.clone());
            }
        }
        Ok(files)
    }

    /// Build the batch. Duplicate paths and an empty result are rejected.
    pub fn load(&self, paths: &[PathBuf]) -> Result<ImageBatch, BatchLoadError> {
        let files = Self::collect_files(paths)?;

        let entries: Vec<(ImageRef, ImageMetadata)> = files
            .iter()
            .map(|path| {
                let image = ImageRef::new(path.to_string_lossy());
                let metadata = self
                    .metadata
                    .get(image.file_name())
                    .cloned()
                    .unwrap_or_default();
                (image, metadata)
            })
            .collect();

        let with_metadata = entries.iter().filter(|(_, m)| !m.is_empty()).count();
        debug!(
            "Batch of {} images ({} with metadata)",
            entries.len(),
            with_metadata
        );

        Ok(ImageBatch::new(entries)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlance_domain::Location;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"\xFF\xD8\xFF").unwrap();
        path
    }

    #[test]
    fn test_directory_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "IMG_0003.JPG");
        touch(dir.path(), "IMG_0001.jpg");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "IMG_0002.png");
        fs::create_dir(dir.path().join("raw.jpg")).unwrap();

        let batch = BatchLoader::new()
            .load(&[dir.path().to_path_buf()])
            .unwrap();

        let names: Vec<_> = batch.images().map(|i| i.file_name().to_string()).collect();
        assert_eq!(names, ["IMG_0001.jpg", "IMG_0002.png", "IMG_0003.JPG"]);
    }

    #[test]
    fn test_explicit_files_keep_argument_order() {
        let dir = tempfile::tempdir().unwrap();
        let b = touch(dir.path(), "b.jpg");
        let a = touch(dir.path(), "a.jpg");

        let batch = BatchLoader::new().load(&[b, a]).unwrap();
        assert_eq!(batch.image(0).unwrap().file_name(), "b.jpg");
        assert_eq!(batch.image(1).unwrap().file_name(), "a.jpg");
    }

    #[test]
    fn test_metadata_matched_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "IMG_0412.jpg");
        touch(dir.path(), "IMG_0413.jpg");
        let sidecar = dir.path().join("metadata.json");
        fs::write(
            &sidecar,
            r#"{ "IMG_0412.jpg": { "timestamp": "2026-04-12T18:03:00+02:00",
                                  "location": { "lat": 48.8584, "lng": 2.2945 } } }"#,
        )
        .unwrap();

        let batch = BatchLoader::new()
            .with_metadata_file(&sidecar)
            .unwrap()
            .load(&[dir.path().to_path_buf()])
            .unwrap();

        let first = batch.metadata(0).unwrap();
        assert_eq!(first.location, Location::try_new(48.8584, 2.2945));
        assert!(first.timestamp.is_some());
        assert!(batch.metadata(1).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_sidecar_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sidecar = dir.path().join("metadata.json");
        fs::write(&sidecar, "[1, 2]").unwrap();

        let err = BatchLoader::new().with_metadata_file(&sidecar).unwrap_err();
        assert!(matches!(err, BatchLoadError::Metadata { .. }));
    }

    #[test]
    fn test_empty_and_duplicate_batches_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = BatchLoader::new()
            .load(&[dir.path().to_path_buf()])
            .unwrap_err();
        assert!(matches!(err, BatchLoadError::Batch(InvalidBatch::Empty)));

        let a = touch(dir.path(), "a.jpg");
        let err = BatchLoader::new().load(&[a.clone(), a]).unwrap_err();
        assert!(matches!(err, BatchLoadError::Batch(InvalidBatch::Duplicate(_))));
    }

    #[test]
    fn test_missing_path_names_it() {
        let err = BatchLoader::new()
            .load(&[PathBuf::from("/no/such/trip")])
            .unwrap_err();
        assert!(err.to_string().starts_with("/no/such/trip"));
    }
}
