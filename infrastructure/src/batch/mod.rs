//! Builds an [`ImageBatch`](atlance_domain::ImageBatch) from files on disk.

mod loader;

pub use loader::{BatchLoadError, BatchLoader, IMAGE_EXTENSIONS};
