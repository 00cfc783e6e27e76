//! Image batch domain: the caller-supplied photographs a run operates on.

pub mod entities;

pub use entities::{ImageBatch, ImageMetadata, ImageRef, InvalidBatch};
