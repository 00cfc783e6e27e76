//! Analysis results produced by the pipeline stages.
//!
//! - [`selection::SelectionResult`]: the interesting, de-duplicated subset
//! - [`landmark::LandmarkReport`]: verified place enrichment
//! - [`extraction::ExtractionResult`]: per-image metadata, subjects and a preliminary story
//! - [`interview::Interview`]: follow-up answers folded into a refined story

pub mod extraction;
pub mod interview;
pub mod landmark;
pub mod location;
pub mod selection;

pub use extraction::{ExtractionResult, ImageAnalysis};
pub use interview::Interview;
pub use landmark::{FindingSubject, LandmarkCandidate, LandmarkFinding, LandmarkReport};
pub use location::Location;
pub use selection::SelectionResult;
