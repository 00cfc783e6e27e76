//! Application-level configuration.
//!
//! - [`PipelineParams`]: which stages run, how they are composed, and the
//!   limits each one works under

pub mod pipeline_params;

pub use pipeline_params::{PipelineMode, PipelineParams, StageModels};
