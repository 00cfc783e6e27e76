//! Prompt domain
//!
//! Short functional prompts for each stage of the pipeline.

mod template;

pub use template::{NO_MORE_QUESTIONS, StagePromptTemplate};
