//! Domain layer for atlance
//!
//! This crate contains the data model, structured output contracts and run
//! state of the photo curation pipeline. It has no dependencies on
//! infrastructure or presentation concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Contracts
//!
//! Every model-backed stage that produces structured output is bound to a
//! [`StructuredContract`]. Candidate output is validated before it enters the
//! run; a violation names the offending field or constraint.
//!
//! ## Capability grants
//!
//! A stage declares the [`CapabilityGrant`] it needs (search, delegation to
//! named stages) when it is built. Grants are immutable and are the only way
//! one stage can reach another.
//!
//! ## Runs
//!
//! A run moves through [`RunState`] and records a [`RunTrace`]. Results live
//! in a [`RunContext`] that stages read but never mutate.

pub mod analysis;
pub mod contract;
pub mod core;
pub mod image;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use analysis::{
    ExtractionResult, FindingSubject, ImageAnalysis, Interview, LandmarkCandidate,
    LandmarkFinding, LandmarkReport, Location, SelectionResult,
};
pub use contract::{
    ContractError, ExtractionContract, LandmarkCandidatesContract, LandmarkContract,
    SelectionContract, StructuredContract, extract_json,
};
pub use core::{
    model::Model,
    question::{Exchange, Question, QuestionState},
};
pub use image::{ImageBatch, ImageMetadata, ImageRef, InvalidBatch};
pub use pipeline::{
    CapabilityError, CapabilityGrant, CapabilityKind, ContextEntry, InvalidTransition, RunContext,
    RunError, RunPosition, RunState, RunTrace, StageError, StageId, StageOutput, TraceEntry,
    TraceStatus, UnknownStage,
};
pub use prompt::{NO_MORE_QUESTIONS, StagePromptTemplate};
pub use session::response::{ContentBlock, LlmResponse, StopReason};
pub use tool::{ToolCall, ToolDefinition, ToolParameter};
