//! Pipeline domain: stage names, capability grants, stage outputs, the run
//! context, the run state machine, the trace and the error taxonomy.

pub mod capability;
pub mod context;
pub mod error;
pub mod output;
pub mod stage_id;
pub mod state;
pub mod trace;

pub use capability::{CapabilityGrant, CapabilityKind};
pub use context::{ContextEntry, RunContext};
pub use error::{CapabilityError, RunError, StageError};
pub use output::StageOutput;
pub use stage_id::{StageId, UnknownStage};
pub use state::{InvalidTransition, RunPosition, RunState};
pub use trace::{RunTrace, TraceEntry, TraceStatus};
