//! Port for structured run logging.
//!
//! Defines the [`RunLogger`] trait for recording run events (stage
//! boundaries, delegations, the final state) to a structured log.
//!
//! This is separate from `tracing`-based diagnostics: tracing handles
//! human-readable messages, while this port captures the run transcript in
//! a machine-readable format (JSONL).

use atlance_domain::{RunState, StageId, TraceStatus};
use serde_json::{Value, json};

/// A structured run event.
///
/// Each event has a type string and a JSON payload; the adapter adds the
/// timestamp when it writes the record.
#[derive(Debug, Clone, PartialEq)]
pub struct RunEvent {
    /// Event type identifier (e.g., "stage_started", "delegation")
    pub event_type: &'static str,
    /// JSON payload with event-specific data
    pub payload: Value,
}

impl RunEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    pub fn run_started(run_id: &str, mode: &str, image_count: usize) -> Self {
        Self::new(
            "run_started",
            json!({ "run_id": run_id, "mode": mode, "images": image_count }),
        )
    }

    pub fn stage_started(run_id: &str, stage: StageId) -> Self {
        Self::new(
            "stage_started",
            json!({ "run_id": run_id, "stage": stage.as_str() }),
        )
    }

    pub fn stage_completed(run_id: &str, stage: StageId, summary: &str, elapsed_ms: u64) -> Self {
        Self::new(
            "stage_completed",
            json!({
                "run_id": run_id,
                "stage": stage.as_str(),
                "summary": summary,
                "elapsed_ms": elapsed_ms,
            }),
        )
    }

    pub fn stage_skipped(run_id: &str, stage: StageId, reason: &str) -> Self {
        Self::new(
            "stage_skipped",
            json!({ "run_id": run_id, "stage": stage.as_str(), "reason": reason }),
        )
    }

    pub fn stage_failed(run_id: &str, stage: StageId, reason: &str) -> Self {
        Self::new(
            "stage_failed",
            json!({ "run_id": run_id, "stage": stage.as_str(), "reason": reason }),
        )
    }

    pub fn delegation(run_id: &str, call_id: &str, stage: StageId, status: &TraceStatus) -> Self {
        Self::new(
            "delegation",
            json!({
                "run_id": run_id,
                "call_id": call_id,
                "stage": stage.as_str(),
                "result": status,
            }),
        )
    }

    pub fn run_finished(run_id: &str, state: &RunState) -> Self {
        Self::new(
            "run_finished",
            json!({ "run_id": run_id, "state": state.name(), "detail": state.to_string() }),
        )
    }
}

/// Port for logging run events to a structured log.
///
/// The `log` method is synchronous and non-fallible so logging can never
/// disrupt a run; adapters swallow their own write failures.
pub trait RunLogger: Send + Sync {
    fn log(&self, event: RunEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoRunLogger;

impl RunLogger for NoRunLogger {
    fn log(&self, _event: RunEvent) {}
}
