//! Run trace
//!
//! The trace is required output of every run, successful or not: it tells
//! the caller which stages ran, which optional stages were skipped and why,
//! and which stage failed.

use super::stage_id::StageId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TraceStatus {
    Succeeded,
    /// Optional stage failed or was disabled; the run went on without it
    Skipped { reason: String },
    /// The stage failed. Fatal in sequential mode; in delegating mode the
    /// failure was reported back to the root.
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub stage: StageId,
    /// Delegation call id; `None` for sequential stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(flatten)]
    pub status: TraceStatus,
    pub elapsed_ms: u64,
}

/// Ordered record of stage invocations in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTrace {
    entries: Vec<TraceEntry>,
}

impl RunTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Append all entries of another trace (used when a replay continues a
    /// failed run).
    pub fn extend(&mut self, other: RunTrace) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Skipped stages with the reason each was skipped.
    pub fn skipped(&self) -> impl Iterator<Item = (StageId, &str)> {
        self.entries.iter().filter_map(|e| match &e.status {
            TraceStatus::Skipped { reason } => Some((e.stage, reason.as_str())),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (StageId, &str)> {
        self.entries.iter().filter_map(|e| match &e.status {
            TraceStatus::Failed { reason } => Some((e.stage, reason.as_str())),
            _ => None,
        })
    }

    /// Number of successful invocations of `stage`.
    pub fn succeeded_count(&self, stage: StageId) -> usize {
        self.entries
            .iter()
            .filter(|e| e.stage == stage && e.status == TraceStatus::Succeeded)
            .count()
    }

    pub fn invocation_count(&self, stage: StageId) -> usize {
        self.entries.iter().filter(|e| e.stage == stage).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(stage: StageId, status: TraceStatus) -> TraceEntry {
        TraceEntry {
            stage,
            call_id: None,
            status,
            elapsed_ms: 5,
        }
    }

    #[test]
    fn test_queries() {
        let mut trace = RunTrace::new();
        trace.record(entry(StageId::Selection, TraceStatus::Succeeded));
        trace.record(entry(
            StageId::Landmark,
            TraceStatus::Skipped {
                reason: "search unavailable".to_string(),
            },
        ));
        trace.record(entry(StageId::Extraction, TraceStatus::Succeeded));

        assert_eq!(
            trace.skipped().collect::<Vec<_>>(),
            vec![(StageId::Landmark, "search unavailable")]
        );
        assert_eq!(trace.failed().count(), 0);
        assert_eq!(trace.succeeded_count(StageId::Extraction), 1);
        assert_eq!(trace.invocation_count(StageId::Landmark), 1);
    }

    #[test]
    fn test_entry_serializes_flat() {
        let json = serde_json::to_value(entry(
            StageId::Landmark,
            TraceStatus::Skipped {
                reason: "disabled".to_string(),
            },
        ))
        .unwrap();
        assert_eq!(json["stage"], "landmark_search");
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "disabled");
        assert!(json.get("call_id").is_none());
    }
}
