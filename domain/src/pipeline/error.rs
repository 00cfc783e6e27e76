//! Pipeline error taxonomy
//!
//! ```text
//! ContractError ──▶ StageError ──▶ RunError
//! CapabilityError ─┘
//! ```
//!
//! A contract violation never leaves the stage that produced it; it is
//! wrapped into [`StageError::ContractViolation`]. Only a failed mandatory
//! stage, an invalid graph or a cancellation becomes a [`RunError`].

use super::capability::CapabilityKind;
use super::stage_id::StageId;
use crate::contract::ContractError;
use thiserror::Error;

/// A capability call failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("{capability} capability not granted: {detail}")]
    NotGranted {
        capability: CapabilityKind,
        detail: String,
    },

    #[error("{capability} call timed out after {elapsed_ms} ms")]
    Timeout {
        capability: CapabilityKind,
        elapsed_ms: u64,
    },

    #[error("{capability} call returned nothing")]
    Empty { capability: CapabilityKind },

    #[error("{capability} call failed: {message}")]
    Upstream {
        capability: CapabilityKind,
        message: String,
    },

    /// The provider can never serve this request (unknown model, missing
    /// image or tool support).
    #[error("{capability} call unsupported: {message}")]
    Unsupported {
        capability: CapabilityKind,
        message: String,
    },

    #[error("delegation to {stage} failed: {source}")]
    Delegation {
        stage: StageId,
        #[source]
        source: Box<StageError>,
    },

    #[error("{capability} call cancelled")]
    Cancelled { capability: CapabilityKind },
}

impl CapabilityError {
    pub fn upstream(capability: CapabilityKind, message: impl Into<String>) -> Self {
        CapabilityError::Upstream {
            capability,
            message: message.into(),
        }
    }

    pub fn capability(&self) -> CapabilityKind {
        match self {
            CapabilityError::NotGranted { capability, .. }
            | CapabilityError::Timeout { capability, .. }
            | CapabilityError::Empty { capability }
            | CapabilityError::Upstream { capability, .. }
            | CapabilityError::Unsupported { capability, .. }
            | CapabilityError::Cancelled { capability } => *capability,
            CapabilityError::Delegation { .. } => CapabilityKind::Delegate,
        }
    }

    /// Timeouts and upstream errors are transient; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CapabilityError::Timeout { .. } | CapabilityError::Upstream { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            CapabilityError::Cancelled { .. } => true,
            CapabilityError::Delegation { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// A stage could not complete.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("{stage}: output violates the {contract} contract (v{version}): {source}")]
    ContractViolation {
        stage: StageId,
        contract: &'static str,
        version: u32,
        #[source]
        source: ContractError,
    },

    #[error("{stage}: required capability unavailable: {source}")]
    CapabilityUnavailable {
        stage: StageId,
        #[source]
        source: CapabilityError,
    },

    #[error("{stage}: no {missing} result available from earlier stages")]
    UpstreamMissing {
        stage: StageId,
        missing: &'static str,
    },

    #[error("{stage}: cancelled")]
    Cancelled { stage: StageId },
}

impl StageError {
    pub fn stage(&self) -> StageId {
        match self {
            StageError::ContractViolation { stage, .. }
            | StageError::CapabilityUnavailable { stage, .. }
            | StageError::UpstreamMissing { stage, .. }
            | StageError::Cancelled { stage } => *stage,
        }
    }

    /// Convert a capability failure, keeping cancellation distinct.
    pub fn from_capability(stage: StageId, source: CapabilityError) -> Self {
        if source.is_cancelled() {
            StageError::Cancelled { stage }
        } else {
            StageError::CapabilityUnavailable { stage, source }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StageError::Cancelled { .. })
    }
}

/// Terminal failure of a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunError {
    #[error("mandatory stage {stage} failed: {source}")]
    StageFailed {
        stage: StageId,
        #[source]
        source: StageError,
    },

    #[error("run cancelled{}", .at.map(|s| format!(" during {}", s)).unwrap_or_default())]
    Cancelled { at: Option<StageId> },

    #[error("invalid execution graph: {0}")]
    InvalidGraph(String),
}

impl RunError {
    /// Stage at which the run stopped, if any.
    pub fn stage(&self) -> Option<StageId> {
        match self {
            RunError::StageFailed { stage, .. } => Some(*stage),
            RunError::Cancelled { at } => *at,
            RunError::InvalidGraph(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(
            CapabilityError::Timeout {
                capability: CapabilityKind::Search,
                elapsed_ms: 10
            }
            .is_retryable()
        );
        assert!(CapabilityError::upstream(CapabilityKind::Model, "503").is_retryable());
        assert!(
            !CapabilityError::Empty {
                capability: CapabilityKind::Search
            }
            .is_retryable()
        );
        assert!(
            !CapabilityError::Unsupported {
                capability: CapabilityKind::Model,
                message: "model does not accept images".to_string(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_cancellation_survives_delegation() {
        let nested = CapabilityError::Delegation {
            stage: StageId::Question,
            source: Box::new(StageError::Cancelled {
                stage: StageId::Question,
            }),
        };
        assert!(nested.is_cancelled());
        assert_eq!(
            StageError::from_capability(StageId::Root, nested),
            StageError::Cancelled {
                stage: StageId::Root
            }
        );
    }

    #[test]
    fn test_display_names_field() {
        let err = StageError::ContractViolation {
            stage: StageId::Selection,
            contract: "selection",
            version: 1,
            source: ContractError::constraint("unique_indices", "index 2 selected more than once"),
        };
        let text = err.to_string();
        assert!(text.contains("selection contract (v1)"));
        assert!(text.contains("duplicate_remover"));
        assert!(text.contains("unique_indices"));
    }

    #[test]
    fn test_run_error_display() {
        assert_eq!(
            RunError::Cancelled {
                at: Some(StageId::Question)
            }
            .to_string(),
            "run cancelled during question_asker"
        );
        assert_eq!(RunError::Cancelled { at: None }.to_string(), "run cancelled");
    }
}
