//! Capability grants
//!
//! A grant is the closed set of actions a stage may take beyond its own
//! model call. It is fixed when the stage is constructed; the coordinator
//! hands a stage exactly the capabilities its grant names.

use super::stage_id::StageId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of external action a stage can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// The stage's own model call
    Model,
    /// Web search
    Search,
    /// Invoking another stage
    Delegate,
    /// Waiting for the end user's answer
    Answer,
}

impl CapabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Model => "model",
            CapabilityKind::Search => "search",
            CapabilityKind::Delegate => "delegate",
            CapabilityKind::Answer => "answer",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable capability set declared by a stage.
///
/// A stage whose grant has no delegates can be invoked but can never invoke
/// its parent or its peers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityGrant {
    search: bool,
    answer: bool,
    delegates: BTreeSet<StageId>,
}

impl CapabilityGrant {
    /// No capabilities beyond the stage's own model call.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn search_only() -> Self {
        Self {
            search: true,
            ..Self::default()
        }
    }

    /// May wait for the end user's answers.
    pub fn interactive() -> Self {
        Self {
            answer: true,
            ..Self::default()
        }
    }

    pub fn delegating(delegates: impl IntoIterator<Item = StageId>) -> Self {
        Self {
            delegates: delegates.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn allows_search(&self) -> bool {
        self.search
    }

    pub fn allows_answer(&self) -> bool {
        self.answer
    }

    pub fn allows_delegation_to(&self, stage: StageId) -> bool {
        self.delegates.contains(&stage)
    }

    pub fn can_delegate(&self) -> bool {
        !self.delegates.is_empty()
    }

    /// Delegate targets in a stable order.
    pub fn delegates(&self) -> impl Iterator<Item = StageId> + '_ {
        self.delegates.iter().copied()
    }

    pub fn kinds(&self) -> Vec<CapabilityKind> {
        let mut kinds = vec![CapabilityKind::Model];
        if self.search {
            kinds.push(CapabilityKind::Search);
        }
        if self.answer {
            kinds.push(CapabilityKind::Answer);
        }
        if self.can_delegate() {
            kinds.push(CapabilityKind::Delegate);
        }
        kinds
    }
}
