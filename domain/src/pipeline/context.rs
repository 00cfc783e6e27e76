//! Run context: results produced so far in one run

use super::output::StageOutput;
use super::stage_id::StageId;
use crate::analysis::{ExtractionResult, LandmarkReport, SelectionResult};
use std::sync::Arc;

/// One accepted stage result.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextEntry {
    pub stage: StageId,
    pub output: Arc<StageOutput>,
}

/// Append-only record of the results produced earlier in a run.
///
/// Stages see it read-only and share results through `Arc`, so no stage can
/// mutate another stage's output. Lookups return the most recent result of
/// the requested kind. Cloning is cheap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunContext {
    entries: Vec<ContextEntry>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: StageId, output: Arc<StageOutput>) {
        self.entries.push(ContextEntry { stage, output });
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest output of the given stage.
    pub fn latest(&self, stage: StageId) -> Option<&Arc<StageOutput>> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.stage == stage)
            .map(|e| &e.output)
    }

    pub fn has(&self, stage: StageId) -> bool {
        self.latest(stage).is_some()
    }

    fn find_map<'a, T>(&'a self, f: impl Fn(&'a StageOutput) -> Option<&'a T>) -> Option<&'a T> {
        self.entries.iter().rev().find_map(|e| f(e.output.as_ref()))
    }

    pub fn selection(&self) -> Option<&SelectionResult> {
        self.find_map(|o| match o {
            StageOutput::Selection(s) => Some(s),
            _ => None,
        })
    }

    pub fn landmarks(&self) -> Option<&LandmarkReport> {
        self.find_map(|o| match o {
            StageOutput::Landmarks(r) => Some(r),
            _ => None,
        })
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        self.find_map(|o| match o {
            StageOutput::Extraction(e) => Some(e),
            _ => None,
        })
    }

    /// The most recent contract-bearing output: the run's final result.
    pub fn last_contract_bearing(&self) -> Option<&Arc<StageOutput>> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.output.is_contract_bearing())
            .map(|e| &e.output)
    }

    /// The most recent free-text narrative (interview story, root answer or
    /// preliminary story).
    pub fn last_narrative(&self) -> Option<&str> {
        self.entries.iter().rev().find_map(|e| e.output.narrative())
    }
}
