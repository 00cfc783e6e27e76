//! Execution graph validation.
//!
//! Runs before any stage does. Rejects graphs that name unregistered stages,
//! are empty, or would let a stage reach one it was not granted.

use super::types::ExecutionGraph;
use crate::stages::Stage;
use atlance_domain::{RunError, StageId};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub(super) fn validate(
    graph: &ExecutionGraph,
    stages: &HashMap<StageId, Arc<dyn Stage>>,
) -> Result<(), RunError> {
    let lookup = |id: StageId| {
        stages
            .get(&id)
            .ok_or_else(|| RunError::InvalidGraph(format!("stage {} is not registered", id)))
    };

    match graph {
        ExecutionGraph::Sequential { stages: plans } => {
            if plans.is_empty() {
                return Err(RunError::InvalidGraph("no stages to run".to_string()));
            }
            if plans.iter().all(|p| !p.enabled) {
                return Err(RunError::InvalidGraph("every stage is disabled".to_string()));
            }
            for plan in plans {
                let stage = lookup(plan.stage)?;
                if stage.grant().can_delegate() {
                    return Err(RunError::InvalidGraph(format!(
                        "{} holds a delegate grant; delegation needs a delegating-root graph",
                        plan.stage
                    )));
                }
            }
        }
        ExecutionGraph::DelegatingRoot { root, delegates } => {
            let root_stage = lookup(*root)?;
            if delegates.is_empty() {
                return Err(RunError::InvalidGraph(format!("root {} has no delegates", root)));
            }
            if delegates.contains(root) {
                return Err(RunError::InvalidGraph(format!(
                    "root {} may not delegate to itself",
                    root
                )));
            }
            for delegate in delegates {
                if lookup(*delegate)?.grant().can_delegate() {
                    return Err(RunError::InvalidGraph(format!(
                        "delegate {} holds a delegate grant of its own",
                        delegate
                    )));
                }
            }

            let granted: BTreeSet<StageId> = root_stage.grant().delegates().collect();
            let declared: BTreeSet<StageId> = delegates.iter().copied().collect();
            if let Some(outside) = granted.difference(&declared).next() {
                return Err(RunError::InvalidGraph(format!(
                    "{} is granted delegate {} which is not in the graph",
                    root, outside
                )));
            }
            if let Some(ungranted) = declared.difference(&granted).next() {
                return Err(RunError::InvalidGraph(format!(
                    "{} is not granted delegation to {}",
                    root, ungranted
                )));
            }
        }
    }
    Ok(())
}
