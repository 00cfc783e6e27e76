//! Shared helpers for stages.
//!
//! Cancellation checks, retried model calls and contract repair, used by
//! every model-backed stage.

use super::{ModelAccess, StageContext, StageInput};
use crate::capability::retry::call_with_retry;
use crate::ports::llm_gateway::{GatewayError, LlmSession, ModelPrompt, ToolResultMessage};
use atlance_domain::{
    CapabilityError, CapabilityKind, LlmResponse, RunContext, StageError, StageId,
    StagePromptTemplate, StructuredContract, ToolDefinition,
};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Fail with `StageError::Cancelled` if the run was cancelled.
pub(crate) fn check_cancelled(stage: StageId, ctx: &StageContext) -> Result<(), StageError> {
    if ctx.cancel.is_cancelled() {
        return Err(StageError::Cancelled { stage });
    }
    Ok(())
}

fn gateway_error(error: GatewayError) -> CapabilityError {
    match error {
        GatewayError::Timeout => CapabilityError::Timeout {
            capability: CapabilityKind::Model,
            elapsed_ms: 0,
        },
        GatewayError::Unsupported(_) | GatewayError::ModelNotAvailable(_) => {
            CapabilityError::Unsupported {
                capability: CapabilityKind::Model,
                message: error.to_string(),
            }
        }
        other => CapabilityError::upstream(CapabilityKind::Model, other.to_string()),
    }
}

/// Open a model session for one stage invocation.
pub(crate) async fn open_session(
    stage: StageId,
    access: &ModelAccess,
    system_prompt: &str,
    ctx: &StageContext,
) -> Result<Box<dyn LlmSession>, StageError> {
    check_cancelled(stage, ctx)?;
    let gateway = &access.gateway;
    let model = &access.model;
    call_with_retry(
        &access.retry,
        CapabilityKind::Model,
        &ctx.cancel,
        |attempt| ctx.progress.on_retry(stage, CapabilityKind::Model, attempt),
        move || async move {
            gateway
                .create_session_with_system_prompt(model, system_prompt)
                .await
                .map_err(gateway_error)
        },
    )
    .await
    .map_err(|e| StageError::from_capability(stage, e))
}

/// Send a prompt and return the text reply.
pub(crate) async fn send_text(
    stage: StageId,
    session: &dyn LlmSession,
    prompt: &ModelPrompt,
    access: &ModelAccess,
    ctx: &StageContext,
) -> Result<String, StageError> {
    call_with_retry(
        &access.retry,
        CapabilityKind::Model,
        &ctx.cancel,
        |attempt| ctx.progress.on_retry(stage, CapabilityKind::Model, attempt),
        move || async move { session.send(prompt).await.map_err(gateway_error) },
    )
    .await
    .map_err(|e| StageError::from_capability(stage, e))
}

/// Send a prompt and validate the reply against `contract`.
///
/// On a violation the model is re-prompted with the diagnostic, up to
/// `access.contract_retries` times; the last violation is returned as
/// `StageError::ContractViolation`.
pub(crate) async fn send_validated<C: StructuredContract>(
    stage: StageId,
    session: &dyn LlmSession,
    prompt: ModelPrompt,
    contract: &C,
    access: &ModelAccess,
    ctx: &StageContext,
) -> Result<C::Output, StageError> {
    let schema = contract.schema();
    let mut prompt = prompt;
    let mut repairs = 0;

    loop {
        check_cancelled(stage, ctx)?;
        let current = &prompt;
        let schema = &schema;
        let text = call_with_retry(
            &access.retry,
            CapabilityKind::Model,
            &ctx.cancel,
            |attempt| ctx.progress.on_retry(stage, CapabilityKind::Model, attempt),
            move || async move {
                session
                    .send_structured(current, schema)
                    .await
                    .map_err(gateway_error)
            },
        )
        .await
        .map_err(|e| StageError::from_capability(stage, e))?;

        match contract.validate_text(&text) {
            Ok(output) => {
                debug!(
                    "{}: {} v{} output accepted",
                    stage,
                    contract.name(),
                    contract.version()
                );
                return Ok(output);
            }
            Err(error) if repairs < access.contract_retries => {
                repairs += 1;
                warn!(
                    "{}: {} contract violated ({}); re-prompting ({}/{})",
                    stage,
                    contract.name(),
                    error,
                    repairs,
                    access.contract_retries
                );
                prompt = ModelPrompt::new(StagePromptTemplate::contract_repair_prompt(
                    contract.name(),
                    &error,
                ));
            }
            Err(error) => {
                return Err(StageError::ContractViolation {
                    stage,
                    contract: contract.name(),
                    version: contract.version(),
                    source: error,
                });
            }
        }
    }
}

/// Send a prompt with tool definitions (native tool use).
pub(crate) async fn send_with_tools(
    stage: StageId,
    session: &dyn LlmSession,
    prompt: &ModelPrompt,
    tools: &[ToolDefinition],
    access: &ModelAccess,
    ctx: &StageContext,
) -> Result<LlmResponse, StageError> {
    call_with_retry(
        &access.retry,
        CapabilityKind::Model,
        &ctx.cancel,
        |attempt| ctx.progress.on_retry(stage, CapabilityKind::Model, attempt),
        move || async move {
            session
                .send_with_tools(prompt, tools)
                .await
                .map_err(gateway_error)
        },
    )
    .await
    .map_err(|e| StageError::from_capability(stage, e))
}

/// Send tool results back and get the next response.
pub(crate) async fn send_tool_results(
    stage: StageId,
    session: &dyn LlmSession,
    results: &[ToolResultMessage],
    access: &ModelAccess,
    ctx: &StageContext,
) -> Result<LlmResponse, StageError> {
    call_with_retry(
        &access.retry,
        CapabilityKind::Model,
        &ctx.cancel,
        |attempt| ctx.progress.on_retry(stage, CapabilityKind::Model, attempt),
        move || async move {
            session
                .send_tool_results(results)
                .await
                .map_err(gateway_error)
        },
    )
    .await
    .map_err(|e| StageError::from_capability(stage, e))
}

/// Images a stage works on: the input focus, else the latest selection.
///
/// Out-of-range and repeated indices are dropped; order is preserved.
pub(crate) fn resolve_targets(
    stage: StageId,
    input: &StageInput,
    run: &RunContext,
) -> Result<Vec<usize>, StageError> {
    let requested = match (&input.focus, run.selection()) {
        (Some(focus), _) => focus.clone(),
        (None, Some(selection)) => selection.selected_indices.clone(),
        (None, None) => {
            return Err(StageError::UpstreamMissing {
                stage,
                missing: "selection",
            });
        }
    };

    let batch_size = input.batch.len();
    let mut seen = BTreeSet::new();
    Ok(requested
        .into_iter()
        .filter(|&i| {
            if i >= batch_size {
                warn!("{}: ignoring index {} outside a batch of {}", stage, i, batch_size);
                return false;
            }
            seen.insert(i)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlance_domain::{ImageBatch, ImageRef, SelectionResult, StageOutput};
    use std::sync::Arc;

    fn input() -> StageInput {
        StageInput::new(
            ImageBatch::from_refs((0..5).map(|i| ImageRef::new(format!("{}.jpg", i)))).unwrap(),
        )
    }

    #[test]
    fn test_targets_prefer_focus() {
        let mut run = RunContext::new();
        run.push(
            StageId::Selection,
            Arc::new(StageOutput::Selection(SelectionResult::new(vec![0, 1], "x"))),
        );
        let targets =
            resolve_targets(StageId::Extraction, &input().with_focus(vec![4, 2, 4, 9]), &run)
                .unwrap();
        assert_eq!(targets, vec![4, 2]);
        let targets = resolve_targets(StageId::Extraction, &input(), &run).unwrap();
        assert_eq!(targets, vec![0, 1]);
    }

    #[test]
    fn test_targets_require_selection() {
        let err = resolve_targets(StageId::Landmark, &input(), &RunContext::new()).unwrap_err();
        assert_eq!(
            err,
            StageError::UpstreamMissing {
                stage: StageId::Landmark,
                missing: "selection"
            }
        );
    }
}
