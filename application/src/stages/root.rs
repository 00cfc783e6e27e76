//! Delegating root stage
//!
//! The root model sees one tool per granted sub-stage and decides which to
//! call, in what order, and how often:
//!
//! ```text
//! send_with_tools(prompt, delegate tools)
//!    ↓
//! ┌─ tool calls? ── no ──→ done (final text)
//! │      ↓ yes
//! │  invoke each sub-stage through the coordinator (sequential)
//! │      ↓
//! └─ send_tool_results(results keyed by call id)
//! ```

use super::shared::{check_cancelled, open_session, send_tool_results, send_with_tools};
use super::{ModelAccess, Stage, StageContext, StageInput};
use crate::ports::llm_gateway::{ModelPrompt, ToolResultMessage};
use async_trait::async_trait;
use atlance_domain::{
    CapabilityError, CapabilityGrant, CapabilityKind, StageError, StageId, StageOutput,
    StagePromptTemplate, ToolCall,
};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

pub struct DelegatingRootStage {
    access: ModelAccess,
    delegates: BTreeSet<StageId>,
    max_turns: usize,
}

impl DelegatingRootStage {
    pub fn new(
        access: ModelAccess,
        delegates: impl IntoIterator<Item = StageId>,
        max_turns: usize,
    ) -> Self {
        Self {
            access,
            delegates: delegates.into_iter().collect(),
            max_turns,
        }
    }

    fn delegated_input(input: &StageInput, call: &ToolCall) -> StageInput {
        let mut delegated = StageInput::new(input.batch.clone());
        if let Some(indices) = call.get_indices("indices").filter(|i| !i.is_empty()) {
            delegated = delegated.with_focus(indices);
        }
        if let Some(note) = call.get_string("note").filter(|n| !n.trim().is_empty()) {
            delegated = delegated.with_note(note);
        }
        delegated
    }
}

#[async_trait]
impl Stage for DelegatingRootStage {
    fn id(&self) -> StageId {
        StageId::Root
    }

    fn grant(&self) -> CapabilityGrant {
        CapabilityGrant::delegating(self.delegates.iter().copied())
    }

    fn contract(&self) -> Option<&'static str> {
        None
    }

    async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let stage = self.id();
        check_cancelled(stage, ctx)?;

        let delegate = ctx.capabilities.delegate.as_ref().ok_or_else(|| {
            StageError::CapabilityUnavailable {
                stage,
                source: CapabilityError::NotGranted {
                    capability: CapabilityKind::Delegate,
                    detail: "root stage has no delegates".to_string(),
                },
            }
        })?;
        let tools = delegate.tool_definitions();

        let session =
            open_session(stage, &self.access, StagePromptTemplate::root_system(), ctx).await?;
        let prompt = ModelPrompt::new(StagePromptTemplate::root_prompt(
            &input.batch,
            input.note.as_deref(),
        ))
        .with_images(input.batch.images().cloned());

        let mut response =
            send_with_tools(stage, session.as_ref(), &prompt, &tools, &self.access, ctx).await?;
        let mut turn_count = 0;
        let mut calls_made = 0;
        let mut all_text = Vec::new();

        loop {
            let text = response.text_content();
            if !text.trim().is_empty() {
                all_text.push(text.trim().to_string());
            }

            let tool_calls = response.tool_calls();
            if tool_calls.is_empty() {
                break;
            }

            turn_count += 1;
            if turn_count > self.max_turns {
                warn!("Delegation loop exceeded max turns ({})", self.max_turns);
                break;
            }
            check_cancelled(stage, ctx)?;

            let mut results = Vec::new();
            for call in &tool_calls {
                calls_made += 1;
                let call_id = call
                    .native_id
                    .clone()
                    .unwrap_or_else(|| format!("{}-{}", call.tool_name, calls_made));

                let (output, is_error) = match call.tool_name.parse::<StageId>() {
                    Err(e) => (e.to_string(), true),
                    Ok(target) => {
                        ctx.progress
                            .on_capability_call(stage, CapabilityKind::Delegate, target.as_str());
                        let delegated = Self::delegated_input(input, call);
                        match delegate.invoke(call_id.clone(), target, delegated).await {
                            Ok(result) => {
                                let json = serde_json::to_string(result.as_ref())
                                    .unwrap_or_else(|_| result.summary());
                                (json, false)
                            }
                            Err(e) if e.is_cancelled() => {
                                return Err(StageError::Cancelled { stage });
                            }
                            Err(e) => (e.to_string(), true),
                        }
                    }
                };

                if call.native_id.is_some() {
                    results.push(ToolResultMessage {
                        tool_use_id: call_id,
                        tool_name: call.tool_name.clone(),
                        output,
                        is_error,
                    });
                } else {
                    warn!(
                        "Missing call id for delegation '{}'; skipping result.",
                        call.tool_name
                    );
                }
            }

            debug!(
                "Delegation turn {}/{}: sending {} results",
                turn_count,
                self.max_turns,
                results.len()
            );
            response =
                send_tool_results(stage, session.as_ref(), &results, &self.access, ctx).await?;
        }

        info!("Root finished after {} delegation calls", calls_made);
        Ok(StageOutput::Text(all_text.join("\n\n")))
    }
}
