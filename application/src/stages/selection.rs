//! Selection stage (`duplicate_remover`)

use super::shared::{check_cancelled, open_session, send_validated};
use super::{ModelAccess, Stage, StageContext, StageInput};
use crate::ports::llm_gateway::ModelPrompt;
use async_trait::async_trait;
use atlance_domain::{
    SelectionContract, StageError, StageId, StageOutput, StagePromptTemplate, StructuredContract,
};
use tracing::info;

/// Narrows the batch to at most `max_selected` distinct, interesting photos.
pub struct SelectionStage {
    access: ModelAccess,
    max_selected: usize,
}

impl SelectionStage {
    pub fn new(access: ModelAccess, max_selected: usize) -> Self {
        Self {
            access,
            max_selected,
        }
    }
}

#[async_trait]
impl Stage for SelectionStage {
    fn id(&self) -> StageId {
        StageId::Selection
    }

    fn contract(&self) -> Option<&'static str> {
        Some(SelectionContract::new(0, self.max_selected).name())
    }

    async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let stage = self.id();
        check_cancelled(stage, ctx)?;

        let system = StagePromptTemplate::selection_system(self.max_selected);
        let session = open_session(stage, &self.access, &system, ctx).await?;

        let prompt = ModelPrompt::new(StagePromptTemplate::selection_prompt(
            &input.batch,
            input.note.as_deref(),
        ))
        .with_images(input.batch.images().cloned());
        let contract = SelectionContract::new(input.batch.len(), self.max_selected);

        let selection = send_validated(
            stage,
            session.as_ref(),
            prompt,
            &contract,
            &self.access,
            ctx,
        )
        .await?;

        info!(
            "Selected {} of {} images: {:?}",
            selection.len(),
            input.batch.len(),
            selection.selected_indices
        );
        Ok(StageOutput::Selection(selection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use crate::ports::llm_gateway::GatewayError;
    use atlance_domain::{CapabilityError, ContractError, SelectionResult};

    #[tokio::test]
    async fn test_selection_canonicalises_order() {
        let gateway = ScriptedGateway::single(vec![Scripted::text(
            r#"{"selected_indices": [7, 0, 4], "reasons": "distinct scenes"}"#,
        )]);
        let stage = SelectionStage::new(access(gateway.clone()), 3);

        let output = stage.run(&input(10), &stage_context()).await.unwrap();
        assert_eq!(
            output,
            StageOutput::Selection(SelectionResult::new(vec![0, 4, 7], "distinct scenes"))
        );
        // All ten images were attached to the first prompt
        assert_eq!(gateway.prompts()[0].images.len(), 10);
    }

    #[tokio::test]
    async fn test_selection_repairs_once_then_fails() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::text(r#"{"selected_indices": [0, 2, 2], "reasons": "dup"}"#),
            Scripted::text(r#"{"selected_indices": [0, 2, 2], "reasons": "still dup"}"#),
        ]);
        let stage = SelectionStage::new(access(gateway.clone()), 3);

        let err = stage.run(&input(10), &stage_context()).await.unwrap_err();
        match err {
            StageError::ContractViolation {
                stage,
                contract,
                version,
                source,
            } => {
                assert_eq!(stage, StageId::Selection);
                assert_eq!(contract, "selection");
                assert_eq!(version, 1);
                assert!(matches!(
                    source,
                    ContractError::ConstraintViolation {
                        constraint: "unique_indices",
                        ..
                    }
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Second prompt was the repair prompt, without images
        let prompts = gateway.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].text.contains("unique_indices"));
        assert!(prompts[1].images.is_empty());
    }

    #[tokio::test]
    async fn test_selection_accepts_repaired_output() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::text("I like photos 1 and 3 best."),
            Scripted::text(r#"```json
{"selected_indices": [3, 1], "reasons": "best light"}
```"#),
        ]);
        let stage = SelectionStage::new(access(gateway), 3);
        let output = stage.run(&input(5), &stage_context()).await.unwrap();
        assert!(matches!(
            output,
            StageOutput::Selection(ref s) if s.selected_indices == vec![1, 3]
        ));
    }

    #[tokio::test]
    async fn test_unsupported_model_is_not_retried() {
        let unsupported = || {
            Scripted::Fail(GatewayError::Unsupported(
                "qwen3:8b does not accept images".to_string(),
            ))
        };
        let gateway = ScriptedGateway::single(vec![unsupported(), unsupported(), unsupported()]);
        let stage = SelectionStage::new(
            access(gateway.clone()).with_retry(fast_retry().with_max_attempts(3)),
            3,
        );

        let err = stage.run(&input(4), &stage_context()).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::CapabilityUnavailable {
                source: CapabilityError::Unsupported { .. },
                ..
            }
        ));
        assert_eq!(gateway.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_model_call() {
        let gateway = ScriptedGateway::single(vec![]);
        let stage = SelectionStage::new(access(gateway.clone()), 3);
        let ctx = stage_context();
        ctx.cancel.cancel();

        let err = stage.run(&input(3), &ctx).await.unwrap_err();
        assert_eq!(
            err,
            StageError::Cancelled {
                stage: StageId::Selection
            }
        );
        assert!(gateway.prompts().is_empty());
    }
}
