//! Extraction stage (`data_extractor`)

use super::shared::{check_cancelled, open_session, resolve_targets, send_validated};
use super::{ModelAccess, Stage, StageContext, StageInput};
use crate::ports::llm_gateway::ModelPrompt;
use async_trait::async_trait;
use atlance_domain::{
    ExtractionContract, ExtractionResult, ImageBatch, StageError, StageId, StageOutput,
    StagePromptTemplate, StructuredContract,
};
use tracing::{debug, info};

/// Extracts per-image metadata and subjects, plus a preliminary story.
///
/// Works on the input focus, else the latest selection. Landmark findings
/// already in the run are handed to the model as context.
pub struct ExtractionStage {
    access: ModelAccess,
}

impl ExtractionStage {
    pub fn new(access: ModelAccess) -> Self {
        Self { access }
    }
}

/// Caller-provided metadata wins over whatever the model read from pixels.
fn overlay_metadata(result: &mut ExtractionResult, batch: &ImageBatch, targets: &[usize]) {
    for (analysis, &index) in result.images.iter_mut().zip(targets) {
        let Some(meta) = batch.metadata(index) else {
            continue;
        };
        if let Some(ts) = &meta.timestamp {
            analysis.timestamp = Some(ts.clone());
        }
        if let Some(location) = meta.location {
            analysis.location = Some(location);
        }
    }
}

#[async_trait]
impl Stage for ExtractionStage {
    fn id(&self) -> StageId {
        StageId::Extraction
    }

    fn contract(&self) -> Option<&'static str> {
        Some(ExtractionContract::new(Vec::new()).name())
    }

    async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let stage = self.id();
        check_cancelled(stage, ctx)?;

        let targets = resolve_targets(stage, input, &ctx.run)?;
        if targets.is_empty() {
            debug!("Nothing routed into extraction");
            return Ok(StageOutput::Extraction(ExtractionResult {
                images: Vec::new(),
                preliminary_story: String::new(),
            }));
        }

        let session = open_session(
            stage,
            &self.access,
            StagePromptTemplate::extraction_system(),
            ctx,
        )
        .await?;

        let expected = input.batch.select(&targets);
        let prompt = ModelPrompt::new(StagePromptTemplate::extraction_prompt(
            &input.batch,
            &targets,
            ctx.run.landmarks(),
            input.note.as_deref(),
        ))
        .with_images(expected.clone());

        let mut result = send_validated(
            stage,
            session.as_ref(),
            prompt,
            &ExtractionContract::new(expected),
            &self.access,
            ctx,
        )
        .await?;
        overlay_metadata(&mut result, &input.batch, &targets);

        info!(
            "Extracted {} images ({} located)",
            result.images.len(),
            result.located().count()
        );
        Ok(StageOutput::Extraction(result))
    }
}
