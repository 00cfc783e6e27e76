//! Landmark stage (`landmark_search`)
//!
//! Two model passes around a round of concurrent searches:
//!
//! ```text
//! model: candidates (LandmarkCandidatesContract)
//!    ↓
//! search_all(one query per candidate)   ← concurrent, paired by request
//!    ↓
//! model: findings from evidence (LandmarkContract)
//! ```

use super::shared::{check_cancelled, open_session, resolve_targets, send_validated};
use super::{ModelAccess, Stage, StageContext, StageInput};
use crate::ports::llm_gateway::ModelPrompt;
use async_trait::async_trait;
use atlance_domain::{
    CapabilityError, CapabilityGrant, CapabilityKind, FindingSubject, LandmarkCandidate,
    LandmarkCandidatesContract, LandmarkContract, LandmarkReport, StageError, StageId,
    StageOutput, StagePromptTemplate, StructuredContract,
};
use tracing::{debug, info, warn};

/// Identifies landmarks in the selected photos and verifies them by search.
pub struct LandmarkStage {
    access: ModelAccess,
}

impl LandmarkStage {
    pub fn new(access: ModelAccess) -> Self {
        Self { access }
    }
}

/// Mark findings backed by at least one search snippet.
fn mark_verified(report: &mut LandmarkReport, evidence: &[(LandmarkCandidate, Vec<String>)]) {
    let any_evidence = evidence.iter().any(|(_, snippets)| !snippets.is_empty());
    for finding in &mut report.findings {
        finding.verified = match finding.subject {
            FindingSubject::Image { index } => evidence
                .iter()
                .any(|(c, snippets)| c.image_index == index && !snippets.is_empty()),
            FindingSubject::Location { .. } => any_evidence,
        };
    }
}

#[async_trait]
impl Stage for LandmarkStage {
    fn id(&self) -> StageId {
        StageId::Landmark
    }

    fn grant(&self) -> CapabilityGrant {
        CapabilityGrant::search_only()
    }

    fn contract(&self) -> Option<&'static str> {
        Some(LandmarkContract::new(0).name())
    }

    async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let stage = self.id();
        check_cancelled(stage, ctx)?;

        let search = ctx.capabilities.search.as_ref().ok_or_else(|| {
            StageError::CapabilityUnavailable {
                stage,
                source: CapabilityError::NotGranted {
                    capability: CapabilityKind::Search,
                    detail: "no search provider configured".to_string(),
                },
            }
        })?;
        let targets = resolve_targets(stage, input, &ctx.run)?;
        if targets.is_empty() {
            debug!("Nothing routed into landmark search");
            return Ok(StageOutput::Landmarks(LandmarkReport {
                summary: "No landmarks identified.".to_string(),
                findings: Vec::new(),
            }));
        }

        let session = open_session(
            stage,
            &self.access,
            StagePromptTemplate::landmark_candidates_system(),
            ctx,
        )
        .await?;

        let prompt = ModelPrompt::new(StagePromptTemplate::landmark_candidates_prompt(
            &input.batch,
            &targets,
            input.note.as_deref(),
        ))
        .with_images(input.batch.select(&targets));
        let candidates = send_validated(
            stage,
            session.as_ref(),
            prompt,
            &LandmarkCandidatesContract::new(input.batch.len()),
            &self.access,
            ctx,
        )
        .await?;

        let candidates: Vec<LandmarkCandidate> = candidates
            .into_iter()
            .filter(|c| {
                let routed = targets.contains(&c.image_index);
                if !routed {
                    debug!("dropping candidate for unrouted image {}", c.image_index);
                }
                routed
            })
            .collect();

        if candidates.is_empty() {
            info!("No landmark candidates among {} images", targets.len());
            return Ok(StageOutput::Landmarks(LandmarkReport {
                summary: "No landmarks identified.".to_string(),
                findings: Vec::new(),
            }));
        }

        for candidate in &candidates {
            ctx.progress
                .on_capability_call(stage, CapabilityKind::Search, &candidate.search_query);
        }
        let queries = candidates.iter().map(|c| c.search_query.clone()).collect();
        let outcomes = search.search_all(queries, &ctx.cancel).await;

        check_cancelled(stage, ctx)?;
        if outcomes.iter().all(|o| o.is_failure()) {
            let first = outcomes
                .into_iter()
                .find_map(|o| o.result.err())
                .unwrap_or(CapabilityError::Empty {
                    capability: CapabilityKind::Search,
                });
            warn!("Every landmark search failed: {}", first);
            return Err(StageError::from_capability(stage, first));
        }

        let evidence: Vec<(LandmarkCandidate, Vec<String>)> = candidates
            .into_iter()
            .zip(outcomes)
            .map(|(candidate, outcome)| {
                if let Err(e) = &outcome.result {
                    debug!("search {:?} contributed nothing: {}", outcome.query, e);
                }
                (candidate, outcome.snippets().to_vec())
            })
            .collect();

        let prompt = ModelPrompt::new(StagePromptTemplate::landmark_report_prompt(&evidence));
        let mut report = send_validated(
            stage,
            session.as_ref(),
            prompt,
            &LandmarkContract::new(input.batch.len()),
            &self.access,
            ctx,
        )
        .await?;
        mark_verified(&mut report, &evidence);

        info!(
            "Landmarks: {} findings, {} verified",
            report.findings.len(),
            report.verified_count()
        );
        Ok(StageOutput::Landmarks(report))
    }
}
