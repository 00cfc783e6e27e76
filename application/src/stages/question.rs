//! Question stage (`question_asker`)
//!
//! Asks the traveller follow-up questions one at a time, then folds the
//! answers back into the story. Only this stage may reach the user.

use super::shared::{check_cancelled, open_session, send_text};
use super::{ModelAccess, Stage, StageContext, StageInput};
use crate::ports::answer::AnswerError;
use crate::ports::llm_gateway::ModelPrompt;
use async_trait::async_trait;
use atlance_domain::{
    CapabilityError, CapabilityGrant, CapabilityKind, Exchange, Interview, NO_MORE_QUESTIONS,
    Question, StageError, StageId, StageOutput, StagePromptTemplate,
};
use tracing::{debug, info};

pub struct QuestionStage {
    access: ModelAccess,
    max_questions: usize,
}

impl QuestionStage {
    pub fn new(access: ModelAccess, max_questions: usize) -> Self {
        Self {
            access,
            max_questions,
        }
    }
}

#[async_trait]
impl Stage for QuestionStage {
    fn id(&self) -> StageId {
        StageId::Question
    }

    fn grant(&self) -> CapabilityGrant {
        CapabilityGrant::interactive()
    }

    fn contract(&self) -> Option<&'static str> {
        None
    }

    async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let stage = self.id();
        check_cancelled(stage, ctx)?;

        let answers = ctx.capabilities.answers.as_ref().ok_or_else(|| {
            StageError::CapabilityUnavailable {
                stage,
                source: CapabilityError::NotGranted {
                    capability: CapabilityKind::Answer,
                    detail: "no answer source attached to this run".to_string(),
                },
            }
        })?;

        let story = ctx.run.last_narrative().unwrap_or_default().to_string();
        let session = open_session(stage, &self.access, StagePromptTemplate::question_system(), ctx)
            .await?;

        let mut exchanges: Vec<Exchange> = Vec::new();
        while exchanges.len() < self.max_questions {
            check_cancelled(stage, ctx)?;

            let mut prompt = ModelPrompt::new(StagePromptTemplate::next_question_prompt(
                &story,
                &exchanges,
                input.note.as_deref(),
            ));
            if exchanges.is_empty() {
                prompt = prompt.with_images(input.batch.images().cloned());
            }
            let reply = send_text(stage, session.as_ref(), &prompt, &self.access, ctx).await?;

            if reply.contains(NO_MORE_QUESTIONS) {
                debug!("Model has no further questions");
                break;
            }
            let Some(question) = Question::try_new(reply) else {
                debug!("Model returned an empty question; stopping");
                break;
            };

            ctx.progress.on_question(&question);
            ctx.progress
                .on_capability_call(stage, CapabilityKind::Answer, question.content());

            let answer = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Err(StageError::Cancelled { stage }),
                answer = answers.request_answer(&question) => answer,
            };
            match answer {
                Ok(text) => exchanges.push(question.answer(text)),
                Err(AnswerError::Cancelled) => return Err(StageError::Cancelled { stage }),
                Err(AnswerError::NoAnswer) => {
                    info!("Traveller ended the interview");
                    break;
                }
                Err(e @ AnswerError::Io(_)) => {
                    return Err(StageError::CapabilityUnavailable {
                        stage,
                        source: CapabilityError::upstream(CapabilityKind::Answer, e.to_string()),
                    });
                }
            }
        }

        let story = if exchanges.is_empty() {
            story
        } else {
            check_cancelled(stage, ctx)?;
            let prompt =
                ModelPrompt::new(StagePromptTemplate::refine_story_prompt(&story, &exchanges));
            send_text(stage, session.as_ref(), &prompt, &self.access, ctx)
                .await?
                .trim()
                .to_string()
        };

        info!("Interview finished after {} answers", exchanges.len());
        Ok(StageOutput::Interview(Interview { story, exchanges }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::GrantedCapabilities;
    use crate::ports::answer::{DeclineAnswers, ScriptedAnswers};
    use atlance_domain::{ExtractionResult, RunContext};
    use crate::test_support::*;
    use std::sync::Arc;

    fn with_answers(answers: Arc<dyn crate::ports::answer::AnswerPort>) -> GrantedCapabilities {
        GrantedCapabilities {
            answers: Some(answers),
            ..GrantedCapabilities::none()
        }
    }

    fn run_with_story(story: &str) -> RunContext {
        let mut run = RunContext::new();
        run.push(
            StageId::Extraction,
            Arc::new(StageOutput::Extraction(ExtractionResult {
                images: Vec::new(),
                preliminary_story: story.to_string(),
            })),
        );
        run
    }

    #[tokio::test]
    async fn test_interview_refines_story() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::text("Who were you travelling with?"),
            Scripted::text(NO_MORE_QUESTIONS),
            Scripted::text("  A week in Lisbon with my sister.  "),
        ]);
        let stage = QuestionStage::new(access(gateway.clone()), 3);
        let answers = Arc::new(ScriptedAnswers::new(["My sister"]));
        let ctx = context_with(run_with_story("A week in Lisbon."), with_answers(answers));

        let output = stage.run(&input(2), &ctx).await.unwrap();
        let StageOutput::Interview(interview) = output else {
            panic!("expected interview");
        };
        assert_eq!(interview.story, "A week in Lisbon with my sister.");
        assert_eq!(interview.exchanges.len(), 1);
        assert_eq!(interview.exchanges[0].answer, "My sister");

        let prompts = gateway.prompts();
        assert!(prompts[0].text.contains("A week in Lisbon."));
        assert_eq!(prompts[0].images.len(), 2);
        assert!(prompts[1].images.is_empty());
    }

    #[tokio::test]
    async fn test_stops_at_max_questions() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::text("First?"),
            Scripted::text("Second?"),
            Scripted::text("Story."),
        ]);
        let stage = QuestionStage::new(access(gateway.clone()), 2);
        let answers = Arc::new(ScriptedAnswers::new(["a", "b", "c"]));
        let ctx = context_with(RunContext::new(), with_answers(answers));

        let output = stage.run(&input(1), &ctx).await.unwrap();
        assert!(matches!(output, StageOutput::Interview(ref i) if i.exchanges.len() == 2));
        assert_eq!(gateway.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_declined_answer_keeps_story() {
        let gateway = ScriptedGateway::single(vec![Scripted::text("Where was this?")]);
        let stage = QuestionStage::new(access(gateway.clone()), 3);
        let ctx = context_with(run_with_story("Draft."), with_answers(Arc::new(DeclineAnswers)));

        let output = stage.run(&input(1), &ctx).await.unwrap();
        assert_eq!(
            output,
            StageOutput::Interview(Interview {
                story: "Draft.".to_string(),
                exchanges: Vec::new(),
            })
        );
        assert_eq!(gateway.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_waiting_for_answer() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::text("Who took this?"),
            Scripted::text("And this one?"),
        ]);
        let stage = QuestionStage::new(access(gateway.clone()), 3);
        let answers = Arc::new(PendingAnswers::default());
        let ctx = context_with(RunContext::new(), with_answers(answers.clone()));

        let cancel = ctx.cancel.clone();
        let waiting = answers.clone();
        tokio::spawn(async move {
            waiting.requested().await;
            cancel.cancel();
        });

        let err = stage.run(&input(1), &ctx).await.unwrap_err();
        assert_eq!(
            err,
            StageError::Cancelled {
                stage: StageId::Question
            }
        );
        assert_eq!(answers.request_count(), 1);
        assert_eq!(gateway.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_requires_answer_capability() {
        let gateway = ScriptedGateway::single(vec![]);
        let stage = QuestionStage::new(access(gateway), 3);
        let err = stage.run(&input(1), &stage_context()).await.unwrap_err();
        assert!(matches!(
            err,
            StageError::CapabilityUnavailable {
                source: CapabilityError::NotGranted {
                    capability: CapabilityKind::Answer,
                    ..
                },
                ..
            }
        ));
    }
}
