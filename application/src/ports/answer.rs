//! Answer port for the interactive question stage.
//!
//! # Architecture
//!
//! - **Port**: [`AnswerPort`], defined here in the application layer
//! - **Adapter**: `ConsoleAnswerer`, implemented in the presentation layer
//!
//! # Flow
//!
//! ```text
//! QuestionStage emits Question ("awaiting answer")
//!        ↓
//! AnswerPort::request_answer()   ← run suspended here
//!        ↓
//! Question::answer() → Exchange  ("answered")
//!        ↓
//! next question, or refined story
//! ```
//!
//! # Built-in Implementations
//!
//! - [`ScriptedAnswers`] - replays answers in order, then declines
//! - [`DeclineAnswers`] - never answers (non-interactive runs)

use async_trait::async_trait;
use atlance_domain::Question;
use std::collections::VecDeque;
use std::sync::Mutex;
use thiserror::Error;

/// Why no answer was obtained.
///
/// These are failures of the exchange, not answers the user gave.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnswerError {
    /// The user cancelled (e.g., Ctrl+C)
    #[error("Operation cancelled")]
    Cancelled,

    /// Terminal read failure
    #[error("I/O error: {0}")]
    Io(String),

    /// The user declined to answer; the interview ends here
    #[error("No answer given")]
    NoAnswer,
}

/// Port for obtaining the end user's answer to one question.
///
/// Called with exactly one question at a time; the caller never asks the
/// next question before this returns.
#[async_trait]
pub trait AnswerPort: Send + Sync {
    async fn request_answer(&self, question: &Question) -> Result<String, AnswerError>;
}

/// Replays a fixed list of answers, then returns [`AnswerError::NoAnswer`].
pub struct ScriptedAnswers {
    answers: Mutex<VecDeque<String>>,
}

impl ScriptedAnswers {
    pub fn new(answers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl AnswerPort for ScriptedAnswers {
    async fn request_answer(&self, _question: &Question) -> Result<String, AnswerError> {
        let mut answers = self
            .answers
            .lock()
            .map_err(|e| AnswerError::Io(e.to_string()))?;
        answers.pop_front().ok_or(AnswerError::NoAnswer)
    }
}

/// Never answers, so the question stage ends after its first question.
pub struct DeclineAnswers;

#[async_trait]
impl AnswerPort for DeclineAnswers {
    async fn request_answer(&self, _question: &Question) -> Result<String, AnswerError> {
        Err(AnswerError::NoAnswer)
    }
}
