//! Follow-up question value object

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`Question`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionState {
    /// Emitted to the user, no answer received yet
    AwaitingAnswer,
    /// The user replied
    Answered,
}

/// A single follow-up question posed to the end user (Value Object)
///
/// A question is created awaiting an answer. The only transition is
/// [`Question::answer`], which consumes the question and yields an
/// [`Exchange`]; an answered question cannot be asked again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    content: String,
    state: QuestionState,
}

impl Question {
    /// Try to create a new question, returning None if the text is blank
    pub fn try_new(content: impl Into<String>) -> Option<Self> {
        let content = content.into().trim().to_string();
        if content.is_empty() {
            None
        } else {
            Some(Self {
                content,
                state: QuestionState::AwaitingAnswer,
            })
        }
    }

    /// Get the question content
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn state(&self) -> &QuestionState {
        &self.state
    }

    pub fn is_awaiting_answer(&self) -> bool {
        self.state == QuestionState::AwaitingAnswer
    }

    /// Record the user's answer. The question moves into the returned
    /// [`Exchange`] and cannot be emitted again.
    pub fn answer(mut self, answer: impl Into<String>) -> Exchange {
        self.state = QuestionState::Answered;
        Exchange {
            question: self,
            answer: answer.into(),
        }
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

/// An answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: Question,
    pub answer: String,
}
