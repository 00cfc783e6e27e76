//! Follow-up interview result

use crate::core::question::Exchange;
use serde::{Deserialize, Serialize};

/// Outcome of the interactive question stage: the story refined with the
/// user's answers, and the answered questions in the order they were asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interview {
    pub story: String,
    pub exchanges: Vec<Exchange>,
}
