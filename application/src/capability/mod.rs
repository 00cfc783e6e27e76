//! Capabilities a stage can be granted.
//!
//! - [`SearchCapability`]: concurrent web search with bounded retry
//! - [`DelegateCapability`]: invoke another stage through the coordinator
//!
//! Model calls and user answers go through their ports directly, but use
//! the same [`RetryPolicy`] and error type.

pub mod delegate;
pub mod retry;
pub mod search;

pub use delegate::{DelegateCapability, DelegateRouter, DelegationRequest};
pub use retry::RetryPolicy;
pub use search::{SearchCapability, SearchOutcome};

use crate::ports::answer::AnswerPort;
use std::sync::Arc;

/// The concrete capabilities handed to one stage invocation.
///
/// The coordinator fills only the slots the stage's grant names.
#[derive(Clone, Default)]
pub struct GrantedCapabilities {
    pub search: Option<SearchCapability>,
    pub delegate: Option<DelegateCapability>,
    pub answers: Option<Arc<dyn AnswerPort>>,
}

impl GrantedCapabilities {
    pub fn none() -> Self {
        Self::default()
    }
}
