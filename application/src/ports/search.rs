//! Web search port

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    RequestFailed(String),

    #[error("Search timed out")]
    Timeout,

    #[error("Could not read search response: {0}")]
    InvalidResponse(String),
}

/// Submits a text query and returns zero or more text snippets.
///
/// Calls are independent and idempotent from the caller's point of view.
/// No ordering is guaranteed across calls.
#[async_trait]
pub trait SearchPort: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError>;
}
