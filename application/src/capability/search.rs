//! Search capability

use super::retry::{RetryPolicy, call_with_retry};
use crate::ports::search::{SearchError, SearchPort};
use atlance_domain::{CapabilityError, CapabilityKind};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of one query issued by [`SearchCapability::search_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub query: String,
    pub result: Result<Vec<String>, CapabilityError>,
}

impl SearchOutcome {
    /// Snippets found, or none when the query failed or came back empty.
    pub fn snippets(&self) -> &[String] {
        self.result.as_deref().unwrap_or(&[])
    }

    /// Failed for a reason other than an empty result.
    pub fn is_failure(&self) -> bool {
        matches!(&self.result, Err(e) if !matches!(e, CapabilityError::Empty { .. }))
    }
}

/// Web search granted to a stage.
#[derive(Clone)]
pub struct SearchCapability {
    port: Arc<dyn SearchPort>,
    policy: RetryPolicy,
    max_concurrent: usize,
}

fn to_capability_error(error: SearchError) -> CapabilityError {
    match error {
        SearchError::Timeout => CapabilityError::Timeout {
            capability: CapabilityKind::Search,
            elapsed_ms: 0,
        },
        other => CapabilityError::upstream(CapabilityKind::Search, other.to_string()),
    }
}

impl SearchCapability {
    pub fn new(port: Arc<dyn SearchPort>, policy: RetryPolicy) -> Self {
        Self {
            port,
            policy,
            max_concurrent: 4,
        }
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Run one query. An empty result is reported as
    /// [`CapabilityError::Empty`] and is not retried.
    pub async fn search(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CapabilityError> {
        let port = &self.port;
        let snippets = call_with_retry(
            &self.policy,
            CapabilityKind::Search,
            cancel,
            |_| {},
            move || async move { port.search(query).await.map_err(to_capability_error) },
        )
        .await?;

        debug!("search {:?}: {} snippets", query, snippets.len());
        if snippets.is_empty() {
            return Err(CapabilityError::Empty {
                capability: CapabilityKind::Search,
            });
        }
        Ok(snippets)
    }

    /// Run all queries concurrently (at most `max_concurrent` in flight).
    ///
    /// Outcomes come back in request order, each paired with its query,
    /// whatever order the responses arrive in.
    pub async fn search_all(
        &self,
        queries: Vec<String>,
        cancel: &CancellationToken,
    ) -> Vec<SearchOutcome> {
        futures::stream::iter(queries)
            .map(|query| async move {
                let result = self.search(&query, cancel).await;
                SearchOutcome { query, result }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await
    }
}
