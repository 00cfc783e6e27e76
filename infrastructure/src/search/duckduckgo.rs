//! [`SearchPort`] backed by the DuckDuckGo Instant Answer API.
//!
//! The API needs no key and returns abstracts, instant answers, definitions
//! and related topics rather than full result listings. That is enough to
//! confirm a landmark name: "Eiffel Tower" yields a Wikipedia abstract,
//! a misidentified landmark usually yields nothing.
//!
//! Each non-empty section becomes one snippet, so an empty result means the
//! query matched nothing.

use async_trait::async_trait;
use atlance_application::{SearchError, SearchPort};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// DuckDuckGo Instant Answer API endpoint (no API key required).
const DDG_API_URL: &str = "https://api.duckduckgo.com/";

const USER_AGENT: &str = concat!("atlance/", env!("CARGO_PKG_VERSION"));

/// Related topics kept per query.
const MAX_RELATED: usize = 5;

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: DDG_API_URL.to_string(),
        })
    }

    /// Point at a different endpoint (a mirror or a local stub).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchPort for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout
                } else {
                    SearchError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(SearchError::RequestFailed(format!(
                "Search API returned error: {}",
                response.status()
            )));
        }

        // The API answers with `application/x-javascript`, so parse by hand.
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;
        let data: Value =
            serde_json::from_str(&body).map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        let snippets = extract_snippets(&data);
        debug!(query, snippets = snippets.len(), "DuckDuckGo search");
        Ok(snippets)
    }
}

/// Turn an Instant Answer payload into plain-text snippets.
fn extract_snippets(data: &Value) -> Vec<String> {
    let mut snippets = Vec::new();

    if let Some(abstract_text) = data["AbstractText"].as_str()
        && !abstract_text.is_empty()
    {
        match data["AbstractSource"].as_str() {
            Some(source) if !source.is_empty() => {
                snippets.push(format!("{} ({})", abstract_text, source))
            }
            _ => snippets.push(abstract_text.to_string()),
        }
    }

    if let Some(answer) = data["Answer"].as_str()
        && !answer.is_empty()
    {
        snippets.push(answer.to_string());
    }

    if let Some(definition) = data["Definition"].as_str()
        && !definition.is_empty()
    {
        snippets.push(definition.to_string());
    }

    // Topic groups nest their entries under "Topics"; only top-level entries
    // carry text.
    if let Some(topics) = data["RelatedTopics"].as_array() {
        snippets.extend(
            topics
                .iter()
                .filter_map(|t| t["Text"].as_str())
                .filter(|text| !text.is_empty())
                .take(MAX_RELATED)
                .map(str::to_string),
        );
    }

    snippets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_abstract_and_topics() {
        let data = json!({
            "AbstractText": "The Eiffel Tower is a wrought-iron lattice tower in Paris.",
            "AbstractSource": "Wikipedia",
            "AbstractURL": "https://en.wikipedia.org/wiki/Eiffel_Tower",
            "Answer": "",
            "Definition": "",
            "RelatedTopics": [
                { "Text": "Champ de Mars - public greenspace in Paris", "FirstURL": "https://duckduckgo.com/Champ_de_Mars" },
                { "Name": "Landmarks", "Topics": [ { "Text": "nested entry" } ] },
                { "Text": "", "FirstURL": "https://duckduckgo.com/empty" }
            ]
        });

        assert_eq!(
            extract_snippets(&data),
            [
                "The Eiffel Tower is a wrought-iron lattice tower in Paris. (Wikipedia)",
                "Champ de Mars - public greenspace in Paris",
            ]
        );
    }

    #[test]
    fn test_extract_answer_and_definition() {
        let data = json!({
            "AbstractText": "",
            "Answer": "330 m",
            "Definition": "A tower is a tall structure.",
            "RelatedTopics": []
        });
        assert_eq!(
            extract_snippets(&data),
            ["330 m", "A tower is a tall structure."]
        );
    }

    #[test]
    fn test_no_match_yields_no_snippets() {
        let data = json!({
            "AbstractText": "",
            "Answer": "",
            "Definition": "",
            "RelatedTopics": [],
            "Redirect": ""
        });
        assert!(extract_snippets(&data).is_empty());
    }

    #[test]
    fn test_related_topics_are_capped() {
        let topics: Vec<_> = (0..12)
            .map(|i| json!({ "Text": format!("topic {i}") }))
            .collect();
        let data = json!({ "RelatedTopics": topics });
        assert_eq!(extract_snippets(&data).len(), MAX_RELATED);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails() {
        let search = DuckDuckGoSearch::new(Duration::from_secs(2))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/");
        assert!(search.search("Eiffel Tower").await.is_err());
    }
}
