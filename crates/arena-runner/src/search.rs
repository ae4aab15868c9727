//! HTTP evidence search.
//!
//! Posts `{"query", "max_results"}` to a JSON search endpoint and reads back
//! `{"results": [{"url", "snippet"}]}`. Every failure is absorbed: the
//! verification gate sees an empty hit list and rules the claim
//! indeterminate.

use anyhow::Context;
use arena_core::{Evidence, EvidenceError, EvidenceSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EndpointConfig;

pub const DEFAULT_MAX_RESULTS: usize = 5;

#[derive(Debug, Error)]
enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(alias = "source_ref", alias = "link")]
    url: String,
    #[serde(default, alias = "content", alias = "text")]
    snippet: String,
}

/// Evidence source backed by an HTTP search service.
pub struct HttpEvidenceSource {
    http: reqwest::Client,
    endpoint: EndpointConfig,
    max_results: usize,
}

impl HttpEvidenceSource {
    pub fn new(endpoint: EndpointConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(endpoint.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint,
            max_results: DEFAULT_MAX_RESULTS,
        })
    }

    async fn query(&self, query: &str) -> Result<Vec<Evidence>, SearchError> {
        let mut builder = self.http.post(&self.endpoint.url).json(&SearchRequest {
            query,
            max_results: self.max_results,
        });
        if let Some(key) = &self.endpoint.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status, body });
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed
            .results
            .into_iter()
            .filter(|hit| !hit.url.trim().is_empty())
            .take(self.max_results)
            .map(|hit| Evidence::new(hit.url, hit.snippet))
            .collect())
    }
}

#[async_trait]
impl EvidenceSource for HttpEvidenceSource {
    async fn search(&self, query: &str) -> Result<Vec<Evidence>, EvidenceError> {
        match self.query(query).await {
            Ok(hits) => {
                debug!(hits = hits.len(), "Evidence search complete");
                Ok(hits)
            }
            Err(e) => {
                warn!(error = %e, "Evidence search failed, treating as no evidence");
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_aliases() {
        let parsed: SearchResponse = serde_json::from_str(
            r#"{"results":[
                {"url":"https://a.example","snippet":"alpha"},
                {"link":"https://b.example","content":"beta"},
                {"source_ref":"https://c.example"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(parsed.results.len(), 3);
        assert_eq!(parsed.results[1].url, "https://b.example");
        assert_eq!(parsed.results[1].snippet, "beta");
        assert!(parsed.results[2].snippet.is_empty());
    }

    #[test]
    fn test_missing_results_is_empty() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }
}
