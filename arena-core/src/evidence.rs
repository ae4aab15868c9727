//! Evidence lookup interface used by the verification gate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// URL or other stable reference to the source.
    pub source_ref: String,
    pub snippet: String,
}

impl Evidence {
    pub fn new(source_ref: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            snippet: snippet.into(),
        }
    }
}

/// Failure an evidence source chose not to absorb.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("evidence lookup failed: {0}")]
pub struct EvidenceError(pub String);

/// The evidence-lookup collaborator.
///
/// Implementations are expected to absorb their own failures and return an
/// empty list. An `Err` is still tolerated: the gate stops verifying and
/// fails open.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Evidence>, EvidenceError>;
}

/// An evidence source that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvidence;

#[async_trait]
impl EvidenceSource for NoEvidence {
    async fn search(&self, _query: &str) -> Result<Vec<Evidence>, EvidenceError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_evidence_is_empty() {
        let hits = NoEvidence.search("anything").await.unwrap();
        assert!(hits.is_empty());
    }
}
