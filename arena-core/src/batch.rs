//! Concurrent execution of independent debates.

use futures::stream::{self, StreamExt};
use tracing::info;
use uuid::Uuid;

use crate::config::DebateConfig;
use crate::error::ArenaError;
use crate::orchestrator::{DebateOrchestrator, DebateOutcome};

/// Result of one debate in a batch.
#[derive(Debug)]
pub struct BatchEntry {
    /// Position of the config in the input.
    pub index: usize,
    pub debate_id: String,
    pub result: Result<DebateOutcome, ArenaError>,
}

/// Run every config as its own debate, at most `limit` at a time.
///
/// Debates share nothing but the orchestrator's collaborators; one failure
/// never affects the others. Entries come back in input order.
pub async fn run_batch(
    orchestrator: &DebateOrchestrator,
    configs: Vec<DebateConfig>,
    limit: usize,
) -> Vec<BatchEntry> {
    let total = configs.len();
    let mut entries: Vec<BatchEntry> = stream::iter(configs.into_iter().enumerate())
        .map(|(index, config)| async move {
            let debate_id = Uuid::new_v4().to_string();
            let result = orchestrator.run_with_id(&debate_id, config).await;
            BatchEntry {
                index,
                debate_id,
                result,
            }
        })
        .buffer_unordered(limit.max(1))
        .collect()
        .await;
    entries.sort_by_key(|e| e.index);

    let failed = entries.iter().filter(|e| e.result.is_err()).count();
    info!(total, failed, limit, "Batch finished");
    entries
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::tests::sample_config;
    use crate::config::Strictness;
    use crate::error::GenerationError;
    use crate::evidence::NoEvidence;
    use crate::model::{ChatMessage, Completion, ModelClient, ModelConfig};
    use crate::persistence::{DebateStore, InMemoryStore};
    use crate::state::DebateStatus;
    use async_trait::async_trait;

    /// Fails every call made for the model named "broken".
    struct PickyModel;

    #[async_trait]
    impl ModelClient for PickyModel {
        async fn generate(
            &self,
            _conversation: &[ChatMessage],
            config: &ModelConfig,
        ) -> Result<Completion, GenerationError> {
            tokio::task::yield_now().await;
            if config.model == "broken" {
                return Err(GenerationError::RequestFailed("connection reset".into()));
            }
            Ok(Completion::text("<statement>A fine point.</statement>"))
        }
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let store = Arc::new(InMemoryStore::new());
        let orch = DebateOrchestrator::new(Arc::new(PickyModel), Arc::new(NoEvidence), store.clone());

        let good = sample_config()
            .with_rounds(1)
            .with_strictness(Strictness::Disabled);
        let mut bad = good.clone();
        bad.side_b.model.model = "broken".into();

        let entries = run_batch(&orch, vec![good.clone(), bad, good], 2).await;

        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(entries[0].result.is_ok());
        assert!(entries[1].result.is_err());
        assert!(entries[2].result.is_ok());

        let failed = store.get_snapshot(&entries[1].debate_id).await.unwrap();
        assert_eq!(failed.status, DebateStatus::Failed);
        let ok = store.get_snapshot(&entries[2].debate_id).await.unwrap();
        assert_eq!(ok.status, DebateStatus::Completed);
        assert_ne!(entries[0].debate_id, entries[2].debate_id);
    }

    #[tokio::test]
    async fn empty_batch() {
        let orch = DebateOrchestrator::new(
            Arc::new(PickyModel),
            Arc::new(NoEvidence),
            Arc::new(InMemoryStore::new()),
        );
        assert!(run_batch(&orch, Vec::new(), 0).await.is_empty());
    }
}
