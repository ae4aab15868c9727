//! Command wiring: run, resume, judge and inspect stored debates.

use std::sync::Arc;

use anyhow::{Context, Result};
use arena_core::{
    run_batch, validate_snapshot, ArenaError, BatchEntry, ConsensusVerdict, DebateOrchestrator,
    DebateOutcome, DebateStore, EvidenceSource, IntegrityStatus, Judge, ModelClient, NoEvidence,
    Transcript,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::llm::OpenAiCompatClient;
use crate::search::HttpEvidenceSource;
use crate::store::JsonFileStore;

/// Orchestrator, judge and store assembled from one [`RunnerConfig`].
pub struct Arena {
    orchestrator: DebateOrchestrator,
    judge: Option<Judge>,
    store: Arc<dyn DebateStore>,
    concurrency: usize,
}

impl Arena {
    /// Build HTTP collaborators and open the file store.
    pub async fn from_config(config: &RunnerConfig, cancel: CancellationToken) -> Result<Self> {
        config.validate_judge()?;

        let model: Arc<dyn ModelClient> = Arc::new(OpenAiCompatClient::new(config.model.clone())?);
        let evidence: Arc<dyn EvidenceSource> = match &config.search {
            Some(endpoint) => Arc::new(HttpEvidenceSource::new(endpoint.clone())?),
            None => {
                warn!("No search endpoint configured, claims will verify as indeterminate");
                Arc::new(NoEvidence)
            }
        };
        let store: Arc<dyn DebateStore> = Arc::new(
            JsonFileStore::open(&config.state_dir)
                .await
                .context(format!("Failed to open state dir {}", config.state_dir.display()))?,
        );

        let judge = config
            .judge
            .clone()
            .map(|judge_config| Judge::new(model.clone(), judge_config));
        let arena = Self::with_parts(model, evidence, store, judge, config.concurrency);
        Ok(arena.with_cancellation(cancel))
    }

    /// Assemble from already-built collaborators.
    pub fn with_parts(
        model: Arc<dyn ModelClient>,
        evidence: Arc<dyn EvidenceSource>,
        store: Arc<dyn DebateStore>,
        judge: Option<Judge>,
        concurrency: usize,
    ) -> Self {
        Self {
            orchestrator: DebateOrchestrator::new(model, evidence, store.clone()),
            judge,
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.orchestrator = self.orchestrator.with_cancellation(cancel);
        self
    }

    pub fn store(&self) -> &Arc<dyn DebateStore> {
        &self.store
    }

    /// Run every configured debate.
    ///
    /// The whole debate list is validated before any debate starts.
    pub async fn run_all(&self, config: &RunnerConfig) -> Result<Vec<BatchEntry>> {
        config.validate_debates()?;
        info!(
            debates = config.debates.len(),
            concurrency = self.concurrency,
            "Running debates"
        );
        Ok(run_batch(&self.orchestrator, config.debates.clone(), self.concurrency).await)
    }

    /// Continue a stored debate to completion.
    pub async fn resume(&self, debate_id: &str) -> Result<DebateOutcome, ArenaError> {
        self.orchestrator.resume(debate_id).await
    }

    /// Judge a finished debate and persist the verdict.
    pub async fn judge_outcome(&self, outcome: &DebateOutcome) -> Result<ConsensusVerdict> {
        let transcript = Transcript::from_state(&outcome.state)?;
        self.judge_transcript(&transcript).await
    }

    /// Judge a stored, completed debate and persist the verdict.
    pub async fn judge_stored(&self, debate_id: &str) -> Result<ConsensusVerdict> {
        self.judge()?;
        let snapshot = self
            .store
            .get_snapshot(debate_id)
            .await
            .context(format!("Failed to load debate {}", debate_id))?;
        let transcript = Transcript::from_snapshot(&snapshot)?;
        self.judge_transcript(&transcript).await
    }

    async fn judge_transcript(&self, transcript: &Transcript) -> Result<ConsensusVerdict> {
        let verdict = self.judge()?.evaluate(transcript).await?;
        self.store
            .save_verdict(&transcript.debate_id, &verdict)
            .await
            .context("Failed to persist verdict")?;
        info!(
            debate_id = %transcript.debate_id,
            winner = %verdict.final_winner,
            tiebreaker = verdict.tiebreaker_used(),
            "Verdict saved"
        );
        Ok(verdict)
    }

    pub fn has_judge(&self) -> bool {
        self.judge.is_some()
    }

    fn judge(&self) -> Result<&Judge> {
        self.judge
            .as_ref()
            .context("No [judge] section configured")
    }

    /// Human-readable description of a stored debate.
    pub async fn describe(&self, debate_id: &str) -> Result<String> {
        let snapshot = self
            .store
            .get_snapshot(debate_id)
            .await
            .context(format!("Failed to load debate {}", debate_id))?;

        let mut out = format!(
            "debate {}\n  motion:  {}\n  status:  {}\n  round:   {}/{}\n  turns:   {}\n  updated: {}\n",
            snapshot.debate_id(),
            snapshot.record.config.motion,
            snapshot.status,
            snapshot.round,
            snapshot.record.config.total_rounds,
            snapshot.turns.len(),
            snapshot.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        match validate_snapshot(&snapshot) {
            IntegrityStatus::Valid => out.push_str("  integrity: valid\n"),
            IntegrityStatus::Recoverable { warnings } => {
                out.push_str(&format!("  integrity: recoverable ({})\n", warnings.join("; ")))
            }
            IntegrityStatus::Corrupted { errors } => {
                out.push_str(&format!("  integrity: corrupted ({})\n", errors.join("; ")))
            }
        }
        for turn in &snapshot.turns {
            out.push_str(&format!(
                "  - round {} {} [{}] {} words, {} passed / {} failed{}\n",
                turn.round,
                turn.side,
                turn.model,
                turn.word_count,
                turn.verifications_passed,
                turn.verifications_failed,
                if turn.was_rejected { ", regenerated" } else { "" }
            ));
        }
        if let Some(verdict) = &snapshot.verdict {
            out.push_str(&format!("  verdict: {}\n", verdict.summary_line()));
        }
        Ok(out)
    }
}
