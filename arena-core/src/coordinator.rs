//! Round coordinator — turn acceptance, persistence and round advancement.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::ArenaError;
use crate::persistence::DebateStore;
use crate::state::{ClaimVerdict, DebateState, DebateStatus, Turn, VerificationLogEntry};

/// Result of a round-closing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundProgress {
    /// One side has no accepted turn for the current round yet.
    Incomplete,
    /// The next round is ready to be announced.
    Advanced { next_round: u32 },
    /// The last round closed; the debate is complete.
    Finished,
}

/// Converts drafts into turns and keeps the store in step with the state.
pub struct RoundCoordinator {
    store: Arc<dyn DebateStore>,
}

impl RoundCoordinator {
    pub fn new(store: Arc<dyn DebateStore>) -> Self {
        Self { store }
    }

    /// Accept the draft in scratch as a [`Turn`] and persist it.
    ///
    /// The draft stays in scratch so the moderator can still inspect it. A
    /// draft that is still marked rejected is accepted because the retry
    /// budget ran out; it is counted as a forced acceptance.
    ///
    /// Returns `false` when there was nothing to commit.
    pub async fn commit_draft(&self, state: &mut DebateState) -> Result<bool, ArenaError> {
        let Some(draft) = state.draft.clone() else {
            warn!(
                debate_id = %state.debate_id,
                round = state.round,
                "No draft to commit"
            );
            return Ok(false);
        };

        if state.has_turn(draft.round, draft.side) {
            warn!(
                debate_id = %state.debate_id,
                round = draft.round,
                side = %draft.side,
                "Turn already accepted for this slot, skipping commit"
            );
            return Ok(false);
        }

        let forced = state.rejected;
        let turn = Turn {
            round: draft.round,
            side: draft.side,
            model: draft.model,
            analysis: draft.analysis,
            critique: draft.critique,
            statement: draft.statement,
            word_count: draft.word_count,
            verifications_passed: count_verdicts(state, ClaimVerdict::Supported),
            verifications_failed: count_verdicts(state, ClaimVerdict::Contradicted),
            was_rejected: forced || state.retry_counter > 0,
            regenerations: state.retry_counter,
            accepted_at: Utc::now(),
        };
        let entries = log_entries(state, draft.attempt, true);

        self.store.append_turn(&state.debate_id, &turn).await?;
        if !entries.is_empty() {
            self.store
                .append_verifications(&state.debate_id, &entries)
                .await?;
        }

        if forced {
            state.metadata.forced_acceptances += 1;
            warn!(
                debate_id = %state.debate_id,
                round = turn.round,
                side = %turn.side,
                regenerations = turn.regenerations,
                "Regeneration budget exhausted, accepting rejected draft"
            );
        }
        info!(
            debate_id = %state.debate_id,
            round = turn.round,
            side = %turn.side,
            words = turn.word_count,
            passed = turn.verifications_passed,
            failed = turn.verifications_failed,
            regenerations = turn.regenerations,
            "Turn accepted"
        );

        state.turns.push(turn);
        state.verification_log.extend(entries);
        Ok(true)
    }

    /// Persist the verification results of a rejected draft.
    pub async fn log_rejected(&self, state: &mut DebateState) -> Result<(), ArenaError> {
        let Some(attempt) = state.draft.as_ref().map(|d| d.attempt) else {
            return Ok(());
        };
        let entries = log_entries(state, attempt, false);
        if entries.is_empty() {
            return Ok(());
        }

        self.store
            .append_verifications(&state.debate_id, &entries)
            .await?;
        debug!(
            debate_id = %state.debate_id,
            round = state.round,
            attempt,
            entries = entries.len(),
            "Rejected draft verifications logged"
        );
        state.verification_log.extend(entries);
        Ok(())
    }

    /// Close the current round if both sides have spoken.
    pub async fn close_round(&self, state: &mut DebateState) -> Result<RoundProgress, ArenaError> {
        if !state.is_round_complete(state.round) {
            warn!(
                debate_id = %state.debate_id,
                round = state.round,
                "Round closed before both sides spoke"
            );
            return Ok(RoundProgress::Incomplete);
        }

        if state.round >= state.total_rounds() {
            self.store
                .set_round_and_status(&state.debate_id, state.round, DebateStatus::Completed)
                .await?;
            state.terminal = true;
            state.status = DebateStatus::Completed;
            info!(
                debate_id = %state.debate_id,
                rounds = state.round,
                turns = state.turns.len(),
                "Debate complete"
            );
            return Ok(RoundProgress::Finished);
        }

        let next_round = state.round + 1;
        self.store
            .set_round_and_status(&state.debate_id, next_round, DebateStatus::InProgress)
            .await?;
        state.round = next_round;
        state.clear_scratch();
        debug!(
            debate_id = %state.debate_id,
            round = next_round,
            "Round advanced"
        );
        Ok(RoundProgress::Advanced { next_round })
    }
}

fn count_verdicts(state: &DebateState, verdict: ClaimVerdict) -> u32 {
    let n = state
        .verification
        .iter()
        .filter(|r| r.verdict == verdict)
        .count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn log_entries(state: &DebateState, attempt: u32, accepted: bool) -> Vec<VerificationLogEntry> {
    state
        .verification
        .iter()
        .map(|result| VerificationLogEntry {
            round: state.round,
            side: state.speaking_side,
            attempt,
            accepted,
            result: result.clone(),
        })
        .collect()
}
