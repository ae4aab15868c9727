//! Debate orchestrator — drives the state machine for one debate.
//!
//! Ties together the moderator, turn generator, verification gate and round
//! coordinator. Each [`DebateOrchestrator::step`] performs the work of one
//! phase, applies the resulting [`Event`] through [`Phase::next`] and
//! records the transition. Any fatal error marks the debate failed in the
//! store before it is returned.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{DebateConfig, HARD_REGENERATION_CAP};
use crate::coordinator::{RoundCoordinator, RoundProgress};
use crate::error::{ArenaError, PersistenceError};
use crate::evidence::EvidenceSource;
use crate::generator::TurnGenerator;
use crate::machine::{decide_route, Event, Phase, Route, RouteInput, TransitionRecord};
use crate::model::ModelClient;
use crate::moderator::Moderator;
use crate::persistence::{validate_snapshot, DebateRecord, DebateStore, IntegrityStatus, ResumePoint};
use crate::prompts::PROMPT_VERSION;
use crate::state::{DebateState, DebateStatus, Side};
use crate::verification::VerificationGate;

/// Result of a debate that ran to completion.
#[derive(Debug, Clone)]
pub struct DebateOutcome {
    pub state: DebateState,
    /// The run continued a previously persisted debate.
    pub resumed: bool,
}

impl DebateOutcome {
    pub fn debate_id(&self) -> &str {
        &self.state.debate_id
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        let usage = &self.state.metadata.usage;
        format!(
            "[{}] {} rounds | {} turns | {} rejections | {} forced | {} calls ({} in / {} out tokens) | debate={}",
            self.state.status,
            self.state.round,
            self.state.turns.len(),
            self.state.metadata.rejections,
            self.state.metadata.forced_acceptances,
            usage.calls(),
            usage.input_tokens(),
            usage.output_tokens(),
            self.state.debate_id
        )
    }
}

/// Runs debates against injected model, evidence and storage services.
pub struct DebateOrchestrator {
    moderator: Moderator,
    generator: TurnGenerator,
    gate: VerificationGate,
    coordinator: RoundCoordinator,
    store: Arc<dyn DebateStore>,
    cancel: Option<CancellationToken>,
}

impl DebateOrchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        evidence: Arc<dyn EvidenceSource>,
        store: Arc<dyn DebateStore>,
    ) -> Self {
        Self {
            moderator: Moderator::new(),
            generator: TurnGenerator::new(model.clone()),
            gate: VerificationGate::new(model, evidence),
            coordinator: RoundCoordinator::new(store.clone()),
            store,
            cancel: None,
        }
    }

    /// Abort at the next round boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn store(&self) -> &Arc<dyn DebateStore> {
        &self.store
    }

    /// Run a new debate under a generated id.
    pub async fn run(&self, config: DebateConfig) -> Result<DebateOutcome, ArenaError> {
        let debate_id = Uuid::new_v4().to_string();
        self.run_with_id(&debate_id, config).await
    }

    /// Run a new debate under `debate_id`.
    ///
    /// Configuration is validated before anything is persisted.
    pub async fn run_with_id(
        &self,
        debate_id: &str,
        config: DebateConfig,
    ) -> Result<DebateOutcome, ArenaError> {
        config.validate()?;

        self.store
            .create(&DebateRecord::new(debate_id, config.clone()))
            .await?;

        let mut state = DebateState::new(debate_id, config);
        state.round = 1;
        state.status = DebateStatus::InProgress;
        if let Err(e) = self
            .store
            .set_round_and_status(debate_id, state.round, state.status)
            .await
        {
            let err = ArenaError::from(e);
            self.fail(&mut state, &err).await;
            return Err(err);
        }

        info!(
            debate_id,
            motion = %state.motion(),
            side_a = %state.model_for(Side::A),
            side_b = %state.model_for(Side::B),
            rounds = state.total_rounds(),
            strictness = %state.strictness(),
            prompt_version = PROMPT_VERSION,
            "Debate started"
        );

        self.drive(state, Phase::Announcing, false).await
    }

    /// Continue a persisted debate from its snapshot.
    ///
    /// A completed debate is returned as-is without running anything.
    pub async fn resume(&self, debate_id: &str) -> Result<DebateOutcome, ArenaError> {
        let snapshot = self.store.get_snapshot(debate_id).await?;

        match validate_snapshot(&snapshot) {
            IntegrityStatus::Valid => {}
            IntegrityStatus::Recoverable { warnings } => {
                for warning in &warnings {
                    warn!(debate_id, warning = %warning, "Snapshot integrity warning");
                }
            }
            IntegrityStatus::Corrupted { errors } => {
                return Err(PersistenceError::IntegrityCheckFailed(errors.join("; ")).into());
            }
        }
        snapshot.record.config.validate()?;

        let resume_point = snapshot.resume_point();
        let mut state = snapshot.into_state();

        let (round, phase) = match resume_point {
            ResumePoint::Finished => {
                info!(debate_id, "Debate already complete, nothing to resume");
                return Ok(DebateOutcome {
                    state,
                    resumed: true,
                });
            }
            ResumePoint::At { round, phase } => (round, phase),
        };

        state.round = round;
        state.status = DebateStatus::InProgress;
        if let Phase::GeneratingTurn(side) = phase {
            state.speaking_side = side;
        }
        if let Err(e) = self
            .store
            .set_round_and_status(debate_id, state.round, state.status)
            .await
        {
            let err = ArenaError::from(e);
            self.fail(&mut state, &err).await;
            return Err(err);
        }

        info!(
            debate_id,
            round,
            phase = %phase,
            turns = state.turns.len(),
            "Debate resumed"
        );

        self.drive(state, phase, true).await
    }

    async fn drive(
        &self,
        state: DebateState,
        phase: Phase,
        resumed: bool,
    ) -> Result<DebateOutcome, ArenaError> {
        let span = info_span!("debate", debate_id = %state.debate_id);
        self.drive_inner(state, phase, resumed).instrument(span).await
    }

    async fn drive_inner(
        &self,
        mut state: DebateState,
        mut phase: Phase,
        resumed: bool,
    ) -> Result<DebateOutcome, ArenaError> {
        while !phase.is_terminal() {
            phase = match self.step(&mut state, phase).await {
                Ok(next) => next,
                Err(err) => {
                    self.fail(&mut state, &err).await;
                    return Err(err);
                }
            };
        }

        info!(summary = %state.status_line(), "Debate finished");
        Ok(DebateOutcome { state, resumed })
    }

    /// Do the work of `phase` and move to the next phase.
    pub async fn step(&self, state: &mut DebateState, phase: Phase) -> Result<Phase, ArenaError> {
        let event = match phase {
            Phase::Announcing => {
                if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                    return Err(ArenaError::Cancelled { round: state.round });
                }
                self.moderator.announce(state);
                Event::RoundAnnounced
            }
            Phase::GeneratingTurn(side) => {
                // Retire the previous draft (hand-over or rejected retry).
                self.moderator.retire_draft(state);
                self.generator.generate(state, side).await?;
                Event::TurnDrafted
            }
            Phase::Verifying => {
                self.gate.verify(state).await;
                Event::DraftVerified
            }
            Phase::RoutingAfterVerify => {
                let route = decide_route(RouteInput {
                    strictness: state.strictness(),
                    rejected: state.rejected,
                    retry_counter: state.retry_counter,
                    max_regenerations: state
                        .config
                        .policy
                        .max_regenerations
                        .min(HARD_REGENERATION_CAP),
                    side: state.speaking_side,
                });
                match route {
                    Route::Retry(_) => {
                        self.coordinator.log_rejected(state).await?;
                        state.retry_counter += 1;
                    }
                    Route::HandOver => {
                        self.coordinator.commit_draft(state).await?;
                        state.retry_counter = 0;
                        state.rejected = false;
                        state.verification.clear();
                    }
                    Route::CloseRound => {
                        self.coordinator.commit_draft(state).await?;
                    }
                }
                Event::Routed(route)
            }
            Phase::Transitioning => {
                self.moderator.retire_draft(state);
                let debate_complete = match self.coordinator.close_round(state).await? {
                    RoundProgress::Finished => true,
                    RoundProgress::Advanced { .. } => false,
                    RoundProgress::Incomplete => {
                        warn!(round = state.round, "Re-announcing incomplete round");
                        false
                    }
                };
                Event::RoundClosed { debate_complete }
            }
            Phase::Complete => return Ok(Phase::Complete),
        };

        let next = phase.next(event)?;
        debug!(
            from = %phase,
            to = %next,
            round = state.round,
            retry = state.retry_counter,
            "State transition"
        );
        state.metadata.transitions.push(TransitionRecord {
            from: phase,
            to: next,
            round: state.round,
            at: Utc::now(),
            reason: Some(event.to_string()),
        });
        Ok(next)
    }

    async fn fail(&self, state: &mut DebateState, err: &ArenaError) {
        state.status = DebateStatus::Failed;
        error!(
            debate_id = %state.debate_id,
            round = state.round,
            class = %err.class(),
            error = %err,
            "Debate failed"
        );
        if let Err(e) = self
            .store
            .set_round_and_status(&state.debate_id, state.round, DebateStatus::Failed)
            .await
        {
            error!(
                debate_id = %state.debate_id,
                error = %e,
                "Could not persist failed status"
            );
        }
    }
}
