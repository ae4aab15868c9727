//! Debate persistence — durable turns, round/status, and resume.
//!
//! A store only ever sees accepted turns, verification log entries and the
//! round/status pair. Scratch state is never persisted: a resumed debate
//! rebuilds it as empty from the [`DebateSnapshot`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DebateConfig;
use crate::error::PersistenceError;
use crate::judge::ConsensusVerdict;
use crate::machine::Phase;
use crate::state::{DebateState, DebateStatus, Side, Turn, VerificationLogEntry};

/// Identity and configuration of a debate, written once at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRecord {
    pub debate_id: String,
    pub config: DebateConfig,
    pub created_at: DateTime<Utc>,
}

impl DebateRecord {
    pub fn new(debate_id: impl Into<String>, config: DebateConfig) -> Self {
        Self {
            debate_id: debate_id.into(),
            config,
            created_at: Utc::now(),
        }
    }
}

/// Everything a store knows about one debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateSnapshot {
    /// Schema version for forward compatibility.
    pub version: u32,
    pub record: DebateRecord,
    pub round: u32,
    pub status: DebateStatus,
    pub turns: Vec<Turn>,
    pub verifications: Vec<VerificationLogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ConsensusVerdict>,
    pub updated_at: DateTime<Utc>,
}

/// Where a rebuilt debate picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// Nothing left to run.
    Finished,
    /// Continue the state machine from `phase` in `round`.
    At { round: u32, phase: Phase },
}

impl DebateSnapshot {
    /// Current schema version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Empty snapshot for a newly created debate.
    pub fn new(record: DebateRecord) -> Self {
        let updated_at = record.created_at;
        Self {
            version: Self::CURRENT_VERSION,
            record,
            round: 0,
            status: DebateStatus::Pending,
            turns: Vec::new(),
            verifications: Vec::new(),
            verdict: None,
            updated_at,
        }
    }

    pub fn debate_id(&self) -> &str {
        &self.record.debate_id
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistenceError::Serialize(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| PersistenceError::Deserialize(e.to_string()))?;

        if snapshot.version > Self::CURRENT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: Self::CURRENT_VERSION,
                found: snapshot.version,
            });
        }

        Ok(snapshot)
    }

    fn has_turn(&self, round: u32, side: Side) -> bool {
        self.turns.iter().any(|t| t.round == round && t.side == side)
    }

    /// Work out where the state machine should continue.
    ///
    /// A round with only side A's turn resumes at side B's generation. A
    /// round with both turns resumes at round closing, so the round counter
    /// is advanced exactly once.
    pub fn resume_point(&self) -> ResumePoint {
        if self.status == DebateStatus::Completed {
            return ResumePoint::Finished;
        }

        let round = self.round.max(1);
        let phase = match (self.has_turn(round, Side::A), self.has_turn(round, Side::B)) {
            (true, true) => Phase::Transitioning,
            (true, false) => Phase::GeneratingTurn(Side::B),
            _ => Phase::Announcing,
        };
        ResumePoint::At { round, phase }
    }

    /// Rebuild the in-memory state with empty scratch.
    pub fn into_state(self) -> DebateState {
        let mut state = DebateState::new(self.record.debate_id, self.record.config);
        state.round = self.round;
        state.status = self.status;
        state.turns = self.turns;
        state.verification_log = self.verifications;
        state.terminal = self.status == DebateStatus::Completed;
        state
    }
}

/// Integrity check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    /// Snapshot is valid and can be resumed.
    Valid,
    /// Snapshot has minor issues but is recoverable.
    Recoverable { warnings: Vec<String> },
    /// Snapshot is corrupted and cannot be used.
    Corrupted { errors: Vec<String> },
}

impl IntegrityStatus {
    /// Whether resume is safe.
    pub fn can_resume(&self) -> bool {
        matches!(self, Self::Valid | Self::Recoverable { .. })
    }
}

/// Validate a snapshot's integrity before resuming.
pub fn validate_snapshot(snapshot: &DebateSnapshot) -> IntegrityStatus {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let total = snapshot.record.config.total_rounds;

    if snapshot.version > DebateSnapshot::CURRENT_VERSION {
        errors.push(format!(
            "version {} > current {}",
            snapshot.version,
            DebateSnapshot::CURRENT_VERSION
        ));
    }

    if snapshot.round > total {
        errors.push(format!(
            "round {} exceeds total_rounds {}",
            snapshot.round, total
        ));
    }

    // Accepted turns must form a gap-free prefix of (round, side) slots.
    let mut seen: Vec<(u32, Side)> = Vec::new();
    for turn in &snapshot.turns {
        if turn.round == 0 || turn.round > snapshot.round {
            errors.push(format!(
                "turn for round {} outside persisted round {}",
                turn.round, snapshot.round
            ));
        }
        if seen.contains(&(turn.round, turn.side)) {
            errors.push(format!(
                "duplicate turn for round {} {}",
                turn.round, turn.side
            ));
        }
        seen.push((turn.round, turn.side));
    }
    for (round, side) in &seen {
        if *side == Side::B && !seen.contains(&(*round, Side::A)) {
            errors.push(format!("round {} has a side_b turn without side_a", round));
        }
    }
    for round in 1..snapshot.round {
        if !(snapshot.has_turn(round, Side::A) && snapshot.has_turn(round, Side::B)) {
            errors.push(format!("round {} is incomplete", round));
        }
    }

    if snapshot.status == DebateStatus::Completed
        && !(1..=total).all(|r| snapshot.has_turn(r, Side::A) && snapshot.has_turn(r, Side::B))
    {
        errors.push("status is completed but rounds are missing turns".to_string());
    }

    for entry in &snapshot.verifications {
        if entry.round > snapshot.round {
            warnings.push(format!(
                "verification entry for round {} exceeds round {}",
                entry.round, snapshot.round
            ));
        } else if entry.accepted && !snapshot.has_turn(entry.round, entry.side) {
            warnings.push(format!(
                "accepted verification for round {} {} has no turn",
                entry.round, entry.side
            ));
        }
    }

    if snapshot.status == DebateStatus::Failed {
        warnings.push("debate previously failed".to_string());
    }

    if !errors.is_empty() {
        IntegrityStatus::Corrupted { errors }
    } else if !warnings.is_empty() {
        IntegrityStatus::Recoverable { warnings }
    } else {
        IntegrityStatus::Valid
    }
}

/// The persistence collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DebateStore: Send + Sync {
    /// Register a new debate. Fails with `AlreadyExists` on id reuse.
    async fn create(&self, record: &DebateRecord) -> Result<(), PersistenceError>;

    async fn append_turn(&self, debate_id: &str, turn: &Turn) -> Result<(), PersistenceError>;

    async fn append_verifications(
        &self,
        debate_id: &str,
        entries: &[VerificationLogEntry],
    ) -> Result<(), PersistenceError>;

    async fn set_round_and_status(
        &self,
        debate_id: &str,
        round: u32,
        status: DebateStatus,
    ) -> Result<(), PersistenceError>;

    async fn get_snapshot(&self, debate_id: &str) -> Result<DebateSnapshot, PersistenceError>;

    async fn save_verdict(
        &self,
        debate_id: &str,
        verdict: &ConsensusVerdict,
    ) -> Result<(), PersistenceError>;
}

/// Process-local store, for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    debates: Mutex<HashMap<String, DebateSnapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_snapshot<T>(
        &self,
        debate_id: &str,
        f: impl FnOnce(&mut DebateSnapshot) -> T,
    ) -> Result<T, PersistenceError> {
        let mut debates = self
            .debates
            .lock()
            .map_err(|_| PersistenceError::Io("store lock poisoned".to_string()))?;
        let snapshot = debates
            .get_mut(debate_id)
            .ok_or_else(|| PersistenceError::NotFound(debate_id.to_string()))?;
        let out = f(snapshot);
        snapshot.updated_at = Utc::now();
        Ok(out)
    }

    /// Replace a stored snapshot wholesale.
    pub fn insert_snapshot(&self, snapshot: DebateSnapshot) -> Result<(), PersistenceError> {
        let mut debates = self
            .debates
            .lock()
            .map_err(|_| PersistenceError::Io("store lock poisoned".to_string()))?;
        debates.insert(snapshot.debate_id().to_string(), snapshot);
        Ok(())
    }
}

#[async_trait]
impl DebateStore for InMemoryStore {
    async fn create(&self, record: &DebateRecord) -> Result<(), PersistenceError> {
        let mut debates = self
            .debates
            .lock()
            .map_err(|_| PersistenceError::Io("store lock poisoned".to_string()))?;
        if debates.contains_key(&record.debate_id) {
            return Err(PersistenceError::AlreadyExists(record.debate_id.clone()));
        }
        debates.insert(
            record.debate_id.clone(),
            DebateSnapshot::new(record.clone()),
        );
        Ok(())
    }

    async fn append_turn(&self, debate_id: &str, turn: &Turn) -> Result<(), PersistenceError> {
        self.with_snapshot(debate_id, |s| s.turns.push(turn.clone()))
    }

    async fn append_verifications(
        &self,
        debate_id: &str,
        entries: &[VerificationLogEntry],
    ) -> Result<(), PersistenceError> {
        self.with_snapshot(debate_id, |s| s.verifications.extend_from_slice(entries))
    }

    async fn set_round_and_status(
        &self,
        debate_id: &str,
        round: u32,
        status: DebateStatus,
    ) -> Result<(), PersistenceError> {
        self.with_snapshot(debate_id, |s| {
            s.round = round;
            s.status = status;
        })
    }

    async fn get_snapshot(&self, debate_id: &str) -> Result<DebateSnapshot, PersistenceError> {
        self.with_snapshot(debate_id, |s| s.clone())
    }

    async fn save_verdict(
        &self,
        debate_id: &str,
        verdict: &ConsensusVerdict,
    ) -> Result<(), PersistenceError> {
        self.with_snapshot(debate_id, |s| s.verdict = Some(verdict.clone()))
    }
}
