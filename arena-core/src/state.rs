//! Debate state — the single mutable record threaded through every step.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DebateConfig, Persona, Strictness};
use crate::machine::TransitionRecord;
use crate::model::UsageTotals;
use crate::moderator::StructuralWarning;
use crate::verification::GateFailure;

/// One of the two debating positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// Opens every round.
    #[serde(rename = "side_a")]
    A,
    /// Answers side A within the round.
    #[serde(rename = "side_b")]
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    pub fn opponent(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Position label used in prompts.
    pub fn position_label(self) -> &'static str {
        match self {
            Self::A => "proposition (arguing FOR the motion)",
            Self::B => "opposition (arguing AGAINST the motion)",
        }
    }

    /// Short name shown in transcripts.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::A => "Side A",
            Self::B => "Side B",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "side_a"),
            Self::B => write!(f, "side_b"),
        }
    }
}

/// Lifecycle status persisted alongside the round counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl DebateStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for DebateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A generated turn that has not been accepted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftTurn {
    pub round: u32,
    pub side: Side,
    pub model: String,
    pub analysis: Option<String>,
    pub critique: Option<String>,
    pub statement: String,
    /// Whitespace-token count of `statement` after length enforcement.
    pub word_count: u32,
    /// Word count the model claimed for itself, if it reported one.
    pub reported_word_count: Option<u32>,
    /// The statement segment was missing and the raw response was used.
    pub statement_fallback: bool,
    /// Original word count when the statement was cut to the word limit.
    pub truncated_from: Option<u32>,
    /// 0 for the first draft of this side in this round.
    pub attempt: u32,
}

/// A finished, accepted unit of debate content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub round: u32,
    pub side: Side,
    pub model: String,
    pub analysis: Option<String>,
    pub critique: Option<String>,
    pub statement: String,
    pub word_count: u32,
    pub verifications_passed: u32,
    pub verifications_failed: u32,
    /// Whether any earlier draft for this slot was rejected.
    pub was_rejected: bool,
    /// Number of regenerations it took to produce this turn.
    pub regenerations: u32,
    pub accepted_at: DateTime<Utc>,
}

/// Type of a checkable assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    Statistical,
    Historical,
    Scientific,
    Definitional,
    General,
}

impl AssertionKind {
    /// Lenient parse; anything unrecognised is `General`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "statistical" | "statistic" | "numeric" => Self::Statistical,
            "historical" | "history" => Self::Historical,
            "scientific" | "science" => Self::Scientific,
            "definitional" | "definition" => Self::Definitional,
            _ => Self::General,
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statistical => write!(f, "statistical"),
            Self::Historical => write!(f, "historical"),
            Self::Scientific => write!(f, "scientific"),
            Self::Definitional => write!(f, "definitional"),
            Self::General => write!(f, "general"),
        }
    }
}

/// Verdict for one checked assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimVerdict {
    Supported,
    Contradicted,
    Indeterminate,
}

impl fmt::Display for ClaimVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supported => write!(f, "supported"),
            Self::Contradicted => write!(f, "contradicted"),
            Self::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// One checked assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub assertion: String,
    pub kind: AssertionKind,
    pub verdict: ClaimVerdict,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub evidence_refs: Vec<String>,
    pub rationale: String,
}

/// A verification result tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationLogEntry {
    pub round: u32,
    pub side: Side,
    pub attempt: u32,
    /// Whether the draft this result belongs to was accepted.
    pub accepted: bool,
    pub result: VerificationResult,
}

/// Diagnostics recorded during a run. Never drives control flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateMetadata {
    pub warnings: Vec<StructuralWarning>,
    pub gate_failures: Vec<GateFailure>,
    pub transitions: Vec<TransitionRecord>,
    pub usage: UsageTotals,
    /// Drafts rejected by the strict-mode gate.
    pub rejections: u32,
    /// Drafts accepted while still rejected because the retry budget ran out.
    pub forced_acceptances: u32,
}

/// The record threaded through every step of one debate run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateState {
    pub debate_id: String,
    pub config: DebateConfig,
    pub status: DebateStatus,

    /// 0 before the first announcement, then 1..=total_rounds.
    pub round: u32,
    pub speaking_side: Side,

    // Accumulators, append-only.
    pub turns: Vec<Turn>,
    pub verification_log: Vec<VerificationLogEntry>,

    // Scratch, overwritten every step.
    pub draft: Option<DraftTurn>,
    pub verification: Vec<VerificationResult>,
    pub rejected: bool,
    pub retry_counter: u32,
    pub terminal: bool,

    pub metadata: StateMetadata,
}

impl DebateState {
    /// Fresh state at round 0 with empty accumulators.
    pub fn new(debate_id: impl Into<String>, config: DebateConfig) -> Self {
        Self {
            debate_id: debate_id.into(),
            config,
            status: DebateStatus::Pending,
            round: 0,
            speaking_side: Side::A,
            turns: Vec::new(),
            verification_log: Vec::new(),
            draft: None,
            verification: Vec::new(),
            rejected: false,
            retry_counter: 0,
            terminal: false,
            metadata: StateMetadata::default(),
        }
    }

    pub fn motion(&self) -> &str {
        &self.config.motion
    }

    pub fn total_rounds(&self) -> u32 {
        self.config.total_rounds
    }

    pub fn word_limit(&self) -> u32 {
        self.config.word_limit
    }

    pub fn strictness(&self) -> Strictness {
        self.config.strictness
    }

    pub fn model_for(&self, side: Side) -> &str {
        &self.config.side(side).model.model
    }

    pub fn persona_for(&self, side: Side) -> Option<&Persona> {
        self.config.side(side).persona.as_ref()
    }

    /// Reset all scratch fields.
    pub fn clear_scratch(&mut self) {
        self.draft = None;
        self.verification.clear();
        self.rejected = false;
        self.retry_counter = 0;
    }

    pub fn has_turn(&self, round: u32, side: Side) -> bool {
        self.turns.iter().any(|t| t.round == round && t.side == side)
    }

    /// Both sides have an accepted turn for `round`.
    pub fn is_round_complete(&self, round: u32) -> bool {
        Side::BOTH.iter().all(|&side| self.has_turn(round, side))
    }

    pub fn turns_for_round(&self, round: u32) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(move |t| t.round == round)
    }

    /// Most recent accepted turn by `side`.
    pub fn latest_turn_by(&self, side: Side) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.side == side)
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | {} turns | {} warnings | {} gate failures | debate={}",
            self.status,
            self.round,
            self.total_rounds(),
            self.turns.len(),
            self.metadata.warnings.len(),
            self.metadata.gate_failures.len(),
            self.debate_id
        )
    }
}
