//! Moderator — round announcements and advisory structural checks.
//!
//! The moderator never blocks the debate. Everything it finds is recorded
//! as a [`StructuralWarning`] in the state metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::VerificationPolicy;
use crate::state::{DebateState, DraftTurn, Side};

/// What is structurally wrong with a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    EmptyStatement,
    BelowMinimum { words: u32, min: u32 },
    AboveLimit { words: u32, limit: u32 },
    ReportedCountMismatch { reported: u32, actual: u32, tolerance: u32 },
    /// The statement segment was missing; the raw response stood in for it.
    StatementFallback,
    /// The statement was cut down to the word limit.
    Truncated { original: u32, limit: u32 },
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyStatement => write!(f, "empty statement"),
            Self::BelowMinimum { words, min } => write!(f, "{} words, minimum {}", words, min),
            Self::AboveLimit { words, limit } => write!(f, "{} words, limit {}", words, limit),
            Self::ReportedCountMismatch {
                reported,
                actual,
                tolerance,
            } => write!(
                f,
                "reported {} words, counted {} (tolerance {})",
                reported, actual, tolerance
            ),
            Self::StatementFallback => write!(f, "statement segment missing"),
            Self::Truncated { original, limit } => {
                write!(f, "truncated from {} to {} words", original, limit)
            }
        }
    }
}

/// A structural problem found in a draft, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralWarning {
    pub round: u32,
    pub side: Side,
    pub attempt: u32,
    pub kind: WarningKind,
    pub recorded_at: DateTime<Utc>,
}

/// Check a draft against the length and format rules.
pub fn validate_structure(
    draft: &DraftTurn,
    word_limit: u32,
    policy: &VerificationPolicy,
) -> Vec<WarningKind> {
    let mut found = Vec::new();

    if draft.statement.trim().is_empty() {
        found.push(WarningKind::EmptyStatement);
    }
    if draft.statement_fallback {
        found.push(WarningKind::StatementFallback);
    }
    if let Some(original) = draft.truncated_from {
        found.push(WarningKind::Truncated {
            original,
            limit: word_limit,
        });
    }

    if draft.word_count < policy.min_words {
        found.push(WarningKind::BelowMinimum {
            words: draft.word_count,
            min: policy.min_words,
        });
    } else if draft.word_count > word_limit {
        found.push(WarningKind::AboveLimit {
            words: draft.word_count,
            limit: word_limit,
        });
    }

    if let Some(reported) = draft.reported_word_count {
        let actual = draft.truncated_from.unwrap_or(draft.word_count);
        if reported.abs_diff(actual) > policy.word_count_tolerance {
            found.push(WarningKind::ReportedCountMismatch {
                reported,
                actual,
                tolerance: policy.word_count_tolerance,
            });
        }
    }

    found
}

/// Opens rounds and retires drafts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Moderator;

impl Moderator {
    pub fn new() -> Self {
        Self
    }

    /// Open the current round: retire any leftover draft and reset scratch.
    ///
    /// Returns the number of warnings recorded for the retired draft.
    pub fn announce(&self, state: &mut DebateState) -> usize {
        let warned = self.retire_draft(state);

        state.clear_scratch();
        state.speaking_side = Side::A;

        info!(
            debate_id = %state.debate_id,
            round = state.round,
            total_rounds = state.total_rounds(),
            motion = %state.motion(),
            "Round announced"
        );

        warned
    }

    /// Take the draft out of scratch, validating its structure first.
    ///
    /// Called whenever a draft is about to be discarded or overwritten, so
    /// every draft is inspected exactly once.
    pub fn retire_draft(&self, state: &mut DebateState) -> usize {
        let Some(draft) = state.draft.take() else {
            return 0;
        };

        let kinds = validate_structure(&draft, state.word_limit(), &state.config.policy);
        let count = kinds.len();
        let now = Utc::now();
        for kind in kinds {
            debug!(
                debate_id = %state.debate_id,
                round = draft.round,
                side = %draft.side,
                attempt = draft.attempt,
                warning = %kind,
                "Structural warning"
            );
            state.metadata.warnings.push(StructuralWarning {
                round: draft.round,
                side: draft.side,
                attempt: draft.attempt,
                kind,
                recorded_at: now,
            });
        }
        count
    }
}
