//! Error taxonomy for debate orchestration.
//!
//! | Class              | Fatal | Raised by                          |
//! |--------------------|-------|------------------------------------|
//! | Generation         | yes   | turn generator, judge              |
//! | Verification       | no    | verification gate (fails open)     |
//! | JudgeParse         | no    | judge (degrades to a tie verdict)  |
//! | StructuralWarning  | no    | moderator (advisory only)          |
//! | Configuration      | yes   | config validation, before any step |
//! | Persistence        | yes   | debate store                       |
//! | Cancelled          | yes   | round-boundary cancellation        |
//!
//! Only fatal classes ever surface as [`ArenaError`]; the others are
//! recorded in [`crate::state::StateMetadata`] for observability.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::machine::IllegalTransition;
use crate::state::Side;

/// Failure of the external model-invocation layer after its own retries.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("model request failed: {0}")]
    RequestFailed(String),

    #[error("model returned status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("model returned no content")]
    EmptyResponse,

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    /// Whether a model client may retry this error under its own policy.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::RateLimited { .. } | Self::Timeout(_) => true,
            Self::BadStatus { status, .. } => *status >= 500 || *status == 429,
            Self::EmptyResponse => false,
        }
    }
}

/// Invalid debate configuration. Always raised before the state machine runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("both sides resolve to the same model identity: {0}")]
    SameModelBothSides(String),

    #[error("total rounds {got} outside {min}..={max}")]
    RoundsOutOfRange { got: u32, min: u32, max: u32 },

    #[error("word limit {got} outside {min}..={max}")]
    WordLimitOutOfRange { got: u32, min: u32, max: u32 },

    #[error("motion must not be empty")]
    EmptyMotion,

    #[error("model identity for {0} must not be empty")]
    EmptyModel(Side),

    #[error("invalid verification policy: {0}")]
    InvalidPolicy(String),
}

/// Failure of the debate store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("debate {0} not found")]
    NotFound(String),

    #[error("debate {0} already exists")]
    AlreadyExists(String),

    #[error("storage io failed: {0}")]
    Io(String),

    #[error("serialize failed: {0}")]
    Serialize(String),

    #[error("deserialize failed: {0}")]
    Deserialize(String),

    #[error("version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("integrity check failed: {0}")]
    IntegrityCheckFailed(String),
}

/// Observability class of a failure, mirroring the table in the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Generation,
    Verification,
    JudgeParse,
    StructuralWarning,
    Configuration,
    Persistence,
    Cancelled,
    Internal,
}

impl ErrorClass {
    /// Whether errors of this class abort the debate.
    pub fn is_fatal(self) -> bool {
        !matches!(
            self,
            Self::Verification | Self::JudgeParse | Self::StructuralWarning
        )
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation => write!(f, "generation"),
            Self::Verification => write!(f, "verification"),
            Self::JudgeParse => write!(f, "judge_parse"),
            Self::StructuralWarning => write!(f, "structural_warning"),
            Self::Configuration => write!(f, "configuration"),
            Self::Persistence => write!(f, "persistence"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Errors that abort a debate run.
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error("generation failed for {side} in round {round}: {source}")]
    GenerationFailed {
        side: Side,
        round: u32,
        #[source]
        source: GenerationError,
    },

    #[error("judge evaluation failed: {0}")]
    JudgeFailed(#[source] GenerationError),

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    #[error("debate cancelled at the round {round} boundary")]
    Cancelled { round: u32 },

    #[error("debate {0} is not complete")]
    NotComplete(String),
}

impl ArenaError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::GenerationFailed { .. } | Self::JudgeFailed(_) => ErrorClass::Generation,
            Self::Configuration(_) => ErrorClass::Configuration,
            Self::Persistence(_) => ErrorClass::Persistence,
            Self::Cancelled { .. } => ErrorClass::Cancelled,
            Self::IllegalTransition(_) | Self::NotComplete(_) => ErrorClass::Internal,
        }
    }
}
