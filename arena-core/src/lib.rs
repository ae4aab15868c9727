//! Debate Arena orchestration core
//!
//! This library runs a multi-round debate between two independently
//! configured language models and judges the finished transcript.
//!
//! # Components
//!
//! - [`generator::TurnGenerator`]: one model call per draft turn, tolerant
//!   parsing of the analysis / critique / statement segments
//! - [`verification::VerificationGate`]: assertion extraction, evidence
//!   lookup and per-assertion verdicts; fails open on internal errors
//! - [`moderator::Moderator`]: round announcements, scratch resets and
//!   advisory structural checks
//! - [`coordinator::RoundCoordinator`]: turn acceptance, persistence and
//!   round advancement
//! - [`orchestrator::DebateOrchestrator`]: the explicit state machine that
//!   drives the above for one debate, with resume support
//! - [`judge::Judge`]: order-swapped double evaluation with a tiebreaker path
//!
//! # Flow
//!
//! ```text
//! Announcing → GeneratingTurn(A) → Verifying → RoutingAfterVerify
//!                    ▲                               │
//!                    ├──── retry same side ──────────┤ (strict + rejected + budget left)
//!                    └──── GeneratingTurn(B) ────────┤ (side A done)
//!                                                    ▼
//!                                             Transitioning ── more rounds ──▶ Announcing
//!                                                    │
//!                                                    └── last round ──▶ Complete
//! ```
//!
//! External services (model invocation, evidence search, storage) are
//! injected as trait objects; see [`model`], [`evidence`] and [`persistence`].

#![allow(clippy::uninlined_format_args)]

pub mod batch;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod evidence;
pub mod generator;
pub mod judge;
pub mod machine;
pub mod model;
pub mod moderator;
pub mod orchestrator;
pub mod parse;
pub mod persistence;
pub mod prompts;
pub mod state;
pub mod verification;

pub use batch::{run_batch, BatchEntry};
pub use config::{DebateConfig, Persona, SideConfig, Strictness, VerificationPolicy};
pub use coordinator::{RoundCoordinator, RoundProgress};
pub use error::{ArenaError, ConfigError, ErrorClass, GenerationError, PersistenceError};
pub use evidence::{Evidence, EvidenceError, EvidenceSource, NoEvidence};
pub use generator::TurnGenerator;
pub use judge::{
    ConsensusVerdict, DefectSeverity, Judge, JudgeConfig, JudgeVerdict, ReasoningDefect,
    RubricScores, Transcript, Winner,
};
pub use machine::{decide_route, Event, IllegalTransition, Phase, Route, RouteInput};
pub use model::{
    CallPurpose, ChatMessage, ChatRole, Completion, ModelClient, ModelConfig, UsageTotals,
};
pub use moderator::{Moderator, StructuralWarning, WarningKind};
pub use orchestrator::{DebateOrchestrator, DebateOutcome};
pub use persistence::{
    validate_snapshot, DebateRecord, DebateSnapshot, DebateStore, InMemoryStore, IntegrityStatus,
    ResumePoint,
};
pub use state::{
    AssertionKind, ClaimVerdict, DebateState, DebateStatus, DraftTurn, Side, Turn,
    VerificationLogEntry, VerificationResult,
};
pub use verification::{GateFailure, GateStage, VerificationGate};
