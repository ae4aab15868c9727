//! Debate state machine — phases, events and the pure transition function.
//!
//! Every edge of the debate graph lives here so that it can be tested
//! without any model, store or async runtime:
//!
//! ```text
//! Announcing           + RoundAnnounced          → GeneratingTurn(A)
//! GeneratingTurn(side) + TurnDrafted             → Verifying
//! Verifying            + DraftVerified           → RoutingAfterVerify
//! RoutingAfterVerify   + Routed(Retry(side))     → GeneratingTurn(side)
//! RoutingAfterVerify   + Routed(HandOver)        → GeneratingTurn(B)
//! RoutingAfterVerify   + Routed(CloseRound)      → Transitioning
//! Transitioning        + RoundClosed { false }   → Announcing
//! Transitioning        + RoundClosed { true }    → Complete
//! ```
//!
//! The routing decision itself is [`decide_route`]: retry takes priority
//! over handing the floor to side B, which takes priority over closing the
//! round.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Strictness;
use crate::state::Side;

/// Phase of one debate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Moderator opens a round.
    Announcing,
    /// A side is drafting its turn.
    GeneratingTurn(Side),
    /// The verification gate is checking the draft.
    Verifying,
    /// Deciding between retry, hand-over and closing the round.
    RoutingAfterVerify,
    /// Round coordinator closes the round.
    Transitioning,
    /// All rounds done. Terminal.
    Complete,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Apply `event` to this phase.
    pub fn next(self, event: Event) -> Result<Phase, IllegalTransition> {
        use Phase::*;

        let next = match (self, event) {
            (Announcing, Event::RoundAnnounced) => GeneratingTurn(Side::A),
            (GeneratingTurn(_), Event::TurnDrafted) => Verifying,
            (Verifying, Event::DraftVerified) => RoutingAfterVerify,
            (RoutingAfterVerify, Event::Routed(Route::Retry(side))) => GeneratingTurn(side),
            (RoutingAfterVerify, Event::Routed(Route::HandOver)) => GeneratingTurn(Side::B),
            (RoutingAfterVerify, Event::Routed(Route::CloseRound)) => Transitioning,
            (Transitioning, Event::RoundClosed { debate_complete }) => {
                if debate_complete {
                    Complete
                } else {
                    Announcing
                }
            }
            (from, event) => return Err(IllegalTransition { from, event }),
        };

        Ok(next)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Announcing => write!(f, "announcing"),
            Self::GeneratingTurn(side) => write!(f, "generating_turn({})", side),
            Self::Verifying => write!(f, "verifying"),
            Self::RoutingAfterVerify => write!(f, "routing_after_verify"),
            Self::Transitioning => write!(f, "transitioning"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Outcome of the routing decision after verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Regenerate for the same side.
    Retry(Side),
    /// Side A is done; side B speaks next.
    HandOver,
    /// Side B is done; close the round.
    CloseRound,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry(side) => write!(f, "retry({})", side),
            Self::HandOver => write!(f, "hand_over"),
            Self::CloseRound => write!(f, "close_round"),
        }
    }
}

/// Something that happened in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    RoundAnnounced,
    TurnDrafted,
    DraftVerified,
    Routed(Route),
    RoundClosed { debate_complete: bool },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundAnnounced => write!(f, "round_announced"),
            Self::TurnDrafted => write!(f, "turn_drafted"),
            Self::DraftVerified => write!(f, "draft_verified"),
            Self::Routed(route) => write!(f, "routed({})", route),
            Self::RoundClosed { debate_complete } => {
                write!(f, "round_closed(complete={})", debate_complete)
            }
        }
    }
}

/// Inputs to the routing decision, copied out of the debate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteInput {
    pub strictness: Strictness,
    pub rejected: bool,
    pub retry_counter: u32,
    pub max_regenerations: u32,
    pub side: Side,
}

/// Decide where to go after verification.
pub fn decide_route(input: RouteInput) -> Route {
    if input.strictness == Strictness::Strict
        && input.rejected
        && input.retry_counter < input.max_regenerations
    {
        return Route::Retry(input.side);
    }

    match input.side {
        Side::A => Route::HandOver,
        Side::B => Route::CloseRound,
    }
}

/// Error returned when an event does not apply to the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal transition: {event} in phase {from}")]
pub struct IllegalTransition {
    pub from: Phase,
    pub event: Event,
}

/// A recorded phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Phase,
    pub to: Phase,
    pub round: u32,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
