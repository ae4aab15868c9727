//! Debate configuration and validation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::ModelConfig;
use crate::state::Side;

pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 10;
pub const MIN_WORD_LIMIT: u32 = 200;
pub const MAX_WORD_LIMIT: u32 = 1000;
/// Upper bound on strict-mode regenerations per side per round.
pub const HARD_REGENERATION_CAP: u32 = 3;
/// Upper bound on assertions extracted from one draft.
pub const MAX_ASSERTIONS: usize = 5;

/// How verification results affect turn acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// No verification calls at all.
    Disabled,
    /// Verify and log, never reject.
    #[default]
    Standard,
    /// Contradicted assertions reject the draft and trigger regeneration.
    Strict,
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::Standard => write!(f, "standard"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Optional styling for one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    /// Free-form style instruction, e.g. "terse, cites economists".
    pub style: String,
}

/// Model and persona bound to one side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub persona: Option<Persona>,
}

impl SideConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: ModelConfig::new(model),
            persona: None,
        }
    }

    pub fn with_persona(mut self, name: &str, style: &str) -> Self {
        self.persona = Some(Persona {
            name: name.to_string(),
            style: style.to_string(),
        });
        self
    }
}

/// Policy constants for the verification gate, moderator and retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationPolicy {
    /// Strict-mode regenerations allowed per side per round.
    pub max_regenerations: u32,
    /// Allowed gap between a reported and the actual word count.
    pub word_count_tolerance: u32,
    /// Statements shorter than this draw a structural warning.
    pub min_words: u32,
    /// Contradicted assertions needed to reject a draft.
    pub contradiction_threshold: u32,
    pub max_assertions: usize,
    /// Search hits passed to the verdict call per assertion.
    pub evidence_top_k: usize,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            max_regenerations: HARD_REGENERATION_CAP,
            word_count_tolerance: 10,
            min_words: 200,
            contradiction_threshold: 1,
            max_assertions: MAX_ASSERTIONS,
            evidence_top_k: 3,
        }
    }
}

/// Everything needed to run one debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateConfig {
    pub motion: String,
    pub side_a: SideConfig,
    pub side_b: SideConfig,
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u32,
    #[serde(default = "default_word_limit")]
    pub word_limit: u32,
    #[serde(default)]
    pub strictness: Strictness,
    /// Model used for assertion extraction and per-assertion verdicts.
    pub verifier: ModelConfig,
    #[serde(default)]
    pub policy: VerificationPolicy,
}

fn default_total_rounds() -> u32 {
    3
}

fn default_word_limit() -> u32 {
    400
}

impl DebateConfig {
    pub fn new(
        motion: impl Into<String>,
        side_a: SideConfig,
        side_b: SideConfig,
        verifier: ModelConfig,
    ) -> Self {
        Self {
            motion: motion.into(),
            side_a,
            side_b,
            total_rounds: default_total_rounds(),
            word_limit: default_word_limit(),
            strictness: Strictness::default(),
            verifier,
            policy: VerificationPolicy::default(),
        }
    }

    pub fn with_rounds(mut self, total_rounds: u32) -> Self {
        self.total_rounds = total_rounds;
        self
    }

    pub fn with_word_limit(mut self, word_limit: u32) -> Self {
        self.word_limit = word_limit;
        self
    }

    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    pub fn with_policy(mut self, policy: VerificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn side(&self, side: Side) -> &SideConfig {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    /// Reject configurations the state machine must never run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.motion.trim().is_empty() {
            return Err(ConfigError::EmptyMotion);
        }

        for side in Side::BOTH {
            if self.side(side).model.model.trim().is_empty() {
                return Err(ConfigError::EmptyModel(side));
            }
        }

        let a = self.side_a.model.model.trim();
        let b = self.side_b.model.model.trim();
        if a.eq_ignore_ascii_case(b) {
            return Err(ConfigError::SameModelBothSides(a.to_string()));
        }

        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&self.total_rounds) {
            return Err(ConfigError::RoundsOutOfRange {
                got: self.total_rounds,
                min: MIN_ROUNDS,
                max: MAX_ROUNDS,
            });
        }

        if !(MIN_WORD_LIMIT..=MAX_WORD_LIMIT).contains(&self.word_limit) {
            return Err(ConfigError::WordLimitOutOfRange {
                got: self.word_limit,
                min: MIN_WORD_LIMIT,
                max: MAX_WORD_LIMIT,
            });
        }

        self.validate_policy()
    }

    fn validate_policy(&self) -> Result<(), ConfigError> {
        let policy = &self.policy;
        if policy.max_regenerations > HARD_REGENERATION_CAP {
            return Err(ConfigError::InvalidPolicy(format!(
                "max_regenerations {} exceeds cap {}",
                policy.max_regenerations, HARD_REGENERATION_CAP
            )));
        }
        if policy.contradiction_threshold == 0 {
            return Err(ConfigError::InvalidPolicy(
                "contradiction_threshold must be at least 1".to_string(),
            ));
        }
        if policy.max_assertions == 0 || policy.max_assertions > MAX_ASSERTIONS {
            return Err(ConfigError::InvalidPolicy(format!(
                "max_assertions must be within 1..={}",
                MAX_ASSERTIONS
            )));
        }
        if policy.min_words > self.word_limit {
            return Err(ConfigError::InvalidPolicy(format!(
                "min_words {} exceeds word limit {}",
                policy.min_words, self.word_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_config() -> DebateConfig {
        DebateConfig::new(
            "This house would ban private cars from city centres",
            SideConfig::new("model-alpha"),
            SideConfig::new("model-beta"),
            ModelConfig::new("verifier-1"),
        )
        .with_rounds(3)
        .with_word_limit(300)
    }

    #[test]
    fn sample_config_is_valid() {
        assert_eq!(sample_config().validate(), Ok(()));
    }

    #[test]
    fn rejects_same_model_both_sides() {
        let mut config = sample_config();
        config.side_b = SideConfig::new(" Model-Alpha ");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SameModelBothSides(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_rounds() {
        let config = sample_config().with_rounds(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RoundsOutOfRange { got: 0, .. })
        ));
        let config = sample_config().with_rounds(11);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RoundsOutOfRange { got: 11, .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_word_limit() {
        let config = sample_config().with_word_limit(150);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WordLimitOutOfRange { got: 150, .. })
        ));
        let config = sample_config().with_word_limit(1001);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_motion() {
        let mut config = sample_config();
        config.motion = "   ".into();
        assert_eq!(config.validate(), Err(ConfigError::EmptyMotion));
    }

    #[test]
    fn rejects_regeneration_budget_above_cap() {
        let config = sample_config().with_policy(VerificationPolicy {
            max_regenerations: 4,
            ..Default::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn rejects_zero_contradiction_threshold() {
        let config = sample_config().with_policy(VerificationPolicy {
            contradiction_threshold: 0,
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn policy_defaults() {
        let policy = VerificationPolicy::default();
        assert_eq!(policy.max_regenerations, 3);
        assert_eq!(policy.word_count_tolerance, 10);
        assert_eq!(policy.contradiction_threshold, 1);
        assert_eq!(policy.max_assertions, 5);
    }

    #[test]
    fn config_json_defaults() {
        let json = r#"{
            "motion": "m",
            "side_a": {"model": {"model": "a"}},
            "side_b": {"model": {"model": "b"}},
            "verifier": {"model": "v"}
        }"#;
        let config: DebateConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.total_rounds, 3);
        assert_eq!(config.word_limit, 400);
        assert_eq!(config.strictness, Strictness::Standard);
        assert_eq!(config.policy, VerificationPolicy::default());
        assert!(config.validate().is_ok());
    }
}
