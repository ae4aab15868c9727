//! Judge — order-swapped double evaluation with a tiebreaker path.
//!
//! The finished transcript is evaluated twice, once with side A's turn
//! presented first in every round and once with side B's first. Content is
//! identical between the passes (checked by a blake3 digest), so any
//! disagreement is order sensitivity in the judge model. Disagreements go to
//! the tiebreaker model when one is configured, and default to a tie
//! otherwise.
//!
//! A malformed judge response never aborts evaluation: it degrades to a
//! canonical tie verdict for that pass only.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ArenaError, ConfigError};
use crate::model::{CallPurpose, ChatMessage, ModelClient, ModelConfig, UsageTotals};
use crate::parse::parse_json;
use crate::persistence::DebateSnapshot;
use crate::prompts::JUDGE_PREAMBLE;
use crate::state::{DebateState, DebateStatus, Side, Turn};

/// Rubric scores must fall in `1..=10`.
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;
/// Score given on every rubric by the canonical default verdict.
pub const DEFAULT_SCORE: u8 = 5;

/// Winner of one evaluation or of the whole judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    #[serde(alias = "a", alias = "side a", alias = "proposition")]
    SideA,
    #[serde(alias = "b", alias = "side b", alias = "opposition")]
    SideB,
    #[serde(alias = "draw")]
    Tie,
}

impl Winner {
    pub fn side(self) -> Option<Side> {
        match self {
            Self::SideA => Some(Side::A),
            Self::SideB => Some(Side::B),
            Self::Tie => None,
        }
    }
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::A => Self::SideA,
            Side::B => Self::SideB,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SideA => write!(f, "side_a"),
            Self::SideB => write!(f, "side_b"),
            Self::Tie => write!(f, "tie"),
        }
    }
}

/// Three rubric scores, each in `1..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RubricScores {
    pub coherence: u8,
    pub rebuttal_strength: u8,
    pub factual_grounding: u8,
}

impl RubricScores {
    pub fn uniform(score: u8) -> Self {
        Self {
            coherence: score,
            rebuttal_strength: score,
            factual_grounding: score,
        }
    }

    pub fn in_range(&self) -> bool {
        [self.coherence, self.rebuttal_strength, self.factual_grounding]
            .iter()
            .all(|s| (MIN_SCORE..=MAX_SCORE).contains(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DefectSeverity {
    Low,
    Medium,
    High,
}

/// A reasoning flaw the judge flagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReasoningDefect {
    /// e.g. "strawman", "non_sequitur".
    #[serde(alias = "type")]
    pub kind: String,
    pub severity: DefectSeverity,
    /// Round and side, e.g. "round 2, side_b".
    pub location: String,
}

/// Response shape requested from the judge model.
#[derive(Debug, Deserialize, JsonSchema)]
struct JudgeResponse {
    winner: Winner,
    scores: RubricScores,
    justification: String,
    #[serde(default)]
    defects: Vec<ReasoningDefect>,
}

/// How one evaluation was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationMeta {
    /// `None` for the neutral-order tiebreaker pass.
    pub presented_first: Option<Side>,
    pub judge_model: String,
    pub evaluated_at: DateTime<Utc>,
    /// blake3 hex digest of the canonical transcript content.
    pub transcript_digest: String,
    /// The response was unusable and this is the canonical default verdict.
    #[serde(default)]
    pub parse_failed: bool,
}

/// One judge pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub winner: Winner,
    pub scores: RubricScores,
    pub justification: String,
    pub defects: Vec<ReasoningDefect>,
    pub meta: EvaluationMeta,
}

impl JudgeVerdict {
    /// Tie, every score 5, no defects; the justification names the failure.
    pub fn canonical_default(reason: &str, meta: EvaluationMeta) -> Self {
        Self {
            winner: Winner::Tie,
            scores: RubricScores::uniform(DEFAULT_SCORE),
            justification: format!(
                "Judge response could not be used ({}); defaulting to a tie.",
                reason
            ),
            defects: Vec::new(),
            meta: EvaluationMeta {
                parse_failed: true,
                ..meta
            },
        }
    }
}

/// The combined result of both passes and the optional tiebreaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusVerdict {
    pub a_first: JudgeVerdict,
    pub b_first: JudgeVerdict,
    pub consensus: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiebreaker: Option<JudgeVerdict>,
    pub final_winner: Winner,
    #[serde(default)]
    pub usage: UsageTotals,
}

impl ConsensusVerdict {
    pub fn tiebreaker_used(&self) -> bool {
        self.tiebreaker.is_some()
    }

    /// Both passes saw the same transcript content.
    pub fn digests_match(&self) -> bool {
        self.a_first.meta.transcript_digest == self.b_first.meta.transcript_digest
    }

    /// Compact one-line summary.
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "winner={} consensus={} (a_first={}, b_first={})",
            self.final_winner, self.consensus, self.a_first.winner, self.b_first.winner
        );
        if let Some(tb) = &self.tiebreaker {
            line.push_str(&format!(" tiebreaker={}:{}", tb.meta.judge_model, tb.winner));
        }
        let degraded = [Some(&self.a_first), Some(&self.b_first), self.tiebreaker.as_ref()]
            .into_iter()
            .flatten()
            .filter(|v| v.meta.parse_failed)
            .count();
        if degraded > 0 {
            line.push_str(&format!(" degraded_passes={}", degraded));
        }
        line
    }
}

/// Judge model selection and response requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeConfig {
    pub judge_model: ModelConfig,
    #[serde(default)]
    pub tiebreaker_model: Option<ModelConfig>,
    /// Justifications shorter than this are treated as a parse failure.
    #[serde(default = "default_min_justification_chars")]
    pub min_justification_chars: usize,
}

fn default_min_justification_chars() -> usize {
    80
}

impl JudgeConfig {
    pub fn new(judge_model: ModelConfig) -> Self {
        Self {
            judge_model,
            tiebreaker_model: None,
            min_justification_chars: default_min_justification_chars(),
        }
    }

    pub fn with_tiebreaker(mut self, model: ModelConfig) -> Self {
        self.tiebreaker_model = Some(model);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.judge_model.model.trim().is_empty() {
            return Err(ConfigError::InvalidPolicy(
                "judge model identity is empty".to_string(),
            ));
        }
        if let Some(tb) = &self.tiebreaker_model {
            if tb.model.trim().is_empty() {
                return Err(ConfigError::InvalidPolicy(
                    "tiebreaker model identity is empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// One round of accepted statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRound {
    pub round: u32,
    pub side_a: String,
    pub side_b: String,
}

impl TranscriptRound {
    fn statement(&self, side: Side) -> &str {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }
}

/// The public content of a finished debate. Model identities are left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub debate_id: String,
    pub motion: String,
    pub rounds: Vec<TranscriptRound>,
}

impl Transcript {
    /// Build from a completed state.
    pub fn from_state(state: &DebateState) -> Result<Self, ArenaError> {
        if state.status != DebateStatus::Completed {
            return Err(ArenaError::NotComplete(state.debate_id.clone()));
        }
        Self::from_turns(
            &state.debate_id,
            state.motion(),
            state.total_rounds(),
            &state.turns,
        )
    }

    /// Build from a completed stored debate.
    pub fn from_snapshot(snapshot: &DebateSnapshot) -> Result<Self, ArenaError> {
        if snapshot.status != DebateStatus::Completed {
            return Err(ArenaError::NotComplete(snapshot.debate_id().to_string()));
        }
        Self::from_turns(
            snapshot.debate_id(),
            &snapshot.record.config.motion,
            snapshot.record.config.total_rounds,
            &snapshot.turns,
        )
    }

    fn from_turns(
        debate_id: &str,
        motion: &str,
        total_rounds: u32,
        turns: &[Turn],
    ) -> Result<Self, ArenaError> {
        let statement = |round: u32, side: Side| {
            turns
                .iter()
                .find(|t| t.round == round && t.side == side)
                .map(|t| t.statement.clone())
        };

        let mut rounds = Vec::new();
        for round in 1..=total_rounds {
            match (statement(round, Side::A), statement(round, Side::B)) {
                (Some(side_a), Some(side_b)) => rounds.push(TranscriptRound {
                    round,
                    side_a,
                    side_b,
                }),
                _ => return Err(ArenaError::NotComplete(debate_id.to_string())),
            }
        }

        Ok(Self {
            debate_id: debate_id.to_string(),
            motion: motion.to_string(),
            rounds,
        })
    }

    /// blake3 hex digest of the content, independent of presentation order.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.motion.as_bytes());
        for round in &self.rounds {
            hasher.update(&round.round.to_le_bytes());
            for side in Side::BOTH {
                let statement = round.statement(side);
                hasher.update(side.to_string().as_bytes());
                hasher.update(&(statement.len() as u64).to_le_bytes());
                hasher.update(statement.as_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Render with `first` speaking first in every round. `None` keeps the
    /// chronological order.
    pub fn render(&self, first: Option<Side>) -> String {
        let first = first.unwrap_or(Side::A);
        let mut out = format!(
            "## Motion\n\n{}\n\nSide A argues {}. Side B argues {}.\n",
            self.motion,
            Side::A.position_label(),
            Side::B.position_label()
        );
        for round in &self.rounds {
            out.push_str(&format!("\n## Round {}\n", round.round));
            for side in [first, first.opponent()] {
                out.push_str(&format!(
                    "\n**{}:** {}\n",
                    side.display_name(),
                    round.statement(side)
                ));
            }
        }
        out
    }
}

/// Runs the dual-order evaluation protocol.
pub struct Judge {
    model: Arc<dyn ModelClient>,
    config: JudgeConfig,
}

impl Judge {
    pub fn new(model: Arc<dyn ModelClient>, config: JudgeConfig) -> Self {
        Self { model, config }
    }

    /// Evaluate a finished transcript.
    ///
    /// Fails only when a judge model call fails outright.
    pub async fn evaluate(&self, transcript: &Transcript) -> Result<ConsensusVerdict, ArenaError> {
        let mut usage = UsageTotals::default();
        let primary = self.config.judge_model.clone();

        let a_first = self
            .evaluate_once(transcript, Some(Side::A), &primary, &mut usage)
            .await?;
        let b_first = self
            .evaluate_once(transcript, Some(Side::B), &primary, &mut usage)
            .await?;

        if a_first.meta.transcript_digest != b_first.meta.transcript_digest {
            warn!(
                debate_id = %transcript.debate_id,
                "Transcript digest differs between order-swapped passes"
            );
        }

        let consensus = a_first.winner == b_first.winner;
        let (tiebreaker, final_winner) = if consensus {
            (None, a_first.winner)
        } else {
            match self.config.tiebreaker_model.clone() {
                Some(tb_model) => {
                    info!(
                        debate_id = %transcript.debate_id,
                        a_first = %a_first.winner,
                        b_first = %b_first.winner,
                        tiebreaker = %tb_model.model,
                        "Order-swapped passes disagree, escalating to tiebreaker"
                    );
                    let tb = self
                        .evaluate_once(transcript, None, &tb_model, &mut usage)
                        .await?;
                    let winner = tb.winner;
                    (Some(tb), winner)
                }
                None => (None, Winner::Tie),
            }
        };

        let verdict = ConsensusVerdict {
            a_first,
            b_first,
            consensus,
            tiebreaker,
            final_winner,
            usage,
        };
        info!(
            debate_id = %transcript.debate_id,
            winner = %verdict.final_winner,
            consensus = verdict.consensus,
            tiebreaker_used = verdict.tiebreaker_used(),
            "Judgment complete"
        );
        Ok(verdict)
    }

    async fn evaluate_once(
        &self,
        transcript: &Transcript,
        first: Option<Side>,
        model: &ModelConfig,
        usage: &mut UsageTotals,
    ) -> Result<JudgeVerdict, ArenaError> {
        let conversation = vec![
            ChatMessage::system(judge_system_prompt()),
            ChatMessage::user(transcript.render(first)),
        ];
        let completion = self
            .model
            .generate(&conversation, model)
            .await
            .map_err(ArenaError::JudgeFailed)?;
        usage.record(CallPurpose::Judge, &completion);

        let meta = EvaluationMeta {
            presented_first: first,
            judge_model: model.model.clone(),
            evaluated_at: Utc::now(),
            transcript_digest: transcript.digest(),
            parse_failed: false,
        };

        match self.parse_response(&completion.text) {
            Ok(response) => {
                debug!(
                    debate_id = %transcript.debate_id,
                    judge = %model.model,
                    presented_first = ?first,
                    winner = %response.winner,
                    "Judge pass complete"
                );
                Ok(JudgeVerdict {
                    winner: response.winner,
                    scores: response.scores,
                    justification: response.justification,
                    defects: response.defects,
                    meta,
                })
            }
            Err(reason) => {
                warn!(
                    debate_id = %transcript.debate_id,
                    judge = %model.model,
                    presented_first = ?first,
                    error = %reason,
                    "Judge response unusable, defaulting to tie"
                );
                Ok(JudgeVerdict::canonical_default(&reason, meta))
            }
        }
    }

    fn parse_response(&self, text: &str) -> Result<JudgeResponse, String> {
        let response: JudgeResponse = parse_json(text)?;
        if !response.scores.in_range() {
            return Err(format!(
                "rubric scores outside {}..={}",
                MIN_SCORE, MAX_SCORE
            ));
        }
        let chars = response.justification.trim().chars().count();
        if chars < self.config.min_justification_chars {
            return Err(format!(
                "justification has {} characters, minimum {}",
                chars, self.config.min_justification_chars
            ));
        }
        Ok(response)
    }
}

fn judge_system_prompt() -> String {
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(JudgeResponse))
        .unwrap_or_default();
    format!("{}\n\n```json\n{}\n```", JUDGE_PREAMBLE, schema)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::config::tests::sample_config;
    use crate::error::GenerationError;
    use crate::model::Completion;
    use crate::persistence::tests::turn;
    use async_trait::async_trait;

    const JUSTIFICATION: &str = "Side A engaged directly with every rebuttal and \
        grounded its claims in verifiable evidence across all rounds.";

    fn reply(winner: &str) -> String {
        format!(
            r#"{{"winner": "{}", "scores": {{"coherence": 8, "rebuttal_strength": 7, "factual_grounding": 6}},
               "justification": "{}", "defects": [{{"type": "strawman", "severity": "medium", "location": "round 1, side_b"}}]}}"#,
            winner, JUSTIFICATION
        )
    }

    /// Answers by presentation order and model, recording every call.
    struct OrderModel {
        a_first: String,
        b_first: String,
        tiebreaker: String,
        calls: Mutex<Vec<String>>,
    }

    impl OrderModel {
        fn new(a_first: String, b_first: String, tiebreaker: String) -> Arc<Self> {
            Arc::new(Self {
                a_first,
                b_first,
                tiebreaker,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelClient for OrderModel {
        async fn generate(
            &self,
            conversation: &[ChatMessage],
            config: &ModelConfig,
        ) -> Result<Completion, GenerationError> {
            self.calls.lock().unwrap().push(config.model.clone());
            if config.model == "tiebreaker" {
                return Ok(Completion::text(self.tiebreaker.clone()));
            }
            let body = &conversation[1].content;
            let a = body.find("**Side A:**").unwrap();
            let b = body.find("**Side B:**").unwrap();
            let text = if a < b { &self.a_first } else { &self.b_first };
            Ok(Completion::text(text.clone()))
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ModelClient for FailingModel {
        async fn generate(
            &self,
            _conversation: &[ChatMessage],
            _config: &ModelConfig,
        ) -> Result<Completion, GenerationError> {
            Err(GenerationError::RateLimited { attempts: 3 })
        }
    }

    fn transcript() -> Transcript {
        let mut state = DebateState::new("d-001", sample_config().with_rounds(2));
        state.turns = vec![
            turn(1, Side::A),
            turn(1, Side::B),
            turn(2, Side::A),
            turn(2, Side::B),
        ];
        state.status = DebateStatus::Completed;
        Transcript::from_state(&state).unwrap()
    }

    fn config() -> JudgeConfig {
        JudgeConfig::new(ModelConfig::new("judge-1"))
    }

    #[tokio::test]
    async fn agreement_is_consensus_without_tiebreaker_call() {
        let model = OrderModel::new(reply("side_b"), reply("side_b"), reply("side_a"));
        let judge = Judge::new(
            model.clone(),
            config().with_tiebreaker(ModelConfig::new("tiebreaker")),
        );

        let verdict = judge.evaluate(&transcript()).await.unwrap();

        assert!(verdict.consensus);
        assert_eq!(verdict.final_winner, Winner::SideB);
        assert!(!verdict.tiebreaker_used());
        assert_eq!(model.calls.lock().unwrap().len(), 2);
        assert!(verdict.digests_match());
        assert_eq!(verdict.a_first.meta.presented_first, Some(Side::A));
        assert_eq!(verdict.b_first.meta.presented_first, Some(Side::B));
        assert_eq!(verdict.a_first.defects[0].severity, DefectSeverity::Medium);
        assert_eq!(verdict.usage.calls_for(CallPurpose::Judge), 2);
    }

    #[tokio::test]
    async fn disagreement_without_tiebreaker_is_tie() {
        let model = OrderModel::new(reply("side_a"), reply("side_b"), reply("side_a"));
        let judge = Judge::new(model.clone(), config());

        let verdict = judge.evaluate(&transcript()).await.unwrap();

        assert!(!verdict.consensus);
        assert_eq!(verdict.final_winner, Winner::Tie);
        assert!(!verdict.tiebreaker_used());
        assert_eq!(model.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn disagreement_escalates_to_tiebreaker() {
        let model = OrderModel::new(reply("side_a"), reply("side_b"), reply("side_a"));
        let judge = Judge::new(
            model.clone(),
            config().with_tiebreaker(ModelConfig::new("tiebreaker")),
        );

        let verdict = judge.evaluate(&transcript()).await.unwrap();

        assert!(!verdict.consensus);
        assert!(verdict.tiebreaker_used());
        assert_eq!(verdict.final_winner, Winner::SideA);
        let tb = verdict.tiebreaker.as_ref().unwrap();
        assert_eq!(tb.meta.presented_first, None);
        assert_eq!(tb.meta.judge_model, "tiebreaker");
        assert_eq!(
            *model.calls.lock().unwrap(),
            vec!["judge-1", "judge-1", "tiebreaker"]
        );
        assert!(verdict.summary_line().contains("tiebreaker=tiebreaker:side_a"));
    }

    #[tokio::test]
    async fn bracketed_notes_before_reply_still_parse() {
        let noted = format!("Notes: round [1] was stronger than [2].\n{}", reply("side_a"));
        let model = OrderModel::new(noted.clone(), noted, reply("side_b"));
        let judge = Judge::new(model, config());

        let verdict = judge.evaluate(&transcript()).await.unwrap();

        assert!(!verdict.a_first.meta.parse_failed);
        assert!(!verdict.b_first.meta.parse_failed);
        assert_eq!(verdict.final_winner, Winner::SideA);
        assert_eq!(verdict.a_first.defects.len(), 1);
    }

    #[tokio::test]
    async fn malformed_pass_degrades_to_tie() {
        let model = OrderModel::new("no json at all".into(), reply("side_a"), String::new());
        let judge = Judge::new(model, config());

        let verdict = judge.evaluate(&transcript()).await.unwrap();

        let degraded = &verdict.a_first;
        assert!(degraded.meta.parse_failed);
        assert_eq!(degraded.winner, Winner::Tie);
        assert_eq!(degraded.scores, RubricScores::uniform(5));
        assert!(degraded.defects.is_empty());
        assert!(degraded.justification.contains("no JSON payload"));
        // Only that pass degraded; the passes now disagree.
        assert_eq!(verdict.b_first.winner, Winner::SideA);
        assert_eq!(verdict.final_winner, Winner::Tie);
        assert!(verdict.summary_line().contains("degraded_passes=1"));
    }

    #[tokio::test]
    async fn out_of_range_scores_and_short_justification_are_parse_failures() {
        let bad_scores = reply("side_a").replace("\"coherence\": 8", "\"coherence\": 11");
        let short = r#"{"winner": "side_a", "scores": {"coherence": 8, "rebuttal_strength": 7, "factual_grounding": 6}, "justification": "A won."}"#;
        let model = OrderModel::new(bad_scores, short.into(), String::new());
        let judge = Judge::new(model, config());

        let verdict = judge.evaluate(&transcript()).await.unwrap();

        assert!(verdict.a_first.meta.parse_failed);
        assert!(verdict.a_first.justification.contains("rubric scores"));
        assert!(verdict.b_first.meta.parse_failed);
        assert!(verdict.b_first.justification.contains("justification"));
        // Two degraded ties agree.
        assert!(verdict.consensus);
        assert_eq!(verdict.final_winner, Winner::Tie);
    }

    #[tokio::test]
    async fn model_failure_is_fatal() {
        let judge = Judge::new(Arc::new(FailingModel), config());
        let err = judge.evaluate(&transcript()).await.unwrap_err();
        assert!(matches!(err, ArenaError::JudgeFailed(_)));
    }

    #[test]
    fn render_swaps_order_but_not_content() {
        let t = transcript();
        let a_first = t.render(Some(Side::A));
        let b_first = t.render(Some(Side::B));
        assert_ne!(a_first, b_first);
        assert!(a_first.find("**Side A:**").unwrap() < a_first.find("**Side B:**").unwrap());
        assert!(b_first.find("**Side B:**").unwrap() < b_first.find("**Side A:**").unwrap());
        assert_eq!(t.render(None), a_first);

        let mut sorted_a: Vec<&str> = a_first.lines().collect();
        let mut sorted_b: Vec<&str> = b_first.lines().collect();
        sorted_a.sort_unstable();
        sorted_b.sort_unstable();
        assert_eq!(sorted_a, sorted_b);
    }

    #[test]
    fn digest_tracks_content() {
        let t = transcript();
        assert_eq!(t.digest(), transcript().digest());
        let mut changed = transcript();
        changed.rounds[0].side_b.push('!');
        assert_ne!(t.digest(), changed.digest());
    }

    #[test]
    fn incomplete_debate_has_no_transcript() {
        let mut state = DebateState::new("d-002", sample_config().with_rounds(2));
        state.turns = vec![turn(1, Side::A), turn(1, Side::B)];
        assert!(matches!(
            Transcript::from_state(&state),
            Err(ArenaError::NotComplete(_))
        ));
        state.status = DebateStatus::Completed;
        assert!(matches!(
            Transcript::from_state(&state),
            Err(ArenaError::NotComplete(_))
        ));
    }

    #[test]
    fn winner_aliases() {
        let w: Winner = serde_json::from_str("\"side_a\"").unwrap();
        assert_eq!(w, Winner::SideA);
        let w: Winner = serde_json::from_str("\"draw\"").unwrap();
        assert_eq!(w, Winner::Tie);
        assert_eq!(Winner::from(Side::B).side(), Some(Side::B));
    }

    #[test]
    fn system_prompt_embeds_schema() {
        let prompt = judge_system_prompt();
        assert!(prompt.contains("rebuttal_strength"));
        assert!(prompt.contains("justification"));
    }

    #[test]
    fn judge_config_validation() {
        assert!(config().validate().is_ok());
        assert!(JudgeConfig::new(ModelConfig::new(" ")).validate().is_err());
        assert!(config()
            .with_tiebreaker(ModelConfig::new(""))
            .validate()
            .is_err());
    }
}
