//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use arena_core::persistence::DebateStore;
use arena_core::prompts::{
    DEBATER_PREAMBLE, EXTRACTION_PREAMBLE, JUDGE_PREAMBLE, VERDICT_PREAMBLE,
};
use arena_core::{
    ChatMessage, Completion, ConsensusVerdict, DebateConfig, DebateRecord, DebateSnapshot,
    DebateStatus, GenerationError, InMemoryStore, ModelClient, ModelConfig, PersistenceError,
    Side, SideConfig, Strictness, Turn, VerificationLogEntry,
};
use async_trait::async_trait;
use regex::Regex;

pub const CONTRADICTED: &str =
    r#"{"verdict": "contradicted", "confidence": 0.9, "rationale": "The evidence says otherwise."}"#;
pub const SUPPORTED: &str =
    r#"{"verdict": "supported", "confidence": 0.8, "rationale": "Matches the sources."}"#;
pub const ONE_CLAIM: &str =
    r#"[{"claim": "Car-free centres cut NO2 by 40 percent", "type": "statistical"}]"#;

/// Shared, ordered record of model calls and store writes.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn config(rounds: u32, strictness: Strictness) -> DebateConfig {
    DebateConfig::new(
        "This house would ban private cars from city centres",
        SideConfig::new("model-alpha"),
        SideConfig::new("model-beta"),
        ModelConfig::new("verifier-1"),
    )
    .with_rounds(rounds)
    .with_word_limit(300)
    .with_strictness(strictness)
}

pub fn judge_reply(winner: &str) -> String {
    format!(
        r#"{{"winner": "{}", "scores": {{"coherence": 7, "rebuttal_strength": 8, "factual_grounding": 6}},
           "justification": "The winning side answered each rebuttal directly and kept its factual claims modest and well sourced throughout.",
           "defects": []}}"#,
        winner
    )
}

/// Model double that answers by call purpose.
///
/// Debate turns are a pure function of the speaking model and the round, so
/// interrupted and uninterrupted runs produce identical transcripts.
pub struct ScriptedModel {
    extraction: Mutex<VecDeque<String>>,
    verdicts: Mutex<VecDeque<String>>,
    judge_a_first: String,
    judge_b_first: String,
    tiebreaker: String,
    fail_turns: Mutex<HashSet<(String, u32)>>,
    journal: Journal,
    round_re: Regex,
}

impl ScriptedModel {
    pub fn new(journal: Journal) -> Self {
        Self {
            extraction: Mutex::new(VecDeque::new()),
            verdicts: Mutex::new(VecDeque::new()),
            judge_a_first: judge_reply("side_a"),
            judge_b_first: judge_reply("side_a"),
            tiebreaker: judge_reply("tie"),
            fail_turns: Mutex::new(HashSet::new()),
            journal,
            round_re: Regex::new(r"Round (\d+) of \d+").unwrap(),
        }
    }

    /// Every extraction call returns `reply`.
    pub fn extracting(self, reply: &str, times: usize) -> Self {
        self.extraction
            .lock()
            .unwrap()
            .extend(std::iter::repeat(reply.to_string()).take(times));
        self
    }

    /// Queue verdict replies; once drained every verdict is "supported".
    pub fn verdicts(self, replies: &[&str]) -> Self {
        self.verdicts
            .lock()
            .unwrap()
            .extend(replies.iter().map(|r| r.to_string()));
        self
    }

    pub fn judging(mut self, a_first: &str, b_first: &str, tiebreaker: &str) -> Self {
        self.judge_a_first = judge_reply(a_first);
        self.judge_b_first = judge_reply(b_first);
        self.tiebreaker = judge_reply(tiebreaker);
        self
    }

    /// Fail the turn call for `model` in `round`.
    pub fn failing_turn(self, model: &str, round: u32) -> Self {
        self.fail_turns
            .lock()
            .unwrap()
            .insert((model.to_string(), round));
        self
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    fn log(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    fn turn(&self, model: &str, user: &str) -> Result<String, GenerationError> {
        let round: u32 = self
            .round_re
            .captures(user)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(0);
        self.log(format!("generate {} round {}", model, round));

        if self
            .fail_turns
            .lock()
            .unwrap()
            .contains(&(model.to_string(), round))
        {
            return Err(GenerationError::RateLimited { attempts: 5 });
        }

        let filler = vec!["argument"; 210].join(" ");
        Ok(format!(
            "<analysis>Plan for round {round}.</analysis>\n\
             <critique>The other side overstates its case.</critique>\n\
             <statement>{model} argues in round {round}: {filler}</statement>\n\
             <word_count>217</word_count>"
        ))
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(
        &self,
        conversation: &[ChatMessage],
        config: &ModelConfig,
    ) -> Result<Completion, GenerationError> {
        let system = conversation[0].content.as_str();
        let user = conversation
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let text = if system.starts_with(DEBATER_PREAMBLE) {
            self.turn(&config.model, user)?
        } else if system.starts_with(EXTRACTION_PREAMBLE) {
            self.log("extract".to_string());
            self.extraction
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "[]".to_string())
        } else if system.starts_with(VERDICT_PREAMBLE) {
            self.log("verdict".to_string());
            self.verdicts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| SUPPORTED.to_string())
        } else if system.starts_with(JUDGE_PREAMBLE) {
            self.log(format!("judge {}", config.model));
            if config.model == "tiebreaker" {
                self.tiebreaker.clone()
            } else {
                let a = user.find("**Side A:**").unwrap_or(usize::MAX);
                let b = user.find("**Side B:**").unwrap_or(usize::MAX);
                if a < b {
                    self.judge_a_first.clone()
                } else {
                    self.judge_b_first.clone()
                }
            }
        } else {
            return Err(GenerationError::RequestFailed("unexpected prompt".into()));
        };

        Ok(Completion {
            text,
            input_tokens: 100,
            output_tokens: 50,
        })
    }
}

/// In-memory store that journals every write.
pub struct JournalingStore {
    pub inner: InMemoryStore,
    journal: Journal,
}

impl JournalingStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: InMemoryStore::new(),
            journal,
        }
    }

    fn log(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl DebateStore for JournalingStore {
    async fn create(&self, record: &DebateRecord) -> Result<(), PersistenceError> {
        self.inner.create(record).await
    }

    async fn append_turn(&self, debate_id: &str, turn: &Turn) -> Result<(), PersistenceError> {
        self.log(format!("persist round {} {}", turn.round, turn.side));
        self.inner.append_turn(debate_id, turn).await
    }

    async fn append_verifications(
        &self,
        debate_id: &str,
        entries: &[VerificationLogEntry],
    ) -> Result<(), PersistenceError> {
        self.inner.append_verifications(debate_id, entries).await
    }

    async fn set_round_and_status(
        &self,
        debate_id: &str,
        round: u32,
        status: DebateStatus,
    ) -> Result<(), PersistenceError> {
        self.log(format!("status round {} {}", round, status));
        self.inner.set_round_and_status(debate_id, round, status).await
    }

    async fn get_snapshot(&self, debate_id: &str) -> Result<DebateSnapshot, PersistenceError> {
        self.inner.get_snapshot(debate_id).await
    }

    async fn save_verdict(
        &self,
        debate_id: &str,
        verdict: &ConsensusVerdict,
    ) -> Result<(), PersistenceError> {
        self.inner.save_verdict(debate_id, verdict).await
    }
}

/// Turn statements in transcript order.
pub fn statements(turns: &[Turn]) -> Vec<(u32, Side, String)> {
    turns
        .iter()
        .map(|t| (t.round, t.side, t.statement.clone()))
        .collect()
}
