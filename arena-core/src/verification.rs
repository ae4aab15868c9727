//! Verification gate — fact-checks a draft and decides whether to reject it.
//!
//! Pipeline per draft:
//! 1. one extraction call returns up to `max_assertions` checkable assertions
//! 2. for each assertion, an evidence search plus one verdict call
//! 3. `rejected` iff strictness is strict and the number of contradicted
//!    assertions reaches `contradiction_threshold`
//!
//! Any internal failure stops the pipeline. Results gathered so far are kept,
//! the draft is not rejected, and a [`GateFailure`] is recorded in the state
//! metadata. The gate never returns an error to its caller.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Strictness;
use crate::evidence::{Evidence, EvidenceSource};
use crate::model::{CallPurpose, ChatMessage, ModelClient, ModelConfig};
use crate::parse::parse_json;
use crate::prompts::{EXTRACTION_PREAMBLE, VERDICT_PREAMBLE};
use crate::state::{
    AssertionKind, ClaimVerdict, DebateState, DraftTurn, Side, VerificationResult,
};

/// Pipeline stage where the gate gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStage {
    Extraction,
    Search,
    Verdict,
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction => write!(f, "extraction"),
            Self::Search => write!(f, "search"),
            Self::Verdict => write!(f, "verdict"),
        }
    }
}

/// A swallowed internal failure of the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateFailure {
    pub round: u32,
    pub side: Side,
    pub attempt: u32,
    pub stage: GateStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion: Option<String>,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

/// Result of one gate pass.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    pub results: Vec<VerificationResult>,
    pub rejected: bool,
    pub failure: Option<(GateStage, Option<String>, String)>,
}

impl GateOutcome {
    fn skipped() -> Self {
        Self {
            results: Vec::new(),
            rejected: false,
            failure: None,
        }
    }

    pub fn contradicted(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.verdict == ClaimVerdict::Contradicted)
            .count()
    }
}

#[derive(Debug, Deserialize)]
struct ExtractedAssertion {
    claim: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    verdict: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    rationale: String,
}

fn parse_verdict_label(raw: &str) -> Option<ClaimVerdict> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "supported" | "support" | "true" => Some(ClaimVerdict::Supported),
        "contradicted" | "contradict" | "refuted" | "false" => Some(ClaimVerdict::Contradicted),
        "indeterminate" | "unknown" | "insufficient" | "unverifiable" => {
            Some(ClaimVerdict::Indeterminate)
        }
        _ => None,
    }
}

/// Fact-checks drafts against an evidence source.
pub struct VerificationGate {
    model: Arc<dyn ModelClient>,
    evidence: Arc<dyn EvidenceSource>,
}

impl VerificationGate {
    pub fn new(model: Arc<dyn ModelClient>, evidence: Arc<dyn EvidenceSource>) -> Self {
        Self { model, evidence }
    }

    /// Verify `state.draft`, writing `state.verification` and `state.rejected`.
    pub async fn verify(&self, state: &mut DebateState) {
        let pending = match (state.strictness(), state.draft.clone()) {
            (Strictness::Disabled, _) | (_, None) => None,
            (strictness, Some(draft)) => Some((strictness, draft)),
        };
        let outcome = match pending {
            Some((strictness, draft)) => self.check(state, &draft, strictness).await,
            None => GateOutcome::skipped(),
        };

        let Some(draft) = state.draft.as_ref() else {
            state.verification.clear();
            state.rejected = false;
            return;
        };
        let (round, side, attempt) = (draft.round, draft.side, draft.attempt);

        if let Some((stage, assertion, message)) = outcome.failure.clone() {
            warn!(
                debate_id = %state.debate_id,
                round,
                side = %side,
                attempt,
                stage = %stage,
                error = %message,
                "Verification gate failed open"
            );
            state.metadata.gate_failures.push(GateFailure {
                round,
                side,
                attempt,
                stage,
                assertion,
                message,
                recorded_at: Utc::now(),
            });
        }

        if outcome.rejected {
            state.metadata.rejections += 1;
            info!(
                debate_id = %state.debate_id,
                round,
                side = %side,
                attempt,
                contradicted = outcome.contradicted(),
                "Draft rejected"
            );
        } else {
            debug!(
                debate_id = %state.debate_id,
                round,
                side = %side,
                attempt,
                checked = outcome.results.len(),
                "Draft passed verification"
            );
        }

        state.verification = outcome.results;
        state.rejected = outcome.rejected;
    }

    async fn check(
        &self,
        state: &mut DebateState,
        draft: &DraftTurn,
        strictness: Strictness,
    ) -> GateOutcome {
        let policy = state.config.policy.clone();
        let verifier = state.config.verifier.clone();
        let mut results = Vec::new();

        let assertions = match self
            .extract(state, &verifier, &draft.statement, policy.max_assertions)
            .await
        {
            Ok(assertions) => assertions,
            Err(message) => {
                return GateOutcome {
                    results,
                    rejected: false,
                    failure: Some((GateStage::Extraction, None, message)),
                }
            }
        };

        for (claim, kind) in assertions {
            let evidence = match self.evidence.search(&claim).await {
                Ok(mut hits) => {
                    hits.truncate(policy.evidence_top_k);
                    hits
                }
                Err(e) => {
                    return GateOutcome {
                        results,
                        rejected: false,
                        failure: Some((GateStage::Search, Some(claim), e.to_string())),
                    }
                }
            };

            match self.judge_claim(state, &verifier, &claim, &evidence).await {
                Ok((verdict, confidence, rationale)) => results.push(VerificationResult {
                    assertion: claim,
                    kind,
                    verdict,
                    confidence,
                    evidence_refs: evidence.into_iter().map(|e| e.source_ref).collect(),
                    rationale,
                }),
                Err(message) => {
                    return GateOutcome {
                        results,
                        rejected: false,
                        failure: Some((GateStage::Verdict, Some(claim), message)),
                    }
                }
            }
        }

        let contradicted = results
            .iter()
            .filter(|r| r.verdict == ClaimVerdict::Contradicted)
            .count();
        let threshold = usize::try_from(policy.contradiction_threshold).unwrap_or(usize::MAX);
        let rejected = strictness == Strictness::Strict && contradicted >= threshold;

        GateOutcome {
            results,
            rejected,
            failure: None,
        }
    }

    async fn extract(
        &self,
        state: &mut DebateState,
        verifier: &ModelConfig,
        statement: &str,
        max_assertions: usize,
    ) -> Result<Vec<(String, AssertionKind)>, String> {
        let conversation = vec![
            ChatMessage::system(EXTRACTION_PREAMBLE),
            ChatMessage::user(format!(
                "Extract at most {} assertions from this statement:\n\n{}",
                max_assertions, statement
            )),
        ];
        let completion = self
            .model
            .generate(&conversation, verifier)
            .await
            .map_err(|e| e.to_string())?;
        state.metadata.usage.record(CallPurpose::Extraction, &completion);

        let extracted: Vec<ExtractedAssertion> = parse_json(&completion.text)?;
        Ok(extracted
            .into_iter()
            .filter(|a| !a.claim.trim().is_empty())
            .take(max_assertions)
            .map(|a| (a.claim.trim().to_string(), AssertionKind::parse(&a.kind)))
            .collect())
    }

    async fn judge_claim(
        &self,
        state: &mut DebateState,
        verifier: &ModelConfig,
        claim: &str,
        evidence: &[Evidence],
    ) -> Result<(ClaimVerdict, f64, String), String> {
        let mut prompt = format!("## Assertion\n\n{}\n\n## Search results\n", claim);
        if evidence.is_empty() {
            prompt.push_str("\nNo results were found.\n");
        }
        for (i, hit) in evidence.iter().enumerate() {
            prompt.push_str(&format!("\n[{}] {}\n{}\n", i + 1, hit.source_ref, hit.snippet));
        }

        let conversation = vec![
            ChatMessage::system(VERDICT_PREAMBLE),
            ChatMessage::user(prompt),
        ];
        let completion = self
            .model
            .generate(&conversation, verifier)
            .await
            .map_err(|e| e.to_string())?;
        state.metadata.usage.record(CallPurpose::Verdict, &completion);

        let raw: RawVerdict = parse_json(&completion.text)?;
        let verdict = parse_verdict_label(&raw.verdict)
            .ok_or_else(|| format!("unknown verdict label: {}", raw.verdict))?;
        let confidence = if raw.confidence.is_finite() {
            raw.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Ok((verdict, confidence, raw.rationale))
    }
}
