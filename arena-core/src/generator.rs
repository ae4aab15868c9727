//! Turn generator — one model call per draft turn.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::ArenaError;
use crate::model::{CallPurpose, ChatMessage, ModelClient};
use crate::parse::{count_words, tagged_number, tagged_segment, truncate_words};
use crate::prompts::DEBATER_PREAMBLE;
use crate::state::{DebateState, DraftTurn, Side, Turn};

/// Where a draft is being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftSlot<'a> {
    pub round: u32,
    pub side: Side,
    pub model: &'a str,
    pub word_limit: u32,
    pub attempt: u32,
}

/// Produces draft turns.
pub struct TurnGenerator {
    model: Arc<dyn ModelClient>,
}

impl TurnGenerator {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Draft a turn for `side` and store it in `state.draft`.
    ///
    /// Fails only when the model call itself fails; malformed output is
    /// handled by the degraded parse path.
    pub async fn generate(&self, state: &mut DebateState, side: Side) -> Result<(), ArenaError> {
        let conversation = build_conversation(state, side);
        let config = state.config.side(side).model.clone();

        let completion = match self.model.generate(&conversation, &config).await {
            Ok(completion) => completion,
            Err(source) => {
                error!(
                    debate_id = %state.debate_id,
                    round = state.round,
                    side = %side,
                    model = %config.model,
                    error = %source,
                    "Turn generation failed"
                );
                return Err(ArenaError::GenerationFailed {
                    side,
                    round: state.round,
                    source,
                });
            }
        };
        state.metadata.usage.record(CallPurpose::Turn, &completion);

        let draft = parse_draft(
            &completion.text,
            DraftSlot {
                round: state.round,
                side,
                model: &config.model,
                word_limit: state.word_limit(),
                attempt: state.retry_counter,
            },
        );

        if draft.statement_fallback {
            warn!(
                debate_id = %state.debate_id,
                round = state.round,
                side = %side,
                "Statement segment missing, using raw response"
            );
        }
        debug!(
            debate_id = %state.debate_id,
            round = state.round,
            side = %side,
            attempt = draft.attempt,
            words = draft.word_count,
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "Draft generated"
        );

        state.speaking_side = side;
        state.draft = Some(draft);
        Ok(())
    }
}

/// Build the generation context for `side` from the current state.
pub fn build_conversation(state: &DebateState, side: Side) -> Vec<ChatMessage> {
    let mut system = DEBATER_PREAMBLE.to_string();
    if let Some(persona) = state.persona_for(side) {
        system.push_str(&format!(
            "\n\nYou speak as {}. Style: {}",
            persona.name, persona.style
        ));
    }

    let mut user = format!(
        "## Motion\n\n{}\n\n## Your side\n\nYou are {}, the {}.\n\n## Round\n\nRound {} of {}.",
        state.motion(),
        side.display_name(),
        side.position_label(),
        state.round,
        state.total_rounds()
    );

    if !state.turns.is_empty() {
        user.push_str("\n\n## Debate so far\n");
        for turn in &state.turns {
            user.push_str(&render_history_entry(turn));
        }
    }

    let opponent = side.opponent();
    match state.latest_turn_by(opponent) {
        Some(turn) => user.push_str(&format!(
            "\n\n## Rebut this\n\n{} said in round {}:\n\n{}\n\nRespond to it directly.",
            opponent.display_name(),
            turn.round,
            turn.statement
        )),
        None => user.push_str("\n\n## Opening\n\nYou speak first. Lay out your case."),
    }

    user.push_str(&format!(
        "\n\n## Length\n\nYour statement must be at most {} words.",
        state.word_limit()
    ));

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

fn render_history_entry(turn: &Turn) -> String {
    format!(
        "\n### Round {}, {}\n\n{}\n",
        turn.round,
        turn.side.display_name(),
        turn.statement
    )
}

/// Parse a raw model response into a draft.
///
/// A missing `<statement>` segment falls back to the whole response. The
/// statement is cut to `slot.word_limit` words.
pub fn parse_draft(raw: &str, slot: DraftSlot<'_>) -> DraftTurn {
    let analysis = tagged_segment(raw, "analysis");
    let critique = tagged_segment(raw, "critique");
    let reported_word_count = tagged_number(raw, "word_count");

    let (statement, statement_fallback) = match tagged_segment(raw, "statement") {
        Some(statement) => (statement, false),
        None => (raw.trim().to_string(), true),
    };

    let original_words = count_words(&statement);
    let (statement, truncated_from) = if original_words > slot.word_limit {
        (
            truncate_words(&statement, slot.word_limit),
            Some(original_words),
        )
    } else {
        (statement, None)
    };
    let word_count = count_words(&statement);

    DraftTurn {
        round: slot.round,
        side: slot.side,
        model: slot.model.to_string(),
        analysis,
        critique,
        statement,
        word_count,
        reported_word_count,
        statement_fallback,
        truncated_from,
        attempt: slot.attempt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use crate::error::GenerationError;
    use crate::model::{Completion, ModelConfig};
    use async_trait::async_trait;
    use chrono::Utc;

    struct FixedModel(Result<Completion, GenerationError>);

    #[async_trait]
    impl ModelClient for FixedModel {
        async fn generate(
            &self,
            _conversation: &[ChatMessage],
            _config: &ModelConfig,
        ) -> Result<Completion, GenerationError> {
            self.0.clone()
        }
    }

    fn slot(limit: u32) -> DraftSlot<'static> {
        DraftSlot {
            round: 1,
            side: Side::A,
            model: "model-alpha",
            word_limit: limit,
            attempt: 0,
        }
    }

    fn accepted(round: u32, side: Side, statement: &str) -> Turn {
        Turn {
            round,
            side,
            model: "m".into(),
            analysis: None,
            critique: None,
            statement: statement.into(),
            word_count: count_words(statement),
            verifications_passed: 0,
            verifications_failed: 0,
            was_rejected: false,
            regenerations: 0,
            accepted_at: Utc::now(),
        }
    }

    #[test]
    fn parses_all_segments() {
        let raw = "<analysis>A</analysis><critique>C</critique>\
                   <statement>Cities breathe easier.</statement><word_count>3</word_count>";
        let draft = parse_draft(raw, slot(300));
        assert_eq!(draft.analysis.as_deref(), Some("A"));
        assert_eq!(draft.critique.as_deref(), Some("C"));
        assert_eq!(draft.statement, "Cities breathe easier.");
        assert_eq!(draft.word_count, 3);
        assert_eq!(draft.reported_word_count, Some(3));
        assert!(!draft.statement_fallback);
        assert!(draft.truncated_from.is_none());
    }

    #[test]
    fn unclosed_statement_excludes_word_count_section() {
        let raw = "<analysis>a</analysis><critique>c</critique>\
                   <statement>Cars must go now.\n<word_count>4</word_count>";
        let draft = parse_draft(raw, slot(300));
        assert_eq!(draft.statement, "Cars must go now.");
        assert_eq!(draft.word_count, 4);
        assert_eq!(draft.reported_word_count, Some(4));
        assert!(!draft.statement_fallback);
    }

    #[test]
    fn missing_statement_falls_back_to_raw() {
        let raw = "  Just an unstructured answer with seven words.  ";
        let draft = parse_draft(raw, slot(300));
        assert!(draft.statement_fallback);
        assert_eq!(draft.statement, "Just an unstructured answer with seven words.");
        assert_eq!(draft.word_count, 7);
        assert!(draft.analysis.is_none());
    }

    #[test]
    fn long_statement_is_truncated() {
        let body = vec!["w"; 250].join(" ");
        let raw = format!("<statement>{}</statement>", body);
        let draft = parse_draft(&raw, slot(200));
        assert_eq!(draft.word_count, 200);
        assert_eq!(draft.truncated_from, Some(250));
    }

    #[test]
    fn conversation_includes_history_and_rebuttal_target() {
        let mut config = sample_config();
        config.side_b = config.side_b.with_persona("The Economist", "dry, numerate");
        let mut state = DebateState::new("d-001", config);
        state.round = 2;
        state.turns.push(accepted(1, Side::A, "Opening for the motion."));
        state.turns.push(accepted(1, Side::B, "Opening against."));
        state.turns.push(accepted(2, Side::A, "Second proposition turn."));

        let conversation = build_conversation(&state, Side::B);
        assert_eq!(conversation.len(), 2);
        assert!(conversation[0].content.contains("The Economist"));

        let user = &conversation[1].content;
        assert!(user.contains(state.motion()));
        assert!(user.contains("opposition"));
        assert!(user.contains("Opening for the motion."));
        assert!(user.contains("Rebut this"));
        assert!(user.contains("Second proposition turn."));
        assert!(user.contains("at most 300 words"));
        // History is rendered in round order.
        let first = user.find("Opening for the motion.").unwrap();
        let second = user.find("Opening against.").unwrap();
        assert!(first < second);
    }

    #[test]
    fn opening_turn_has_no_rebuttal_target() {
        let mut state = DebateState::new("d-001", sample_config());
        state.round = 1;
        let conversation = build_conversation(&state, Side::A);
        assert!(conversation[1].content.contains("You speak first"));
        assert!(!conversation[0].content.contains("You speak as"));
    }

    #[tokio::test]
    async fn generate_stores_draft_and_usage() {
        let model = Arc::new(FixedModel(Ok(Completion {
            text: "<statement>Short but valid.</statement>".into(),
            input_tokens: 50,
            output_tokens: 10,
        })));
        let generator = TurnGenerator::new(model);
        let mut state = DebateState::new("d-001", sample_config());
        state.round = 1;

        generator.generate(&mut state, Side::B).await.unwrap();

        let draft = state.draft.as_ref().unwrap();
        assert_eq!(draft.side, Side::B);
        assert_eq!(draft.model, "model-beta");
        assert_eq!(state.speaking_side, Side::B);
        assert_eq!(state.metadata.usage.calls_for(CallPurpose::Turn), 1);
    }

    #[tokio::test]
    async fn generate_surfaces_model_failure() {
        let model = Arc::new(FixedModel(Err(GenerationError::EmptyResponse)));
        let generator = TurnGenerator::new(model);
        let mut state = DebateState::new("d-001", sample_config());
        state.round = 3;

        let err = generator.generate(&mut state, Side::A).await.unwrap_err();
        assert!(matches!(
            err,
            ArenaError::GenerationFailed {
                side: Side::A,
                round: 3,
                ..
            }
        ));
        assert!(state.draft.is_none());
    }
}
