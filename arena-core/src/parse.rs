//! Best-effort parsing of structured model output.
//!
//! Models are asked for tagged segments (`<statement>…</statement>`) or a
//! JSON object. Neither is guaranteed, so every helper here returns an
//! `Option`/`Result` and the callers decide what the fallback is.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Section tags a debater response is made of. An unclosed section ends
/// where the next one opens.
pub const SECTION_TAGS: [&str; 4] = ["analysis", "critique", "statement", "word_count"];

/// Any opening or closing tag, e.g. `<statement>` or `</Statement>`.
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Za-z_]+)\s*>").expect("TAG_RE regex should compile")
});

fn is_section_tag(name: &str) -> bool {
    SECTION_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// Extract the body of `<tag>…</tag>`, case-insensitive.
///
/// An opening tag without a closing tag captures up to the next section
/// tag in [`SECTION_TAGS`], or to the end of the text. Returns `None` when
/// the tag is absent or its body is blank.
pub fn tagged_segment(text: &str, tag: &str) -> Option<String> {
    let mut tags = TAG_RE.captures_iter(text);
    let body_start = tags.find_map(|caps| {
        let whole = caps.get(0)?;
        let opening = caps.get(1).is_some_and(|m| m.as_str().is_empty());
        let name = caps.get(2)?.as_str();
        (opening && name.eq_ignore_ascii_case(tag)).then_some(whole.end())
    })?;

    let body_end = tags
        .find_map(|caps| {
            let whole = caps.get(0)?;
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let name = caps.get(2)?.as_str();
            let ends_here = if closing {
                name.eq_ignore_ascii_case(tag)
            } else {
                is_section_tag(name)
            };
            ends_here.then_some(whole.start())
        })
        .unwrap_or(text.len());

    let body = text[body_start..body_end].trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// Locate the JSON payload of a fenced code block, if the response has one.
pub fn fenced_json(text: &str) -> Option<&str> {
    let fenced = fenced_block(text)?.trim();
    (fenced.starts_with('{') || fenced.starts_with('[')).then_some(fenced)
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip an optional language tag on the fence line.
    let body_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

/// Deserialize the JSON payload of a model response.
///
/// A fenced block wins. Otherwise every `{` or `[` is tried as the start
/// of a value, left to right, and the first one that deserializes as `T`
/// is taken; trailing prose after the value is ignored. This skips
/// bracketed citations such as `[1]` that precede the real payload.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    if let Some(fenced) = fenced_json(text) {
        if let Ok(value) = serde_json::from_str(fenced) {
            return Ok(value);
        }
    }

    let mut first_error = None;
    for (start, _) in text.match_indices(['{', '[']) {
        let mut de = serde_json::Deserializer::from_str(&text[start..]);
        match T::deserialize(&mut de) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(format!("invalid JSON payload: {}", e)),
        None => Err("no JSON payload found".to_string()),
    }
}

/// Whitespace-token count.
pub fn count_words(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

/// Keep the first `limit` whitespace tokens, joined by single spaces.
pub fn truncate_words(text: &str, limit: u32) -> String {
    text.split_whitespace()
        .take(limit as usize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First unsigned integer inside `<tag>…</tag>`, if any.
pub fn tagged_number(text: &str, tag: &str) -> Option<u32> {
    let body = tagged_segment(text, tag)?;
    let digits: String = body
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_segment_closed() {
        let text = "<analysis>weigh it</analysis>\n<Statement>\n  Cars must go.\n</Statement>";
        assert_eq!(tagged_segment(text, "analysis").unwrap(), "weigh it");
        assert_eq!(tagged_segment(text, "statement").unwrap(), "Cars must go.");
    }

    #[test]
    fn tagged_segment_unclosed_runs_to_end() {
        let text = "<critique>weak</critique><statement>Cars must go and";
        assert_eq!(tagged_segment(text, "statement").unwrap(), "Cars must go and");
    }

    #[test]
    fn tagged_segment_unclosed_stops_at_next_section() {
        let text = "<analysis>a</analysis><critique>c</critique>\
                    <statement>Cars must go now.\n<word_count>4</word_count>";
        assert_eq!(tagged_segment(text, "statement").unwrap(), "Cars must go now.");
        assert_eq!(tagged_segment(text, "word_count").unwrap(), "4");
    }

    #[test]
    fn tagged_segment_keeps_unknown_markup() {
        let text = "<statement>Use <em>fewer</em> cars.</statement>";
        assert_eq!(tagged_segment(text, "statement").unwrap(), "Use <em>fewer</em> cars.");
    }

    #[test]
    fn tagged_segment_missing_or_blank() {
        assert!(tagged_segment("no tags here", "statement").is_none());
        assert!(tagged_segment("<statement>   </statement>", "statement").is_none());
    }

    #[test]
    fn fenced_json_block() {
        let text = "Here you go:\n```json\n{\"a\": 1}\n```\nthanks";
        assert_eq!(fenced_json(text).unwrap(), "{\"a\": 1}");
        assert!(fenced_json("```\nplain text\n```").is_none());
        assert!(fenced_json("nothing").is_none());
    }

    #[test]
    fn parse_json_array_from_prose() {
        #[derive(Deserialize)]
        struct Claim {
            claim: String,
        }
        let claims: Vec<Claim> = parse_json("Result: [{\"claim\": \"x\"}] done").unwrap();
        assert_eq!(claims[0].claim, "x");
    }

    #[test]
    fn parse_json_skips_bracketed_citations() {
        #[derive(Deserialize)]
        struct Verdict {
            verdict: String,
            confidence: f64,
        }
        let text = "Source [1] states the opposite, see also [2].\n\
                    {\"verdict\": \"contradicted\", \"confidence\": 0.9, \"rationale\": \"per [1]\"}";
        let v: Verdict = parse_json(text).unwrap();
        assert_eq!(v.verdict, "contradicted");
        assert_eq!(v.confidence, 0.9);
    }

    #[test]
    fn parse_json_reports_failures_as_data() {
        #[derive(Deserialize)]
        struct Payload {
            a: u32,
        }
        let ok: Payload = parse_json("noise {\"a\": 7} noise").unwrap();
        assert_eq!(ok.a, 7);
        assert!(parse_json::<Payload>("no payload").is_err());
        assert!(parse_json::<Payload>("{\"b\": 1}").is_err());
    }

    #[test]
    fn word_counting_and_truncation() {
        assert_eq!(count_words("  one two\n three\tfour "), 4);
        assert_eq!(count_words(""), 0);
        assert_eq!(truncate_words("a b  c d e", 3), "a b c");
        assert_eq!(truncate_words("a b", 5), "a b");
    }

    #[test]
    fn tagged_number_extracts_digits() {
        assert_eq!(tagged_number("<word_count>~ 312 words</word_count>", "word_count"), Some(312));
        assert_eq!(tagged_number("<word_count>many</word_count>", "word_count"), None);
    }
}
