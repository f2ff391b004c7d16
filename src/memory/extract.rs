//! Fact extraction and conflict classification via the LLM capability.
//!
//! Both calls use fixed system prompts and tolerant response parsing:
//! a malformed extraction response means zero facts, and an
//! unrecognized classification verdict collapses to `Distinct` at the
//! parse boundary so nothing downstream has to handle junk.

use tokio_util::sync::CancellationToken;

use crate::capability::{ChatMessage, LlmClient};
use crate::error::Result;

const EXTRACTION_PROMPT: &str = "You extract discrete factual claims from text. \
Respond with ONLY a JSON array, no prose. Each element is an object with \
\"fact\" (a single self-contained factual statement) and \"intensity\" (how \
strongly the text asserts it, 0.0 to 1.0). Extract nothing from small talk; \
an empty array is a valid answer.";

const CLASSIFICATION_PROMPT: &str = "You compare a NEW fact against an EXISTING fact. \
Respond with exactly one word:\n\
DUPLICATE - they state the same thing\n\
SUPERSEDES - the new fact replaces or updates the existing one\n\
DISTINCT - they are about different things";

/// A single fact extracted from free-form text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedFact {
    pub fact: String,
    pub intensity: f64,
}

/// Verdict of comparing a new fact against an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictVerdict {
    Duplicate,
    Supersedes,
    Distinct,
}

/// Extract facts from text. A response that does not parse as a JSON
/// array yields zero facts, not an error.
pub async fn extract_facts(
    llm: &dyn LlmClient,
    text: &str,
    cancel: &CancellationToken,
) -> Result<Vec<ExtractedFact>> {
    let messages = [ChatMessage::user(text)];
    let response = llm.complete(&messages, EXTRACTION_PROMPT, cancel).await?;
    let facts = parse_extraction_response(&response);
    tracing::debug!(count = facts.len(), "facts extracted");
    Ok(facts)
}

/// Classify whether a new fact duplicates, supersedes, or is distinct
/// from an existing one.
pub async fn classify_conflict(
    llm: &dyn LlmClient,
    new_fact: &str,
    existing_fact: &str,
    cancel: &CancellationToken,
) -> Result<ConflictVerdict> {
    let prompt = format!("NEW: {new_fact}\nEXISTING: {existing_fact}");
    let messages = [ChatMessage::user(prompt)];
    let response = llm
        .complete(&messages, CLASSIFICATION_PROMPT, cancel)
        .await?;
    Ok(parse_verdict(&response))
}

/// Parse an extraction response into facts. Tolerates markdown code
/// fences around the array; discards malformed entries.
pub fn parse_extraction_response(response: &str) -> Vec<ExtractedFact> {
    let stripped = strip_code_fences(response);

    let value: serde_json::Value = match serde_json::from_str(stripped) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    // Anything but a bare array (including an object wrapping one)
    // counts as zero facts.
    let entries = match value.as_array() {
        Some(a) => a,
        None => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|entry| {
            let fact = entry.get("fact")?.as_str()?.trim();
            if fact.is_empty() {
                return None;
            }
            let intensity = entry.get("intensity")?.as_f64()?;
            Some(ExtractedFact {
                fact: fact.to_string(),
                intensity: intensity.clamp(0.0, 1.0),
            })
        })
        .collect()
}

/// Parse a classification verdict. The first whitespace-delimited
/// token is stripped of non-letters and upper-cased; anything
/// unrecognized (or an empty response) is `Distinct`.
pub fn parse_verdict(response: &str) -> ConflictVerdict {
    let token: String = response
        .split_whitespace()
        .next()
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    match token.as_str() {
        "DUPLICATE" => ConflictVerdict::Duplicate,
        "SUPERSEDES" => ConflictVerdict::Supersedes,
        _ => ConflictVerdict::Distinct,
    }
}

/// Strip a leading/trailing markdown code fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the fence line itself (may carry a language tag).
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => return trimmed,
    };
    body.trim_end()
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(trimmed)
}
