//! Restrictive reader for the `<NewAnswers>` block
//!
//! Only the narrow grammar below is accepted; everything else in the model
//! output is ignored:
//!
//! ```text
//! <NewAnswers>
//!   <Answer step="ID">VALUE</Answer>
//!   ...
//! </NewAnswers>
//! ```
//!
//! IDs are limited to `[A-Za-z0-9_.-]{1,64}`, values to 200 characters
//! without angle brackets. Parsing never fails outward: malformed output
//! yields an empty result and a diagnostic.

use crate::workflow::ExtractionResult;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_VALUE_CHARS: usize = 200;

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<NewAnswers>(.*?)</NewAnswers>").expect("block pattern is valid")
});

static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<Answer\s+step="([A-Za-z0-9_.\-]{1,64})"\s*>([^<>]*)</Answer>"#)
        .expect("answer pattern is valid")
});

/// Why a response produced no answers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedExtraction {
    #[error("response has no <NewAnswers> block")]
    MissingBlock,
    #[error("<NewAnswers> block has content but no well-formed answers ({rejected} rejected)")]
    NoUsableAnswers { rejected: usize },
}

/// Parse the oracle output, falling back to an empty result on malformed input.
pub fn parse_new_answers(raw: &str) -> ExtractionResult {
    match try_parse_new_answers(raw) {
        Ok(answers) => answers,
        Err(reason) => {
            tracing::warn!(
                reason = %reason,
                response_chars = raw.chars().count(),
                "Malformed extraction; treating as no new answers"
            );
            ExtractionResult::new()
        }
    }
}

/// Strict variant reporting why nothing was extracted.
///
/// An empty but present block is a valid "nothing new" reply.
pub fn try_parse_new_answers(raw: &str) -> Result<ExtractionResult, MalformedExtraction> {
    let block = BLOCK_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(MalformedExtraction::MissingBlock)?;

    let mut answers = ExtractionResult::new();
    let mut accepted = 0usize;
    for caps in ANSWER_RE.captures_iter(block) {
        let (Some(step), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let value = decode_entities(value.as_str().trim());
        if value.is_empty() || value.chars().count() > MAX_VALUE_CHARS {
            continue;
        }
        // later duplicates win
        answers.insert(step.as_str(), value);
        accepted += 1;
    }

    let opened = block.matches("<Answer").count();
    let rejected = opened.saturating_sub(accepted);
    if rejected > 0 {
        tracing::debug!(rejected, accepted, "Skipped answer entries outside the grammar");
    }

    if answers.is_empty() && !block.trim().is_empty() {
        return Err(MalformedExtraction::NoUsableAnswers { rejected });
    }

    Ok(answers)
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
