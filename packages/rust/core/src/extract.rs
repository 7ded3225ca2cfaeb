//! Topic-list extraction from the formatter agent's reply.
//!
//! The reply should be exactly `{"topics": [..]}`, but models like to wrap
//! JSON in Markdown fences or chat around it. Two repairs are attempted:
//! stripping a code fence, then taking the outermost `{ .. }` span. Anything
//! that is still not a JSON object with a non-empty `topics` array of
//! strings is rejected; prose lists are never parsed.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use scriptcrew_shared::ScriptCrewError;

/// Why a reply could not be turned into a topic list.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("reply is empty")]
    EmptyReply,

    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reply is JSON but not an object")]
    NotAnObject,

    #[error("JSON object has no \"topics\" key")]
    MissingTopics,

    #[error("\"topics\" is not an array")]
    TopicsNotAList,

    #[error("topic at index {index} is not a string")]
    InvalidItem { index: usize },

    #[error("topic list is empty")]
    NoTopics,
}

impl From<ExtractionError> for ScriptCrewError {
    fn from(err: ExtractionError) -> Self {
        ScriptCrewError::Extraction(err.to_string())
    }
}

/// Parse `{"topics": [..]}` out of `raw`, in order.
pub fn extract_topics(raw: &str) -> Result<Vec<String>, ExtractionError> {
    let value = parse_object(raw)?;

    let Value::Object(map) = value else {
        return Err(ExtractionError::NotAnObject);
    };
    let topics = map.get("topics").ok_or(ExtractionError::MissingTopics)?;
    let Value::Array(items) = topics else {
        return Err(ExtractionError::TopicsNotAList);
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let text = match item {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return Err(ExtractionError::InvalidItem { index }),
        };
        if !text.is_empty() {
            out.push(text);
        }
    }

    if out.is_empty() {
        return Err(ExtractionError::NoTopics);
    }
    Ok(out)
}

fn parse_object(raw: &str) -> Result<Value, ExtractionError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::EmptyReply);
    }

    let first_error = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    if let Some(inner) = strip_fence(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(inner) {
            return Ok(value);
        }
    }

    if let Some(value) = embedded_object(trimmed) {
        return Ok(value);
    }

    Err(ExtractionError::InvalidJson(first_error))
}

/// Body of the first fenced code block, if any.
fn strip_fence(text: &str) -> Option<&str> {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)```").expect("valid regex")
    });

    FENCE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// First JSON value that starts at a `{`, ignoring whatever trails it.
fn embedded_object(text: &str) -> Option<Value> {
    text.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()?
            .ok()
    })
}
