//! Parsing classifier replies into JSON objects.
//!
//! Models asked for JSON still wrap it in prose or code fences often
//! enough that a strict parse alone loses rows. The policy here is a whole
//! text parse, then the span from the first `{` to the last `}`.

use serde_json::{Map, Value};
use thiserror::Error;

/// A parsed classifier reply.
pub type ParsedReply = Map<String, Value>;

/// Why a reply could not be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    #[error("reply is empty")]
    Empty,

    #[error("reply contains no parseable JSON object")]
    NotJson,

    /// Valid JSON, but not an object.
    #[error("reply is a JSON {0}, expected an object")]
    NotAnObject(&'static str),
}

/// Parse `text` into a JSON object.
pub fn parse_reply(text: &str) -> Result<ParsedReply, ReplyError> {
    if text.trim().is_empty() {
        return Err(ReplyError::Empty);
    }

    // Fast path: the whole reply is JSON.
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return into_object(value);
    }

    // Slow path: the outermost brace span.
    let snippet = extract_json(text).ok_or(ReplyError::NotJson)?;
    let value: Value = serde_json::from_str(snippet).map_err(|_| ReplyError::NotJson)?;
    into_object(value)
}

/// Slice from the first `{` to the last `}`, if they form a span.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn into_object(value: Value) -> Result<ParsedReply, ReplyError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(ReplyError::NotAnObject("array")),
        Value::String(_) => Err(ReplyError::NotAnObject("string")),
        Value::Number(_) => Err(ReplyError::NotAnObject("number")),
        Value::Bool(_) => Err(ReplyError::NotAnObject("boolean")),
        Value::Null => Err(ReplyError::NotAnObject("null")),
    }
}
