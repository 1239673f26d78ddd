//! Classification of single-member add failures.
//!
//! Rules are tried in order; the first that matches decides:
//!
//! 1. the message says the user already is a member: idempotent success
//! 2. the message embeds a JSON object with a `message` field: the first
//!    string inside that field is the reason
//! 3. otherwise the message itself is the reason
//!
//! Only free text is inspected, never a transport-specific error type.

use serde_json::Value;

/// Phrasings (lowercase) that mean the desired membership already holds.
pub const ALREADY_MEMBER_PHRASES: &[&str] = &["member already exists", "already a member"];

/// Outcome of classifying one add failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Rule 1: the user already is a member.
    AlreadyMember,
    /// Rule 2: reason extracted from an embedded structured payload.
    Structured(String),
    /// Rule 3: the raw message, verbatim.
    Verbatim(String),
}

impl Classification {
    pub fn is_success(&self) -> bool {
        matches!(self, Classification::AlreadyMember)
    }

    /// Reason to report, `None` for an idempotent success.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Classification::AlreadyMember => None,
            Classification::Structured(reason) | Classification::Verbatim(reason) => Some(reason),
        }
    }

    pub fn into_reason(self) -> Option<String> {
        match self {
            Classification::AlreadyMember => None,
            Classification::Structured(reason) | Classification::Verbatim(reason) => Some(reason),
        }
    }
}

/// Classify the failure message of one add call.
pub fn classify_add_failure(message: &str) -> Classification {
    let lower = message.to_lowercase();
    if ALREADY_MEMBER_PHRASES.iter().any(|p| lower.contains(p)) {
        return Classification::AlreadyMember;
    }

    if let Some(reason) = structured_reason(message) {
        return Classification::Structured(reason);
    }

    Classification::Verbatim(message.to_string())
}

/// Rule 2: span from the first `{` to the last `}`, parsed as JSON.
fn structured_reason(message: &str) -> Option<String> {
    let start = message.find('{')?;
    let end = message.rfind('}')?;
    if end <= start {
        return None;
    }

    let payload: Value = serde_json::from_str(&message[start..=end]).ok()?;
    let field = payload.as_object()?.get("message")?;
    first_string(field).map(str::to_string)
}

/// Depth-first search for the first non-empty string; arrays in order,
/// objects in key order.
fn first_string(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Array(items) => items.iter().find_map(first_string),
        Value::Object(fields) => fields.values().find_map(first_string),
        _ => None,
    }
}
