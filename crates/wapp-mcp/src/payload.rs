//! Unwrapping of `tools/call` results.
//!
//! Servers wrap the interesting value in a content envelope:
//! `{"content": [{"type": "text", "text": "..."}]}`, where the text is
//! sometimes a JSON document and sometimes plain prose. Older FastMCP builds
//! skip the envelope and return a bare list whose first element is the value.
//! Exceptions inside a tool come back as an ordinary result flagged `isError`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The decoded value of a tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPayload {
    /// The payload was JSON (or already structured).
    Structured(Value),
    /// The payload was text that did not parse as JSON.
    Raw(String),
}

impl ToolPayload {
    /// Unwrap a `tools/call` result.
    ///
    /// 1. If `result.content` is a non-empty list, its first element is the
    ///    payload; its `text` is used when present.
    /// 2. A non-empty bare list is a legacy envelope; its first element is
    ///    the payload.
    /// 3. Otherwise the whole result is the payload.
    ///
    /// Text payloads are decoded as JSON when possible and kept verbatim
    /// otherwise.
    ///
    /// A result flagged `isError` (an exception raised inside the tool)
    /// becomes a failed [`ToolStatus`] carrying the error text.
    pub fn decode(result: Value) -> Self {
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let payload = Self::unwrap_envelope(result);
        if is_error {
            payload.into_failure()
        } else {
            payload
        }
    }

    fn unwrap_envelope(result: Value) -> Self {
        match result {
            Value::Object(mut map) => match map.remove("content") {
                Some(Value::Array(mut items)) if !items.is_empty() => {
                    let first = items.swap_remove(0);
                    match first.get("text").and_then(Value::as_str) {
                        Some(text) => Self::from_text(text),
                        None => Self::Structured(first),
                    }
                }
                Some(content) => {
                    map.insert("content".to_string(), content);
                    Self::Structured(Value::Object(map))
                }
                None => Self::Structured(Value::Object(map)),
            },
            Value::Array(mut items) if !items.is_empty() => {
                Self::from_legacy_item(items.swap_remove(0))
            }
            Value::String(text) => Self::from_text(&text),
            other => Self::Structured(other),
        }
    }

    fn into_failure(self) -> Self {
        let message = match self.as_status() {
            Some(status) => status.message,
            None => match self {
                Self::Raw(text) | Self::Structured(Value::String(text)) => text,
                Self::Structured(value) => value.to_string(),
            },
        };
        Self::Structured(json!({"success": false, "message": message}))
    }

    /// Decode text as JSON, falling back to the raw text.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => Self::Structured(value),
            Err(_) => Self::Raw(text.to_string()),
        }
    }

    fn from_legacy_item(item: Value) -> Self {
        match item {
            Value::String(text) => Self::from_text(&text),
            Value::Object(ref map)
                if map.get("type").and_then(Value::as_str) == Some("text")
                    && map.get("text").is_some_and(Value::is_string) =>
            {
                Self::from_text(map["text"].as_str().unwrap_or_default())
            }
            other => Self::Structured(other),
        }
    }

    /// Retry JSON decoding of raw text; structured payloads are unchanged.
    pub fn normalize(self) -> Self {
        match self {
            Self::Raw(text) => Self::from_text(&text),
            structured => structured,
        }
    }

    /// The structured value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// The raw text, if the payload was not JSON.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Structured(_) => None,
            Self::Raw(text) => Some(text),
        }
    }

    /// The payload as a list of records (contacts, messages, chats).
    pub fn records(&self) -> Option<&[Value]> {
        self.as_value()
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    /// The payload as a status object, if it has that shape.
    pub fn as_status(&self) -> Option<ToolStatus> {
        let value = self.as_value()?;
        value.get("success")?.as_bool()?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Convert to a JSON value; raw text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Self::Structured(value) => value,
            Self::Raw(text) => Value::String(text),
        }
    }
}

impl std::fmt::Display for ToolPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured(value) => match serde_json::to_string_pretty(value) {
                Ok(pretty) => f.write_str(&pretty),
                Err(_) => write!(f, "{}", value),
            },
            Self::Raw(text) => f.write_str(text),
        }
    }
}

/// Outcome of a state-changing tool (`send_message`, `send_file`, ...).
///
/// `success: false` is an application-level failure reported by the
/// WhatsApp backend, not a protocol error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStatus {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome.
    #[serde(default)]
    pub message: String,
    /// Where downloaded media was stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl ToolStatus {
    /// True when the backend reported a failure.
    pub fn is_failure(&self) -> bool {
        !self.success
    }
}
