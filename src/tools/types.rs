use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::InputSchema;

// ── Descriptor ────────────────────────────────────────────────────────────────

/// Static metadata advertised for one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Globally unique, `<domain>_<operation>`
    pub name: String,
    /// Shown to callers during discovery; no runtime effect
    pub description: String,
    /// Accepted arguments, enforced by the registry before the handler runs
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

// ── Call (transport → registry) ───────────────────────────────────────────────

/// A request to invoke one tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    /// Raw JSON arguments; `null` is treated as an empty object
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

// ── Result (registry → transport) ─────────────────────────────────────────────

/// A content block inside a result envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolContent {
    Text { text: String },
}

impl ToolContent {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text { text: s.into() }
    }
}

/// The uniform envelope returned for every call, successful or not.
///
/// Failures keep the same shape: one text item reading
/// `Error executing tool <name>: <message>`, with `isError` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: false,
        }
    }

    pub fn error(tool_name: &str, message: impl std::fmt::Display) -> Self {
        Self {
            content: vec![ToolContent::text(format!(
                "Error executing tool {}: {}",
                tool_name, message
            ))],
            is_error: true,
        }
    }

    /// Text of the first content item
    pub fn text(&self) -> Option<&str> {
        self.content.first().map(|c| match c {
            ToolContent::Text { text } => text.as_str(),
        })
    }

    /// Parse the first content item as JSON; `None` for error envelopes
    pub fn json(&self) -> Option<Value> {
        if self.is_error {
            return None;
        }
        serde_json::from_str(self.text()?).ok()
    }
}
