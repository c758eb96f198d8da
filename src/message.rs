//! Framework-side chat messages
//!
//! These are the generic, backend-agnostic messages callers hand to the
//! adapter. They are read-only for the duration of one call; the normalizer
//! turns them into wire-level turns (see [`crate::normalize`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Content of a generic chat message - either plain text or an ordered
/// sequence of content items.
///
/// Structured items are kept as raw JSON values so that any
/// backend-recognized block kind passes through the normalizer unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    /// Simple text content
    Text(String),
    /// Ordered sequence of items: bare strings or typed JSON objects
    Items(Vec<Value>),
}

impl ChatContent {
    /// Get the text if this is plain-text content
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ChatContent::Text(s) => Some(s.as_str()),
            ChatContent::Items(_) => None,
        }
    }
}

impl From<&str> for ChatContent {
    fn from(s: &str) -> Self {
        ChatContent::Text(s.to_string())
    }
}

impl From<String> for ChatContent {
    fn from(s: String) -> Self {
        ChatContent::Text(s)
    }
}

impl From<Vec<Value>> for ChatContent {
    fn from(items: Vec<Value>) -> Self {
        ChatContent::Items(items)
    }
}

/// A generic chat message, tagged by who produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatMessage {
    /// System instructions (only valid as the first message)
    System { content: ChatContent },

    /// Message from the human user
    Human { content: ChatContent },

    /// Message from the assistant
    Ai { content: ChatContent },

    /// Result of a tool invocation, keyed by the originating tool call
    Tool {
        content: ChatContent,
        tool_call_id: String,
    },
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<ChatContent>) -> Self {
        ChatMessage::System {
            content: content.into(),
        }
    }

    /// Create a human message
    pub fn human(content: impl Into<ChatContent>) -> Self {
        ChatMessage::Human {
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn ai(content: impl Into<ChatContent>) -> Self {
        ChatMessage::Ai {
            content: content.into(),
        }
    }

    /// Create a tool-result message
    pub fn tool(content: impl Into<ChatContent>, tool_call_id: impl Into<String>) -> Self {
        ChatMessage::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Borrow this message's content
    pub fn content(&self) -> &ChatContent {
        match self {
            ChatMessage::System { content }
            | ChatMessage::Human { content }
            | ChatMessage::Ai { content }
            | ChatMessage::Tool { content, .. } => content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_content() {
        let msg = ChatMessage::human("Hello");
        assert_eq!(msg.content().as_text(), Some("Hello"));
    }

    #[test]
    fn test_item_content() {
        let msg = ChatMessage::human(vec![json!({"type": "text", "text": "Hello"})]);
        assert_eq!(msg.content().as_text(), None);
        match msg.content() {
            ChatContent::Items(items) => assert_eq!(items.len(), 1),
            ChatContent::Text(_) => panic!("Expected items"),
        }
    }

    #[test]
    fn test_tool_message() {
        let msg = ChatMessage::tool("42", "abc");
        match msg {
            ChatMessage::Tool { tool_call_id, .. } => assert_eq!(tool_call_id, "abc"),
            _ => panic!("Expected Tool"),
        }
    }
}
