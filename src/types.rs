//! PadLM API types matching the backend's wire format
//!
//! These types serialize/deserialize against the `/api/v1/generate` endpoint,
//! for both the single-shot response body and the streamed event frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Response Types
// ============================================================================

/// Content block in a generated message
///
/// The backend emits text blocks today; the closed tagged union is the
/// extension point for future block kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    /// Text content
    #[serde(rename = "text")]
    Text { text: String },
}

impl ContentBlock {
    /// Create a text content block
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Get the text content if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text.as_str()),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens used
    pub input_tokens: u32,

    /// Output tokens generated
    pub output_tokens: u32,
}

/// Response from the PadLM generate API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Type (always "message")
    #[serde(rename = "type")]
    pub message_type: String,

    /// Role (always "assistant")
    pub role: String,

    /// Content blocks in the response
    pub content: Vec<ContentBlock>,

    /// Model used
    pub model: String,

    /// Reason the backend stopped generating
    pub stop_reason: Option<String>,

    /// Token usage
    pub usage: Usage,
}

impl Message {
    /// Get all text content from the response
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.as_text())
            .collect::<Vec<_>>()
            .join("")
    }
}

// ============================================================================
// Streaming Types
// ============================================================================

/// Delta payload inside a `content_block_delta` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentDelta {
    /// Incremental text
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
}

/// Server-sent event from the streaming API
///
/// A closed union over the seven event kinds the backend emits. `index`
/// fields identify which content block of the in-progress message a
/// start/delta/stop applies to.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Initial message with metadata (empty content, null stop_reason)
    #[serde(rename = "message_start")]
    MessageStart { message: Message },

    /// Start of a content block
    #[serde(rename = "content_block_start")]
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },

    /// Keep-alive ping
    #[serde(rename = "ping")]
    Ping,

    /// Delta update to a content block
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: usize, delta: ContentDelta },

    /// End of a content block
    #[serde(rename = "content_block_stop")]
    ContentBlockStop { index: usize },

    /// Final message delta with stop reason and usage
    #[serde(rename = "message_delta")]
    MessageDelta { delta: Value },

    /// Stream complete
    #[serde(rename = "message_stop")]
    MessageStop,
}

/// The seven event type strings the backend may emit
const KNOWN_EVENT_TYPES: &[&str] = &[
    "message_start",
    "content_block_start",
    "ping",
    "content_block_delta",
    "content_block_stop",
    "message_delta",
    "message_stop",
];

impl StreamEvent {
    /// Decode one event object (the envelope's `data` field)
    ///
    /// An unrecognized `type` is a hard decode error so that backend protocol
    /// drift surfaces immediately instead of being skipped.
    pub fn from_value(data: Value) -> Result<Self> {
        let event_type = data
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if !KNOWN_EVENT_TYPES.contains(&event_type.as_str()) {
            return Err(Error::UnknownEvent(event_type));
        }
        Ok(serde_json::from_value(data)?)
    }

    /// Get the incremental text if this event carries a text delta
    pub fn text_fragment(&self) -> Option<&str> {
        match self {
            StreamEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta { text },
                ..
            } => Some(text.as_str()),
            _ => None,
        }
    }

    /// Whether this event terminates the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::MessageStop)
    }
}

/// Outer JSON wrapper around one streaming frame
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// The actual event object
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_deserialization() {
        let json = r#"{
            "id": "msg_1234",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Hello, world!"}],
            "model": "padlm-7b",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 20}
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, "msg_1234");
        assert_eq!(msg.message_type, "message");
        assert_eq!(msg.text(), "Hello, world!");
        assert_eq!(msg.usage.input_tokens, 10);
    }

    #[test]
    fn test_content_block_serialization() {
        let block = ContentBlock::text("Hello");
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"type\":\"text\""));
        assert!(json.contains("\"text\":\"Hello\""));
    }

    #[test]
    fn test_ping_deserialization() {
        let event = StreamEvent::from_value(json!({"type": "ping"})).unwrap();
        assert!(matches!(event, StreamEvent::Ping));
        assert_eq!(event.text_fragment(), None);
    }

    #[test]
    fn test_text_delta_deserialization() {
        let event = StreamEvent::from_value(json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": "Hello"}
        }))
        .unwrap();
        match &event {
            StreamEvent::ContentBlockDelta { index, delta } => {
                assert_eq!(*index, 0);
                assert_eq!(delta, &ContentDelta::TextDelta { text: "Hello".into() });
            }
            _ => panic!("Expected ContentBlockDelta"),
        }
        assert_eq!(event.text_fragment(), Some("Hello"));
    }

    #[test]
    fn test_unknown_event_type() {
        let err = StreamEvent::from_value(json!({"type": "unknown_event"})).unwrap_err();
        assert!(matches!(err, Error::UnknownEvent(t) if t == "unknown_event"));
    }

    #[test]
    fn test_block_index_preserved() {
        let event = StreamEvent::from_value(json!({"type": "content_block_stop", "index": 3}))
            .unwrap();
        match event {
            StreamEvent::ContentBlockStop { index } => assert_eq!(index, 3),
            _ => panic!("Expected ContentBlockStop"),
        }
    }
}
