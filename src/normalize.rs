//! Message normalization
//!
//! Collapses a mixed sequence of system/human/assistant/tool messages into
//! the backend's strict schema: at most one leading system prompt plus an
//! ordered list of `user`/`assistant` turns. Tool results are folded into
//! synthetic user turns, and runs of adjacent user messages are merged into
//! one turn of content items.
//!
//! Normalization happens entirely before any network I/O; a failing input is
//! never partially sent.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::message::{ChatContent, ChatMessage};

/// Wire-level role of a normalized turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Content of a normalized turn - plain text passes through as-is, anything
/// richer becomes an ordered sequence of typed content items.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TurnContent {
    Text(String),
    Items(Vec<Value>),
}

/// One backend-shaped request message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

/// Normalize generic chat messages into `(system, turns)`
///
/// Returns the optional system prompt (captured from a leading system
/// message) and the backend-shaped turns in original relative order. Empty
/// input yields `(None, [])`.
pub fn normalize(messages: &[ChatMessage]) -> Result<(Option<String>, Vec<Turn>)> {
    let merged = merge_runs(messages);

    let mut system: Option<String> = None;
    let mut turns: Vec<Turn> = Vec::with_capacity(merged.len());

    for (i, message) in merged.iter().enumerate() {
        match message {
            Merged::System(content) => {
                if i != 0 {
                    return Err(Error::SystemNotFirst);
                }
                match content {
                    ChatContent::Text(text) => system = Some(text.clone()),
                    ChatContent::Items(_) => return Err(Error::SystemNotText),
                }
            }
            Merged::Turn(role, content) => turns.push(Turn {
                role: *role,
                content: convert_content(content)?,
            }),
        }
    }

    Ok((system, turns))
}

/// Output of the merge pass: the system prompt candidate or a role-resolved
/// turn. Tool messages do not survive this pass, so the validation pass
/// cannot forget to fold them.
enum Merged {
    System(ChatContent),
    Turn(Role, ChatContent),
}

/// Resolve roles and merge runs of user-side messages
///
/// A tool message becomes a user turn carrying a `tool_result` item (text
/// content) or its raw structured content. Adjacent user turns then merge
/// pairwise, left-associatively, each plain-text side promoted to a
/// `{type: "text"}` item; a system or assistant message breaks a run.
fn merge_runs(messages: &[ChatMessage]) -> Vec<Merged> {
    let mut merged: Vec<Merged> = Vec::with_capacity(messages.len());

    for message in messages {
        let curr = match message {
            ChatMessage::System { content } => Merged::System(content.clone()),
            ChatMessage::Human { content } => Merged::Turn(Role::User, content.clone()),
            ChatMessage::Ai { content } => Merged::Turn(Role::Assistant, content.clone()),
            ChatMessage::Tool {
                content: ChatContent::Text(text),
                tool_call_id,
            } => Merged::Turn(
                Role::User,
                ChatContent::Items(vec![json!({
                    "type": "tool_result",
                    "content": text,
                    "tool_use_id": tool_call_id,
                })]),
            ),
            ChatMessage::Tool { content, .. } => Merged::Turn(Role::User, content.clone()),
        };

        match (merged.last_mut(), curr) {
            (
                Some(Merged::Turn(Role::User, last)),
                Merged::Turn(Role::User, curr),
            ) => {
                let mut items = promote(last);
                items.extend(promote(&curr));
                *last = ChatContent::Items(items);
            }
            (_, curr) => merged.push(curr),
        }
    }

    merged
}

/// Promote message content to a sequence of items, wrapping plain text in a
/// `{type: "text"}` item so both merge sides concatenate uniformly
fn promote(content: &ChatContent) -> Vec<Value> {
    match content {
        ChatContent::Text(text) => vec![json!({"type": "text", "text": text})],
        ChatContent::Items(items) => items.clone(),
    }
}

/// Convert generic message content to turn content, validating item structure
fn convert_content(content: &ChatContent) -> Result<TurnContent> {
    let items = match content {
        ChatContent::Text(text) => return Ok(TurnContent::Text(text.clone())),
        ChatContent::Items(items) => items,
    };

    let mut converted = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(text) => converted.push(json!({"type": "text", "text": text})),
            Value::Object(map) => {
                if !map.contains_key("type") {
                    return Err(Error::UntypedContentItem(item.to_string()));
                }
                // The backend rejects tool_use blocks carrying a stray text field
                if map.get("type").and_then(Value::as_str) == Some("tool_use") {
                    let mut map = map.clone();
                    map.remove("text");
                    converted.push(Value::Object(map));
                } else {
                    converted.push(item.clone());
                }
            }
            other => return Err(Error::UnsupportedContentItem(other.to_string())),
        }
    }

    Ok(TurnContent::Items(converted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_input() {
        let (system, turns) = normalize(&[]).unwrap();
        assert_eq!(system, None);
        assert!(turns.is_empty());
    }

    #[test]
    fn test_plain_text_passthrough() {
        let messages = vec![ChatMessage::human("Hello"), ChatMessage::ai("Hi there")];
        let (system, turns) = normalize(&messages).unwrap();
        assert_eq!(system, None);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, TurnContent::Text("Hello".into()));
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[test]
    fn test_system_captured_at_front() {
        let messages = vec![
            ChatMessage::system("Be terse"),
            ChatMessage::human("Hello"),
        ];
        let (system, turns) = normalize(&messages).unwrap();
        assert_eq!(system.as_deref(), Some("Be terse"));
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn test_system_not_first_is_error() {
        let messages = vec![
            ChatMessage::human("Hello"),
            ChatMessage::system("Be terse"),
        ];
        let err = normalize(&messages).unwrap_err();
        assert!(matches!(err, Error::SystemNotFirst));
    }

    #[test]
    fn test_system_with_blocks_is_error() {
        let messages = vec![ChatMessage::system(vec![json!({
            "type": "text",
            "text": "Be terse"
        })])];
        let err = normalize(&messages).unwrap_err();
        assert!(matches!(err, Error::SystemNotText));
    }

    #[test]
    fn test_adjacent_humans_merge() {
        let messages = vec![
            ChatMessage::human("Hello"),
            ChatMessage::human(vec![json!({"type": "text", "text": "World"})]),
        ];
        let (_, turns) = normalize(&messages).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(
            turns[0].content,
            TurnContent::Items(vec![
                json!({"type": "text", "text": "Hello"}),
                json!({"type": "text", "text": "World"}),
            ])
        );
    }

    #[test]
    fn test_assistant_breaks_merge_run() {
        let messages = vec![
            ChatMessage::human("a"),
            ChatMessage::ai("b"),
            ChatMessage::human("c"),
            ChatMessage::human("d"),
        ];
        let (_, turns) = normalize(&messages).unwrap();
        assert_eq!(turns.len(), 3);
        assert!(turns.len() <= messages.len());
    }

    #[test]
    fn test_tool_message_becomes_tool_result_turn() {
        let messages = vec![ChatMessage::tool("42", "abc")];
        let (_, turns) = normalize(&messages).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(
            turns[0].content,
            TurnContent::Items(vec![json!({
                "type": "tool_result",
                "content": "42",
                "tool_use_id": "abc",
            })])
        );
    }

    #[test]
    fn test_tool_with_structured_content_passes_through() {
        let blocks = vec![json!({"type": "tool_result", "content": "42", "tool_use_id": "x"})];
        let messages = vec![ChatMessage::tool(blocks.clone(), "x")];
        let (_, turns) = normalize(&messages).unwrap();
        assert_eq!(turns[0].content, TurnContent::Items(blocks));
    }

    #[test]
    fn test_adjacent_tool_results_merge_into_one_turn() {
        let messages = vec![ChatMessage::tool("1", "a"), ChatMessage::tool("2", "b")];
        let (_, turns) = normalize(&messages).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        match &turns[0].content {
            TurnContent::Items(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0]["type"], "tool_result");
                assert_eq!(items[0]["tool_use_id"], "a");
                assert_eq!(items[1]["type"], "tool_result");
                assert_eq!(items[1]["tool_use_id"], "b");
            }
            TurnContent::Text(_) => panic!("Expected items"),
        }
    }

    #[test]
    fn test_tool_result_merges_into_previous_human() {
        let messages = vec![ChatMessage::human("run it"), ChatMessage::tool("42", "abc")];
        let (_, turns) = normalize(&messages).unwrap();
        assert_eq!(turns.len(), 1);
        match &turns[0].content {
            TurnContent::Items(items) => {
                assert_eq!(items[0]["type"], "text");
                assert_eq!(items[1]["type"], "tool_result");
            }
            TurnContent::Text(_) => panic!("Expected items"),
        }
    }

    #[test]
    fn test_tool_use_text_field_stripped() {
        let messages = vec![ChatMessage::ai(vec![json!({
            "type": "tool_use",
            "text": "ignored",
            "name": "f",
        })])];
        let (_, turns) = normalize(&messages).unwrap();
        assert_eq!(
            turns[0].content,
            TurnContent::Items(vec![json!({"type": "tool_use", "name": "f"})])
        );
    }

    #[test]
    fn test_bare_string_item_promoted() {
        let messages = vec![ChatMessage::human(vec![json!("just text")])];
        let (_, turns) = normalize(&messages).unwrap();
        assert_eq!(
            turns[0].content,
            TurnContent::Items(vec![json!({"type": "text", "text": "just text"})])
        );
    }

    #[test]
    fn test_item_without_type_is_error() {
        let messages = vec![ChatMessage::human(vec![json!({"text": "no tag"})])];
        let err = normalize(&messages).unwrap_err();
        assert!(matches!(err, Error::UntypedContentItem(_)));
    }

    #[test]
    fn test_non_object_item_is_error() {
        let messages = vec![ChatMessage::human(vec![json!(42)])];
        let err = normalize(&messages).unwrap_err();
        assert!(matches!(err, Error::UnsupportedContentItem(_)));
    }

    #[test]
    fn test_unknown_typed_item_passes_through() {
        let item = json!({"type": "image", "source": {"data": "…"}});
        let messages = vec![ChatMessage::human(vec![item.clone()])];
        let (_, turns) = normalize(&messages).unwrap();
        assert_eq!(turns[0].content, TurnContent::Items(vec![item]));
    }
}
