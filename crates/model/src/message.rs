use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments of a tool call, keyed by parameter name.
pub type ToolArguments = Map<String, Value>;

/// The author of a [`Message`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Text typed by the user.
    User,
    /// A reply generated by the model.
    Assistant,
    /// The result of a tool call.
    Tool,
}

/// One utterance in the conversation history.
///
/// Use the constructors ([`Message::user`], [`Message::assistant`] and
/// [`Message::tool`]) to build messages, they keep the role-specific
/// fields consistent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// The text payload. It may be empty when an assistant message only
    /// carries tool calls.
    #[serde(default)]
    pub content: String,
    /// Tools the model asked to call. Always empty unless `role` is
    /// [`Role::Assistant`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// The id of the tool call this message answers. Only set on
    /// [`Role::Tool`] messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// The name of the tool that produced this message. Only set on
    /// [`Role::Tool`] messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Creates an assistant message with optional tool calls.
    #[inline]
    pub fn assistant<S: Into<String>>(
        content: S,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Creates a tool message answering the given call.
    #[inline]
    pub fn tool<S: Into<String>>(call: &ToolCall, content: S) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: vec![],
            tool_call_id: Some(call.id.clone()),
            tool_name: Some(call.name.clone()),
        }
    }

    /// Returns `true` if this is an assistant message requesting at least
    /// one tool call.
    #[inline]
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments to pass to the tool.
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    /// Creates a tool call.
    ///
    /// Non-object `arguments` are treated as no arguments at all.
    #[inline]
    pub fn new<ID: Into<String>, N: Into<String>>(
        id: ID,
        name: N,
        arguments: Value,
    ) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_tool_message_correlates_call() {
        let call = ToolCall::new("call:1", "search", json!({ "q": "rust" }));
        let msg = Message::tool(&call, "3 results");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call:1"));
        assert_eq!(msg.tool_name.as_deref(), Some("search"));
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_serialized_shape() {
        let msg = Message::user("Hi");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({ "role": "user", "content": "Hi" })
        );

        let call = ToolCall::new("call:1", "search", json!({ "q": "rust" }));
        let msg = Message::assistant("", vec![call]);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "assistant",
                "content": "",
                "tool_calls": [{
                    "id": "call:1",
                    "name": "search",
                    "arguments": { "q": "rust" }
                }]
            })
        );
    }

    #[test]
    fn test_non_object_arguments() {
        let call = ToolCall::new("call:1", "noop", json!("oops"));
        assert!(call.arguments.is_empty());
    }
}
