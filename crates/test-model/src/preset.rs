use serde::{Deserialize, Serialize};
use turnloop_model::ToolCall;

/// One scripted piece of a reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCall),
}

/// A scripted reply to one model invocation.
///
/// The finish reason is derived: `ToolCalls` if any event is a tool call,
/// `Stop` otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Streamed in order.
    pub events: Vec<PresetEvent>,
    /// How many invocations fail before this reply is served. `Some(0)`
    /// fails every time.
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// A reply made of the given events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failures: None,
        }
    }

    /// A final text reply.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// A reply that requests the given tool calls and has no text.
    #[inline]
    pub fn tool_calls(calls: impl IntoIterator<Item = ToolCall>) -> Self {
        Self::with_events(
            calls.into_iter().map(PresetEvent::ToolCall).collect::<Vec<_>>(),
        )
    }

    /// Fails the first `failures` invocations, or all of them for `0`.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}
