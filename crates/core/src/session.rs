//! Session-related types.

use std::collections::HashSet;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use turnloop_model::{Message, Role, ToolCall};

/// An opaque identifier selecting a [`Session`] in a checkpoint store.
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates an id from any string.
    #[inline]
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random id.
    #[inline]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    #[inline]
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One continuous exchange between a user and the engine.
///
/// The message history is append-only. Only the engine appends to it, so
/// the fields are read-only from the outside.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    messages: Vec<Message>,
}

impl Session {
    /// Creates an empty session with the given id.
    #[inline]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            messages: vec![],
        }
    }

    /// Returns the id of this session.
    #[inline]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the messages in chronological order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the most recent assistant message, if any.
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::Assistant)
    }

    /// Returns the tool calls of the most recent assistant message that have
    /// not been answered by a tool message yet.
    ///
    /// A session left behind by a completed turn never has any. A non-empty
    /// result means a turn was interrupted while dispatching tools.
    ///
    /// Calls are answered in order, so the `n` tool messages following the
    /// assistant message answer its first `n` calls.
    pub fn unanswered_tool_calls(&self) -> Vec<ToolCall> {
        let Some(idx) = self
            .messages
            .iter()
            .rposition(|msg| msg.role == Role::Assistant)
        else {
            return vec![];
        };

        let answered = self.messages[idx + 1..]
            .iter()
            .filter(|msg| msg.role == Role::Tool)
            .count();
        self.messages[idx]
            .tool_calls
            .iter()
            .skip(answered)
            .cloned()
            .collect()
    }

    /// Replaces tool call ids of `reply` that are empty or already taken in
    /// this session, or earlier in `reply`, with fresh `call_<uuid>` ids.
    pub(crate) fn assign_call_ids(&self, reply: &mut Message) {
        let mut taken: HashSet<String> = self
            .messages
            .iter()
            .flat_map(|msg| &msg.tool_calls)
            .map(|call| call.id.clone())
            .collect();
        for call in &mut reply.tool_calls {
            if !call.id.is_empty() && taken.insert(call.id.clone()) {
                continue;
            }
            let id = format!("call_{}", uuid::Uuid::new_v4().simple());
            debug!(
                "tool call `{}` got id {id} in place of {:?}",
                call.name, call.id
            );
            call.id = id;
            taken.insert(call.id.clone());
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }
}
