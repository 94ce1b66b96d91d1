use turnloop_model::Message;

/// The stage a turn is in.
///
/// A turn starts in `AwaitingModel`. Each assistant reply either ends the
/// turn (no tool calls) or moves it to `DispatchingTools`, which goes back
/// to `AwaitingModel` once every tool result has been appended. Failures are
/// reported as [`crate::Error`] rather than a state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TurnState {
    /// Waiting for the model's next message.
    #[default]
    AwaitingModel,
    /// Running the tool calls of the last assistant message.
    DispatchingTools,
    /// The model replied without requesting tools.
    TurnComplete,
}

impl TurnState {
    /// The decision edge taken after the model replied.
    #[inline]
    pub(crate) fn after_reply(reply: &Message) -> Self {
        if reply.has_tool_calls() {
            TurnState::DispatchingTools
        } else {
            TurnState::TurnComplete
        }
    }

    /// Returns `true` for the terminal state.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == TurnState::TurnComplete
    }
}

/// What a successful turn did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The state the turn ended in, always [`TurnState::TurnComplete`].
    pub state: TurnState,
    /// How many messages the turn appended to the session.
    pub appended: usize,
    /// How many times the model was invoked.
    pub model_invocations: usize,
}
