use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::ToolCall;
use crate::provider::ModelProviderError;

/// A streamed reply from a [`ModelProvider`](crate::ModelProvider).
pub trait ModelResponse: Sized + Send + 'static {
    /// The error produced while reading the stream.
    type Error: ModelProviderError;

    /// Polls for the next piece of the reply.
    ///
    /// `Ready(Ok(Some(_)))` yields an event, `Ready(Ok(None))` marks the
    /// end of the stream and `Ready(Err(_))` aborts it. Once the stream has
    /// ended, further polls keep returning `Ready(Ok(None))`.
    ///
    /// On `Pending` the waker in `cx` is registered, as with any future.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// How a reply ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The reply requests one or more tool calls.
    ToolCalls,
    /// The reply is final text.
    Stop,
}

/// One piece of a streamed reply.
///
/// Text arrives as deltas and tool calls arrive whole; a provider that
/// streams partial arguments buffers them until the call is complete.
/// `Completed` is normally the last event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The reply is over.
    Completed(ModelFinishReason),
    /// More assistant text.
    MessageDelta(String),
    /// A complete tool call.
    ToolCall(ToolCall),
}
