use std::collections::{BTreeMap, VecDeque};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use serde_json::Value;
use turnloop_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent, ToolCall,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, FinishReason, ToolCallDelta};

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn patch(&mut self, delta: ToolCallDelta) {
        if let Some(id) = delta.id.filter(|_| self.id.is_empty()) {
            self.id = id;
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name.filter(|_| self.name.is_empty())
            {
                self.name = name;
            }
            if let Some(arguments) = function.arguments {
                self.arguments.push_str(&arguments);
            }
        }
    }

    fn finish(self) -> Result<ToolCall, Error> {
        let arguments = if self.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&self.arguments).map_err(|err| {
                Error::other(format!(
                    "malformed arguments for `{}`: {err}",
                    self.name
                ))
            })?
        };
        if !arguments.is_object() {
            return Err(Error::other(format!(
                "arguments for `{}` are not an object",
                self.name
            )));
        }
        Ok(ToolCall::new(self.id, self.name, arguments))
    }
}

struct PartialState {
    sse: Sse,
    id: Option<String>,
    // Keyed by the `index` of the tool call deltas.
    tool_calls: BTreeMap<u32, PartialToolCall>,
    // Events that are ready to be returned, in order.
    pending: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl PartialState {
    fn apply_chunk(&mut self, chunk: ChatCompletionChunk) -> Result<(), Error> {
        if !chunk.id.is_empty()
            && self.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::other("chunk id mismatch"));
        }

        // Only the first choice is requested. A chunk without choices
        // usually carries usage statistics.
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(());
        };

        if let Some(content) =
            choice.delta.content.filter(|content| !content.is_empty())
        {
            self.pending
                .push_back(ModelResponseEvent::MessageDelta(content));
        }
        for delta in choice.delta.tool_calls.into_iter().flatten() {
            let index = self.tool_call_index(&delta);
            self.tool_calls.entry(index).or_default().patch(delta);
        }

        if let Some(finish_reason) = choice.finish_reason {
            let finish_reason = match finish_reason {
                FinishReason::ToolCalls | FinishReason::FunctionCall => {
                    ModelFinishReason::ToolCalls
                }
                FinishReason::ContentFilter => {
                    return Err(Error::new(
                        "the response was filtered",
                        ErrorKind::Moderated,
                    ));
                }
                _ => ModelFinishReason::Stop,
            };
            self.finish(Some(finish_reason))?;
        }
        Ok(())
    }

    /// Some compatible servers omit `index`. A delta carrying a new id then
    /// starts a new call, anything else continues the last one.
    fn tool_call_index(&self, delta: &ToolCallDelta) -> u32 {
        if let Some(index) = delta.index {
            return index;
        }
        let last = self.tool_calls.last_key_value();
        match (last, &delta.id) {
            (Some((_, call)), Some(id)) if &call.id != id => {
                self.tool_calls.len() as u32
            }
            (Some((index, _)), _) => *index,
            (None, _) => 0,
        }
    }

    /// Flushes the collected tool calls, followed by the completion event.
    fn finish(
        &mut self,
        finish_reason: Option<ModelFinishReason>,
    ) -> Result<(), Error> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        let has_tool_calls = !self.tool_calls.is_empty();
        for (_, call) in std::mem::take(&mut self.tool_calls) {
            self.pending
                .push_back(ModelResponseEvent::ToolCall(call.finish()?));
        }

        let finish_reason = finish_reason.unwrap_or_else(|| {
            debug!("stream ended without a finish reason");
            if has_tool_calls {
                ModelFinishReason::ToolCalls
            } else {
                ModelFinishReason::Stop
            }
        });
        self.pending
            .push_back(ModelResponseEvent::Completed(finish_reason));
        Ok(())
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    /// A streaming chat completion.
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            pending: Default::default(),
            finished: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, _)) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }
}

async fn next_event(mut partial_state: PartialState) -> NextEvent {
    loop {
        if let Some(event) = partial_state.pending.pop_front() {
            return Ok((Some(event), partial_state));
        }
        if partial_state.finished {
            return Ok((None, partial_state));
        }

        let next = partial_state.sse.next_event().await;
        let Some(sse_event) = next.map_err(|err| Error::other(err.to_string()))?
        else {
            partial_state.finish(None)?;
            continue;
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.finish(None)?;
            continue;
        }

        let chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::other(err.to_string()))?;
        partial_state.apply_chunk(chunk)?;
    }
}
