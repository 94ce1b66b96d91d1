use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use tracing::Instrument;
use turnloop_model::{
    Message, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, ToolCall,
};

type ModelResult = Result<Message, Box<dyn ModelProviderError>>;
type ModelFuture = Pin<Box<dyn Future<Output = ModelResult> + Send>>;
type Invoke = Arc<dyn Fn(ModelRequest) -> ModelFuture + Send + Sync>;

/// The model capability seen by the engine: one request in, exactly one
/// assistant [`Message`] out.
///
/// The provider type is erased behind a shared closure, so the engine and
/// everything holding it stay non-generic.
#[derive(Clone)]
pub struct ModelClient {
    invoke: Invoke,
}

impl ModelClient {
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let invoke: Invoke = Arc::new(move |req| {
            let pending = provider.send_request(&req);
            let span =
                trace_span!("model invocation", messages = req.messages.len());
            Box::pin(
                async move {
                    let resp = pending.await.map_err(boxed::<P>)?;
                    collect_reply(resp).await.map_err(boxed::<P>)
                }
                .instrument(span),
            )
        });
        Self { invoke }
    }

    /// Invokes the model and waits for the whole reply.
    ///
    /// Dropping the returned future stops reading the stream.
    #[inline]
    pub async fn invoke(&self, req: ModelRequest) -> ModelResult {
        (self.invoke)(req).await
    }
}

fn boxed<P: ModelProvider>(err: P::Error) -> Box<dyn ModelProviderError> {
    error!("model invocation failed: {err}");
    Box::new(err)
}

#[derive(Default)]
struct Reply {
    content: String,
    tool_calls: Vec<ToolCall>,
    finish_reason: Option<ModelFinishReason>,
}

impl Reply {
    fn push(&mut self, event: ModelResponseEvent) {
        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                self.content.push_str(&delta)
            }
            ModelResponseEvent::ToolCall(call) => self.tool_calls.push(call),
            ModelResponseEvent::Completed(reason) => {
                self.finish_reason = Some(reason)
            }
        }
    }

    fn into_message(self) -> Message {
        // Only the tool calls drive the turn. A finish reason that disagrees
        // with them points at a misbehaving provider.
        if let Some(reason) = self.finish_reason {
            let wants_tools = reason == ModelFinishReason::ToolCalls;
            if wants_tools == self.tool_calls.is_empty() {
                debug!(
                    "finish reason {reason:?} disagrees with {} tool call(s)",
                    self.tool_calls.len()
                );
            }
        }
        Message::assistant(self.content, self.tool_calls)
    }
}

async fn collect_reply<R>(resp: R) -> Result<Message, R::Error>
where
    R: ModelResponse,
{
    let mut resp = pin!(resp);
    let mut reply = Reply::default();
    while let Some(event) =
        poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await?
    {
        trace!("model event: {event:?}");
        reply.push(event);
    }
    Ok(reply.into_message())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use turnloop_model::{ErrorKind, Role};
    use turnloop_test_model::{
        PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            system_prompt: None,
            messages: vec![Message::user("Hi")],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        model_provider.set_fallback_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("How ".to_owned()),
            PresetEvent::MessageDelta("are ".to_owned()),
            PresetEvent::MessageDelta("you?".to_owned()),
        ]));

        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let msg = model_client.invoke(request()).await.unwrap();
            assert_eq!(msg.role, Role::Assistant);
            assert_eq!(msg.content, "How are you?");
            assert!(msg.tool_calls.is_empty());
        }
    }

    #[tokio::test]
    async fn test_collect_tool_calls() {
        let mut model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Checking.".to_owned()),
            PresetEvent::ToolCall(ToolCall::new("a", "first", json!({}))),
            PresetEvent::ToolCall(ToolCall::new("", "second", json!({}))),
        ]));
        let model_client = ModelClient::new(model_provider);

        let msg = model_client.invoke(request()).await.unwrap();
        assert_eq!(msg.content, "Checking.");
        assert_eq!(msg.tool_calls.len(), 2);
        assert_eq!(msg.tool_calls[0].id, "a");
        assert_eq!(msg.tool_calls[0].name, "first");
        assert_eq!(msg.tool_calls[1].id, "");
        assert_eq!(msg.tool_calls[1].name, "second");
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        let model_client = ModelClient::new(model_provider);
        let err = model_client.invoke(request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
    }
}
