//! A scripted model provider for tests.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::time::{Sleep, sleep};
use turnloop_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: VecDeque<ModelResponseEvent>,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestModelResponse {
    fn from_preset(preset: &PresetResponse, delay: Duration) -> Self {
        let mut events: VecDeque<_> = preset
            .events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::ToolCall(call) => {
                    ModelResponseEvent::ToolCall(call.clone())
                }
            })
            .collect();
        let has_tool_call = preset
            .events
            .iter()
            .any(|event| matches!(event, PresetEvent::ToolCall(_)));
        events.push_back(ModelResponseEvent::Completed(if has_tool_call {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        }));
        Self {
            events,
            delay,
            sleep: None,
        }
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if this.events.is_empty() {
            // Drained.
            return Poll::Ready(Ok(None));
        }

        let delay = this.delay;
        let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        Poll::Ready(Ok(this.events.pop_front()))
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    fallback: Option<PresetResponse>,
    requests: Vec<ModelRequest>,
}

impl Script {
    // Consumes one failure of the front response before serving it.
    fn next_response(&mut self) -> Result<PresetResponse, Error> {
        let script_failure = Error {
            message: "scripted failure",
            kind: ErrorKind::Other,
        };

        if let Some(front) = self.responses.front_mut() {
            match front.failures {
                Some(0) => return Err(script_failure),
                Some(remaining) => {
                    front.failures = (remaining > 1).then(|| remaining - 1);
                    return Err(script_failure);
                }
                None => {}
            }
            if let Some(front) = self.responses.pop_front() {
                return Ok(front);
            }
        }

        match &self.fallback {
            Some(PresetResponse {
                failures: Some(_), ..
            }) => Err(script_failure),
            Some(fallback) => Ok(fallback.clone()),
            None => Err(Error {
                message: "script exhausted",
                kind: ErrorKind::RateLimitExceeded,
            }),
        }
    }
}

/// A model provider that plays back a script.
///
/// Each invocation takes the next scripted [`PresetResponse`]. When the
/// script is used up, the fallback response is served again and again, and
/// without one the invocation fails with
/// [`ErrorKind::RateLimitExceeded`].
///
/// Every request is recorded, see [`TestModelProvider::requests`]. Clones
/// share the script and the recorded requests, so a test can hand one clone
/// to the engine and inspect the other.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends a reply to the script.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.lock_script().responses.push_back(preset);
    }

    /// Sets a response that is repeated once the scripted ones run out.
    #[inline]
    pub fn set_fallback_response(&mut self, preset: PresetResponse) {
        self.lock_script().fallback = Some(preset);
    }

    /// Sets the pause before each streamed event. Defaults to 1ms.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far.
    #[inline]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock_script().requests.clone()
    }

    /// Returns the number of requests received so far.
    #[inline]
    pub fn request_count(&self) -> usize {
        self.lock_script().requests.len()
    }

    fn lock_script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let mut script = self.lock_script();
        script.requests.push(req.clone());
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        let result = script
            .next_response()
            .map(|preset| TestModelResponse::from_preset(&preset, delay));
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use serde_json::json;
    use turnloop_model::{Message, ModelTool, ToolCall};

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, Vec<ToolCall>, Option<ModelFinishReason>) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut tool_calls = vec![];
        let mut finish_reason = None;
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            match event {
                ModelResponseEvent::Completed(reason) => {
                    finish_reason = Some(reason)
                }
                ModelResponseEvent::MessageDelta(delta) => {
                    msg.push_str(&delta);
                }
                ModelResponseEvent::ToolCall(call) => tool_calls.push(call),
            }
        }
        (msg, tool_calls, finish_reason)
    }

    fn request(text: &str) -> ModelRequest {
        ModelRequest {
            system_prompt: None,
            messages: vec![Message::user(text)],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Hello, ".to_owned()),
            PresetEvent::MessageDelta("world!".to_owned()),
        ]));
        provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Sure, let me take a look.".to_owned()),
            PresetEvent::ToolCall(ToolCall::new(
                "tool:1",
                "list_topics",
                json!({}),
            )),
        ]));

        let mut req = request("Hi");
        req.tools.push(ModelTool {
            name: "list_topics".to_owned(),
            description: "Lists seminar topics".to_owned(),
            parameters: json!({ "type": "object" }),
        });
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_calls, reason) = collect_response(resp).await;
        assert_eq!(msg, "Hello, world!");
        assert!(tool_calls.is_empty());
        assert_eq!(reason, Some(ModelFinishReason::Stop));

        req.messages.push(Message::assistant(msg, vec![]));
        req.messages.push(Message::user("What is on?"));
        let resp = provider.send_request(&req).await.unwrap();
        let (msg, tool_calls, reason) = collect_response(resp).await;
        assert_eq!(msg, "Sure, let me take a look.");
        assert_eq!(tool_calls.len(), 1);
        assert_eq!(tool_calls[0].name, "list_topics");
        assert_eq!(reason, Some(ModelFinishReason::ToolCalls));

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_script_exhausted() {
        let provider = TestModelProvider::default();
        let err = provider.send_request(&request("Hi")).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_failures_then_success() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::text("ok").with_failures(2));

        assert!(provider.send_request(&request("1")).await.is_err());
        assert!(provider.send_request(&request("2")).await.is_err());
        let resp = provider.send_request(&request("3")).await.unwrap();
        let (msg, _, _) = collect_response(resp).await;
        assert_eq!(msg, "ok");
    }

    #[tokio::test]
    async fn test_fallback_repeats() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::text("first"));
        provider.set_fallback_response(PresetResponse::text("again"));

        for expected in ["first", "again", "again"] {
            let resp = provider.send_request(&request("Hi")).await.unwrap();
            let (msg, _, _) = collect_response(resp).await;
            assert_eq!(msg, expected);
        }
    }
}
