use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use serde_json::json;
use tokio::time::{Sleep, sleep};
use turnloop_model::{
    ErrorKind, Message, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, Role, ToolCall,
};

#[derive(Debug)]
struct EchoError(ErrorKind);

impl Display for EchoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for EchoError {}

impl ModelProviderError for EchoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the last user message word by word. Inputs of the form
/// `lookup <word>` produce a tool call instead.
struct EchoResponse {
    events: VecDeque<ModelResponseEvent>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl EchoResponse {
    fn new(input: &str) -> Self {
        let mut events = VecDeque::new();
        if let Some(word) = input.strip_prefix("lookup ") {
            events.push_back(ModelResponseEvent::ToolCall(ToolCall::new(
                "call:0",
                "lookup",
                json!({ "word": word }),
            )));
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::ToolCalls,
            ));
        } else {
            let text = format!("You said {input}");
            let mut words = text.split(' ').peekable();
            while let Some(word) = words.next() {
                let mut delta = word.to_owned();
                if words.peek().is_some() {
                    delta.push(' ');
                }
                events.push_back(ModelResponseEvent::MessageDelta(delta));
            }
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ));
        }
        Self {
            events,
            sleep: None,
        }
    }
}

impl ModelResponse for EchoResponse {
    type Error = EchoError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;
        Poll::Ready(Ok(this.events.pop_front()))
    }
}

struct EchoProvider;

impl ModelProvider for EchoProvider {
    type Error = EchoError;
    type Response = EchoResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let last_user = req.messages.iter().rev().find(|m| m.role == Role::User);
        let result = match last_user {
            Some(msg) => Ok(EchoResponse::new(&msg.content)),
            None => Err(EchoError(ErrorKind::Other)),
        };
        ready(result)
    }
}

async fn collect(mut resp: EchoResponse) -> (String, Vec<ToolCall>) {
    let mut text = String::new();
    let mut tool_calls = vec![];
    while let Some(event) =
        poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
            .await
            .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::ToolCall(call) => tool_calls.push(call),
            ModelResponseEvent::Completed(_) => {}
        }
    }
    (text, tool_calls)
}

#[tokio::test]
async fn test_completion() {
    let req = ModelRequest {
        system_prompt: None,
        messages: vec![Message::user("Good morning")],
        tools: vec![],
    };
    let resp = EchoProvider.send_request(&req).await.unwrap();
    let (text, tool_calls) = collect(resp).await;
    assert_eq!(text, "You said Good morning");
    assert!(tool_calls.is_empty());
}

#[tokio::test]
async fn test_tool_call_event() {
    let req = ModelRequest {
        system_prompt: Some("Be brief.".to_owned()),
        messages: vec![Message::user("lookup ferris")],
        tools: vec![],
    };
    let resp = EchoProvider.send_request(&req).await.unwrap();
    let (text, tool_calls) = collect(resp).await;
    assert!(text.is_empty());
    assert_eq!(tool_calls.len(), 1);
    assert_eq!(tool_calls[0].name, "lookup");
    assert_eq!(tool_calls[0].arguments["word"], json!("ferris"));
}

#[tokio::test]
async fn test_error() {
    let req = ModelRequest {
        system_prompt: None,
        messages: vec![],
        tools: vec![],
    };
    let err = EchoProvider.send_request(&req).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Other);
}
