//! A model provider for OpenAI-compatible chat completion APIs.
//!
//! Requests are always streamed. Message content is reported as it arrives,
//! tool calls are reported once the server has finished the message.

#[macro_use]
extern crate tracing;

mod config;
mod io;
mod proto;
mod response;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, RequestBuilder, StatusCode, header};
use turnloop_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest,
};

pub use config::{OpenAIConfig, OpenAIConfigBuilder};
use io::{Body, Sse};
pub use response::OpenAIResponse;

/// A failed request to an OpenAI-compatible server, or a malformed stream.
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    fn other(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::Other)
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A provider backed by the `/chat/completions` endpoint of an
/// OpenAI-compatible server.
///
/// Clones share the HTTP connection pool.
#[derive(Clone, Debug)]
pub struct OpenAIProvider {
    client: Client,
    config: Arc<OpenAIConfig>,
}

impl OpenAIProvider {
    /// Creates a provider with its own HTTP client.
    #[inline]
    pub fn new(config: OpenAIConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration of this provider.
    #[inline]
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }
}

impl ModelProvider for OpenAIProvider {
    type Error = Error;
    type Response = OpenAIResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let body = proto::ChatCompletionRequest::new(req, &self.config);
        let request = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(&self.config.api_key)
            .header(header::ACCEPT, mime::TEXT_EVENT_STREAM.essence_str())
            .json(&body);
        open_stream(request)
    }
}

async fn open_stream(
    request: RequestBuilder,
) -> Result<OpenAIResponse, Error> {
    let resp = request
        .send()
        .await
        .map_err(|err| Error::other(err.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        debug!("request failed with {status}: {body}");
        return Err(status_error(status, &body));
    }

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    if !is_event_stream(content_type) {
        return Err(Error::other(format!(
            "expected an event stream, got content type {content_type:?}"
        )));
    }

    Ok(OpenAIResponse::from_sse(Sse::new(Body::from(resp))))
}

fn status_error(status: StatusCode, body: &str) -> Error {
    let kind = match status {
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimitExceeded,
        _ => ErrorKind::Other,
    };
    match body.trim() {
        "" => Error::new(format!("HTTP status {status}"), kind),
        body => Error::new(format!("HTTP status {status}: {body}"), kind),
    }
}

fn is_event_stream(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.parse::<Mime>().ok())
        .is_some_and(|parsed| {
            parsed.essence_str() == mime::TEXT_EVENT_STREAM.essence_str()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error() {
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(err.message(), "HTTP status 429 Too Many Requests");

        let err = status_error(StatusCode::UNAUTHORIZED, " bad key\n");
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(err.message(), "HTTP status 401 Unauthorized: bad key");
    }

    #[test]
    fn test_is_event_stream() {
        assert!(is_event_stream(Some("text/event-stream")));
        assert!(is_event_stream(Some("text/event-stream; charset=utf-8")));
        assert!(!is_event_stream(Some("application/json")));
        assert!(!is_event_stream(Some("not a mime")));
        assert!(!is_event_stream(None));
    }
}
