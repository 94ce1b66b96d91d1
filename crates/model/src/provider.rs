use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// An error raised by a provider or its response stream.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Classifies the error, so callers can react without knowing the
    /// concrete provider.
    fn kind(&self) -> ErrorKind;
}

/// A backend that turns a [`ModelRequest`] into a streamed reply.
///
/// Providers are treated as stateless: the engine may clone the handle it
/// holds, call it concurrently for different sessions, or drop it at any
/// point.
pub trait ModelProvider: Send + Sync {
    /// The error returned when a request or its stream fails.
    type Error: ModelProviderError;

    /// The streamed reply.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts a model invocation.
    ///
    /// A failed request is reported once. Retrying is left to the caller.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
