//! Tools the model can call, and the dispatch of its tool calls.

mod error;
mod executor;
mod object;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub(crate) use executor::Executor;
pub(crate) use object::{ToolObject, ToolObjectImpl};

/// What a tool call produces: the text handed back to the model, or an
/// error that is reported to the model in its place.
pub type ToolResult = Result<String, Error>;

/// A capability exposed to the model under a unique name.
///
/// A tool is registered once and shared by every turn of every session that
/// the engine runs. Anything it operates on, like a registry or a database
/// handle, belongs in a shared handle set up when the tool is created.
pub trait Tool: Send + Sync + 'static {
    /// The input, decoded from the JSON object of call arguments. A decoding
    /// failure is reported as [`ErrorKind::InvalidInput`].
    type Input: DeserializeOwned;

    /// The name the model calls the tool by.
    fn name(&self) -> &str;

    /// Tells the model what the tool does. Surrounding whitespace is
    /// trimmed before it is sent.
    fn description(&self) -> &str;

    /// A JSON schema of [`Self::Input`].
    fn parameter_schema(&self) -> &Value;

    /// Runs the tool.
    ///
    /// The future must not borrow `self`. Dropping it cancels the call.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
