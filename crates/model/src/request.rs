use serde_json::Value;

use crate::Message;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelRequest {
    /// The system instructions, if any.
    ///
    /// This is never part of the conversation history. Providers should
    /// place it in front of `messages` in whatever way their API expects.
    pub system_prompt: Option<String>,
    /// The input messages, in chronological order.
    pub messages: Vec<Message>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
