//! Chat completions wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use turnloop_model::{self as model, ModelRequest, ModelTool, Role};

use crate::OpenAIConfig;

/// One `data` payload of the completion stream.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    // Legacy servers still send it for a single function call.
    FunctionCall,
    ContentFilter,
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// A fragment of a streamed tool call. Everything but the first fragment
/// usually carries only `index` and a piece of the arguments.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ToolCallDelta {
    pub index: Option<u32>,
    pub id: Option<String>,
    pub function: Option<FunctionDelta>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

impl ChatCompletionRequest {
    /// Builds a streaming request. The system prompt goes first, as a
    /// system message.
    pub fn new(req: &ModelRequest, config: &OpenAIConfig) -> Self {
        let system = req.system_prompt.iter().map(|content| {
            ChatMessage::System {
                content: content.clone(),
            }
        });
        Self {
            model: config.model.clone(),
            messages: system
                .chain(req.messages.iter().map(ChatMessage::from))
                .collect(),
            tools: req.tools.iter().map(Tool::from).collect(),
            temperature: config.temperature,
            stream: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum ChatMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        // `null` when the message only requests tools.
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<FunctionCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl From<&model::Message> for ChatMessage {
    fn from(msg: &model::Message) -> Self {
        match msg.role {
            Role::User => Self::User {
                content: msg.content.clone(),
            },
            Role::Assistant => {
                let tool_only =
                    !msg.tool_calls.is_empty() && msg.content.is_empty();
                Self::Assistant {
                    content: (!tool_only).then(|| msg.content.clone()),
                    tool_calls: msg
                        .tool_calls
                        .iter()
                        .map(FunctionCall::from)
                        .collect(),
                }
            }
            Role::Tool => Self::Tool {
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
                content: msg.content.clone(),
            },
        }
    }
}

/// A tool call echoed back in the history. Arguments travel as a JSON
/// string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FunctionCall {
    id: String,
    r#type: &'static str,
    function: FunctionCallBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FunctionCallBody {
    name: String,
    arguments: String,
}

impl From<&model::ToolCall> for FunctionCall {
    fn from(call: &model::ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            r#type: "function",
            function: FunctionCallBody {
                name: call.name.clone(),
                arguments: Value::Object(call.arguments.clone()).to_string(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Tool {
    r#type: &'static str,
    function: ToolFunction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct ToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ModelTool> for Tool {
    fn from(tool: &ModelTool) -> Self {
        Self {
            r#type: "function",
            function: ToolFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}
