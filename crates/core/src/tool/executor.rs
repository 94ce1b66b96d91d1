use std::collections::BTreeMap;

use turnloop_model::{Message, ModelTool, ToolCall};

use crate::tool::{Error, ErrorKind, ToolObject};

/// An executor that handles tool call requests from the model.
#[derive(Default)]
pub struct Executor {
    tools: BTreeMap<String, Box<dyn ToolObject>>,
}

impl Executor {
    pub fn with_tools(tools: Vec<Box<dyn ToolObject>>) -> Self {
        let mut executor = Self::default();
        for tool in tools {
            let name = tool.name().to_owned();
            if executor.tools.insert(name.clone(), tool).is_some() {
                warn!("tool `{name}` registered twice, keeping the last one");
            }
        }
        executor
    }

    /// Returns the definitions of all registered tools, ordered by name.
    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Runs one tool call and returns the tool message answering it.
    ///
    /// This never fails: unknown tools and tool errors are turned into a
    /// message the model can read.
    pub async fn dispatch(&self, call: &ToolCall) -> Message {
        let result = match self.tools.get(&call.name) {
            Some(tool) => {
                trace!(
                    "running tool `{}` ({}) with args: {:?}",
                    call.name, call.id, call.arguments
                );
                tool.execute(call.arguments.clone()).await
            }
            None => Err(Error::not_found()),
        };

        let content = match result {
            Ok(output) => output,
            Err(err) => {
                warn!("tool call `{}` ({}) failed: {err}", call.name, call.id);
                error_content(&call.name, &err)
            }
        };
        Message::tool(call, content)
    }
}

fn error_content(tool_name: &str, err: &Error) -> String {
    match err.kind() {
        ErrorKind::NotFound => format!(
            "Tool `{tool_name}` is unavailable. This capability will be \
             considered for a future version."
        ),
        _ => format!("Error: {}", err.reason()),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::{Value, json};
    use turnloop_model::Role;

    use super::*;
    use crate::tool::{Tool, ToolObjectImpl, ToolResult};

    static EMPTY_SCHEMA: &Value = &Value::Null;

    #[derive(Deserialize)]
    struct GreetInput {
        name: String,
    }

    struct GreetTool;

    impl Tool for GreetTool {
        type Input = GreetInput;

        fn name(&self) -> &str {
            "greet"
        }

        fn description(&self) -> &str {
            "\nGreets someone.\n"
        }

        fn parameter_schema(&self) -> &Value {
            EMPTY_SCHEMA
        }

        #[allow(clippy::manual_async_fn)]
        fn execute(
            &self,
            input: GreetInput,
        ) -> impl Future<Output = ToolResult> + Send + 'static {
            async move {
                if input.name.is_empty() {
                    return Err(Error::execution_error()
                        .with_reason("nobody to greet"));
                }
                Ok(format!("Hello, {}!", input.name))
            }
        }
    }

    fn executor() -> Executor {
        Executor::with_tools(vec![Box::new(ToolObjectImpl(GreetTool))])
    }

    #[tokio::test]
    async fn test_dispatch() {
        let call =
            ToolCall::new("call:1", "greet", json!({ "name": "Ferris" }));
        let msg = executor().dispatch(&call).await;
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.content, "Hello, Ferris!");
        assert_eq!(msg.tool_call_id.as_deref(), Some("call:1"));
        assert_eq!(msg.tool_name.as_deref(), Some("greet"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let call = ToolCall::new("call:1", "book_hotel", json!({}));
        let msg = executor().dispatch(&call).await;
        assert_eq!(msg.tool_call_id.as_deref(), Some("call:1"));
        assert!(msg.content.contains("`book_hotel` is unavailable"));
    }

    #[tokio::test]
    async fn test_dispatch_errors() {
        let call = ToolCall::new("call:1", "greet", json!({ "name": "" }));
        let msg = executor().dispatch(&call).await;
        assert_eq!(msg.content, "Error: nobody to greet");

        let call = ToolCall::new("call:2", "greet", json!({ "who": 42 }));
        let msg = executor().dispatch(&call).await;
        assert!(msg.content.starts_with("Error: missing field `name`"));
    }

    #[test]
    fn test_definitions() {
        let definitions = executor().definitions();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].name, "greet");
        assert_eq!(definitions[0].description, "Greets someone.");
    }
}
