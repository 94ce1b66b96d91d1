use std::future::ready;
use std::pin::Pin;

use serde_json::Value;
use tracing::Instrument;
use turnloop_model::{ModelTool, ToolArguments};

use super::{Error, Tool, ToolResult};

pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn definition(&self) -> ModelTool;

    fn execute(
        &self,
        arguments: ToolArguments,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>>;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    fn definition(&self) -> ModelTool {
        ModelTool {
            name: self.0.name().to_owned(),
            description: self.0.description().trim().to_owned(),
            parameters: self.0.parameter_schema().clone(),
        }
    }

    fn execute(
        &self,
        arguments: ToolArguments,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> {
        let decoded = serde_json::from_value(Value::Object(arguments));
        let input: T::Input = match decoded {
            Ok(input) => input,
            Err(err) => {
                let err = Error::invalid_input().with_reason(err.to_string());
                return Box::pin(ready(Err(err)));
            }
        };
        let span = debug_span!("tool execute", name = self.0.name());
        Box::pin(self.0.execute(input).instrument(span))
    }
}
