use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use turnloop_core::tool::{Tool, ToolResult};

use super::RegistrationDesk;

#[derive(Deserialize, JsonSchema)]
pub struct ListTopicsParameters {}

/// A tool for listing the topics offered at the seminar.
pub struct ListTopicsTool {
    desk: RegistrationDesk,
    parameter_schema: Value,
}

impl ListTopicsTool {
    /// Creates a new list topics tool.
    #[inline]
    pub fn new(desk: RegistrationDesk) -> Self {
        ListTopicsTool {
            desk,
            parameter_schema: schema_for!(ListTopicsParameters).to_value(),
        }
    }
}

impl Tool for ListTopicsTool {
    type Input = ListTopicsParameters;

    fn name(&self) -> &str {
        "list_topics"
    }

    fn description(&self) -> &str {
        r#"
Lists the topics offered at the seminar, one per line.
Only these topics can be registered for."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        _input: ListTopicsParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let topics = self.desk.topics();
        async move { Ok(topics.join("\n")) }
    }
}
