use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;
use turnloop_core::tool::{Tool, ToolResult};

use super::RegistrationDesk;

#[derive(Deserialize, JsonSchema)]
pub struct ListRegistrationsParameters {
    #[schemars(description = "Full name of the attendee.")]
    attendee: String,
}

/// A tool for listing the topics an attendee is registered for.
pub struct ListRegistrationsTool {
    desk: RegistrationDesk,
    parameter_schema: Value,
}

impl ListRegistrationsTool {
    /// Creates a new list registrations tool.
    #[inline]
    pub fn new(desk: RegistrationDesk) -> Self {
        ListRegistrationsTool {
            desk,
            parameter_schema: schema_for!(ListRegistrationsParameters)
                .to_value(),
        }
    }
}

impl Tool for ListRegistrationsTool {
    type Input = ListRegistrationsParameters;

    fn name(&self) -> &str {
        "list_registrations"
    }

    fn description(&self) -> &str {
        "Lists the topics an attendee is registered for."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: ListRegistrationsParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let desk = self.desk.clone();
        async move {
            let attendee = input.attendee.trim();
            let topics = desk.registrations(attendee);
            if topics.is_empty() {
                return Ok(format!("{attendee} has no registrations."));
            }
            Ok(format!(
                "{attendee} is registered for:\n{}",
                topics.join("\n")
            ))
        }
    }
}
