use schemars::schema_for;
use serde_json::Value;
use turnloop_core::tool::{Tool, ToolResult};

use super::{Registration, RegistrationDesk, RegistrationParameters};

/// A tool for registering an attendee for a seminar topic.
pub struct RegisterTool {
    desk: RegistrationDesk,
    parameter_schema: Value,
}

impl RegisterTool {
    /// Creates a new register tool.
    #[inline]
    pub fn new(desk: RegistrationDesk) -> Self {
        RegisterTool {
            desk,
            parameter_schema: schema_for!(RegistrationParameters).to_value(),
        }
    }
}

impl Tool for RegisterTool {
    type Input = RegistrationParameters;

    fn name(&self) -> &str {
        "register"
    }

    fn description(&self) -> &str {
        r#"
Registers an attendee for one seminar topic.
Confirm the attendee name and the topic with the user before calling this."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: RegistrationParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let desk = self.desk.clone();
        async move {
            let attendee = input.attendee.trim();
            match desk.register(attendee, &input.topic)? {
                Registration::Added(topic) => {
                    Ok(format!("Registered {attendee} for {topic}."))
                }
                Registration::AlreadyRegistered(topic) => Ok(format!(
                    "{attendee} is already registered for {topic}."
                )),
            }
        }
    }
}
