use schemars::schema_for;
use serde_json::Value;
use turnloop_core::tool::{Tool, ToolResult};

use super::{RegistrationDesk, RegistrationParameters};

/// A tool for cancelling a registration.
pub struct CancelRegistrationTool {
    desk: RegistrationDesk,
    parameter_schema: Value,
}

impl CancelRegistrationTool {
    /// Creates a new cancel registration tool.
    #[inline]
    pub fn new(desk: RegistrationDesk) -> Self {
        CancelRegistrationTool {
            desk,
            parameter_schema: schema_for!(RegistrationParameters).to_value(),
        }
    }
}

impl Tool for CancelRegistrationTool {
    type Input = RegistrationParameters;

    fn name(&self) -> &str {
        "cancel_registration"
    }

    fn description(&self) -> &str {
        "Cancels the registration of an attendee for one seminar topic."
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
            let topic = desk.cancel(attendee, &input.topic)?;
            Ok(format!("Cancelled the registration of {attendee} for {topic}."))
        }
    }
}
