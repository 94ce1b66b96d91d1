//! The registration desk tools that models can use.

mod cancel_registration;
mod desk;
mod list_registrations;
mod list_topics;
mod register;

use schemars::JsonSchema;
use serde::Deserialize;

pub use cancel_registration::CancelRegistrationTool;
pub use desk::{DEFAULT_TOPICS, DeskError, Registration, RegistrationDesk};
pub use list_registrations::ListRegistrationsTool;
pub use list_topics::ListTopicsTool;
pub use register::RegisterTool;

/// Input of the tools that act on one registration.
#[derive(Deserialize, JsonSchema)]
pub struct RegistrationParameters {
    #[schemars(description = "Full name of the attendee.")]
    attendee: String,
    #[schemars(description = "The seminar topic, as listed by `list_topics`.")]
    topic: String,
}
