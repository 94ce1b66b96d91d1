//! A console registration desk for a technology seminar, built on the
//! `turnloop` conversation engine.
//!
//! The crate includes a CLI tool for using in the terminal. The pieces are
//! also usable as a library: [`engine_builder`] assembles an engine with the
//! desk tools and prompt, and [`Driver`] runs the console loop over any
//! reader and writer.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod config;
mod driver;
pub mod tools;

pub use config::{AppConfig, ConfigError};
pub use driver::{
    Driver, DriverExit, EXIT_TOKENS, Error as DriverError, FALLBACK_PROMPT,
    is_exit_token,
};
use turnloop_core::EngineBuilder;
use turnloop_model::ModelProvider;

use crate::tools::{
    CancelRegistrationTool, ListRegistrationsTool, ListTopicsTool,
    RegisterTool, RegistrationDesk,
};

/// Re-exports of [`turnloop_core`] crate.
pub mod core {
    pub use turnloop_core::*;
}

/// The banner printed when the console starts.
pub const WELCOME_MESSAGE: &str = "Welcome to the technology seminar \
registration desk. How can I assist you today? When you are done chatting, \
write bye to end.";

/// The system prompt of the registration desk.
pub const SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// Creates an engine builder with the registration desk tools and prompt.
///
/// All tools share `desk`. The returned builder can be configured further,
/// e.g. with a checkpoint store.
pub fn engine_builder<P: ModelProvider + 'static>(
    provider: P,
    desk: &RegistrationDesk,
) -> EngineBuilder {
    EngineBuilder::with_model_provider(provider)
        .with_system_prompt(SYSTEM_PROMPT)
        .with_tool(ListTopicsTool::new(desk.clone()))
        .with_tool(RegisterTool::new(desk.clone()))
        .with_tool(CancelRegistrationTool::new(desk.clone()))
        .with_tool(ListRegistrationsTool::new(desk.clone()))
}
