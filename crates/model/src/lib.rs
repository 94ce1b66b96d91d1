//! An abstraction layer for different LLMs.
//!
//! This crate establishes an unified protocol for the conversation engine
//! to interact with various supported LLMs, so that the engine can switch
//! between them without modifying the core codebase.
//!
//! Besides the provider traits, it also defines the conversation data model
//! ([`Message`], [`ToolCall`], [`Role`]) shared by the engine, the session
//! store and every provider.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod message;
mod provider;
mod request;
mod response;

pub use error::*;
pub use message::*;
pub use provider::*;
pub use request::*;
pub use response::*;
