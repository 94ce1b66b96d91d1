//! Core logic of the conversation engine: the turn loop, tool dispatch,
//! sessions and checkpointing.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod checkpoint;
mod engine;
mod error;
mod model_client;
pub mod session;
pub mod tool;

pub use checkpoint::{CheckpointError, CheckpointStore, MemoryCheckpointStore};
pub use engine::{
    DEFAULT_MAX_ITERATIONS, Engine, EngineBuilder, TurnOutcome, TurnState,
};
pub use error::Error;
pub use session::{Session, SessionId};
