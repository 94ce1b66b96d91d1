//! Byte stream and server-sent events plumbing.

mod chunks;
mod sse;

pub use chunks::{Body, ReadError};
pub use sse::Sse;
