use turnloop_model::{ErrorKind, ModelProviderError};

use crate::checkpoint::CheckpointError;

/// An error that aborts a turn.
///
/// Tool failures are not part of this type. They are recovered inside the
/// turn and reported to the model as tool messages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model kept requesting tools past the configured bound.
    #[error("recursion limit of {limit} model invocations exceeded")]
    RecursionLimitExceeded {
        /// The configured maximum number of model invocations per turn.
        limit: usize,
    },

    /// The model provider failed. The engine never retries on its own.
    #[error("model invocation failed: {0}")]
    ModelInvocation(Box<dyn ModelProviderError>),

    /// The checkpoint store failed to load or save a session.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

impl Error {
    /// Returns the provider error kind if this is a model failure.
    #[inline]
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::ModelInvocation(err) => Some(err.kind()),
            _ => None,
        }
    }
}
