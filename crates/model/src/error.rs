use std::fmt::{self, Display};

/// A provider-independent classification of model errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The provider refused the content.
    Moderated,
    /// Too many requests were sent.
    RateLimitExceeded,
    /// Transport, protocol and any other failures.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Moderated => "content moderated",
            Self::RateLimitExceeded => "rate limit exceeded",
            Self::Other => "model error",
        };
        f.write_str(text)
    }
}
