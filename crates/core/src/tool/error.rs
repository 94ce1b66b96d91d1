use std::error::Error as StdError;
use std::fmt::{self, Display};

/// What went wrong with a tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No tool is registered under the requested name.
    NotFound,
    /// The arguments don't match the tool's input type.
    InvalidInput,
    /// The tool ran and reported a failure.
    ExecutionError,
}

impl ErrorKind {
    fn describe(self) -> &'static str {
        match self {
            Self::NotFound => "unknown tool",
            Self::InvalidInput => "invalid arguments",
            Self::ExecutionError => "tool failed",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A failed tool call.
///
/// Tool errors never abort a turn. They are reported back to the model as
/// the content of the tool message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    const fn new(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// No tool with the requested name.
    #[inline]
    pub const fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// The arguments couldn't be decoded.
    #[inline]
    pub const fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// The tool itself failed.
    #[inline]
    pub const fn execution_error() -> Self {
        Self::new(ErrorKind::ExecutionError)
    }

    /// Sets the text shown to the model in place of the generic one.
    #[inline]
    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the kind of the error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the attached reason, or the kind's description if there is
    /// none.
    pub fn reason(&self) -> &str {
        self.reason.as_deref().unwrap_or(self.kind.describe())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.describe())?;
        if let Some(reason) = &self.reason {
            write!(f, ": {reason}")?;
        }
        Ok(())
    }
}

impl StdError for Error {}
