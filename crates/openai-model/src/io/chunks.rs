#[cfg(test)]
use std::collections::VecDeque;
use std::fmt::{self, Display};

use bytes::Bytes;
use reqwest::Response;

/// The body couldn't be read to its end.
#[derive(Debug, PartialEq, Eq)]
pub struct ReadError(String);

impl Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to read response body: {}", self.0)
    }
}

/// A response body read chunk by chunk.
pub enum Body {
    Http(Response),
    #[cfg(test)]
    Scripted(VecDeque<Bytes>),
}

impl From<Response> for Body {
    #[inline]
    fn from(response: Response) -> Self {
        Self::Http(response)
    }
}

impl Body {
    /// A body that yields the given chunks, then ends.
    #[cfg(test)]
    pub fn scripted<I: IntoIterator<Item = Bytes>>(chunks: I) -> Self {
        Self::Scripted(chunks.into_iter().collect())
    }

    /// Returns the next chunk, or `None` once the body is exhausted.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, ReadError> {
        match self {
            Self::Http(response) => {
                response.chunk().await.map_err(|err| ReadError(err.to_string()))
            }
            #[cfg(test)]
            Self::Scripted(chunks) => Ok(chunks.pop_front()),
        }
    }
}
