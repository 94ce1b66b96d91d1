use std::fmt::{self, Display};

use bytes::{Buf, BytesMut};

use super::{Body, ReadError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Read(ReadError),
    InvalidPayload,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Read(err) => err.fmt(f),
            Error::InvalidPayload => {
                f.write_str("invalid event stream payload")
            }
        }
    }
}

/// A type for reading server-sent events from a response body.
///
/// Only the `data` field is used. Each dispatched event is the concatenation
/// of its `data` lines joined by `\n`; events without data are skipped.
/// Bytes are buffered until a full line is available, so a UTF-8 sequence
/// split across chunks decodes fine.
pub struct Sse {
    buf: BytesMut,
    data: Option<String>,
    body: Body,
    eof: bool,
}

impl Sse {
    #[inline]
    pub fn new(body: Body) -> Self {
        Self {
            buf: BytesMut::new(),
            data: None,
            body,
            eof: false,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            while let Some(line) = self.next_line()? {
                if line.is_empty() {
                    if let Some(data) = self.data.take() {
                        return Ok(Some(data));
                    }
                    continue;
                }
                self.process_line(&line);
            }

            if self.eof {
                // An event that is not terminated by a blank line is
                // incomplete and gets discarded.
                return Ok(None);
            }

            match self.body.next_chunk().await.map_err(Error::Read)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => self.eof = true,
            }
        }
    }

    /// Takes the next complete line out of the buffer.
    ///
    /// end-of-line = ( cr lf / cr / lf )
    fn next_line(&mut self) -> Result<Option<String>, Error> {
        let Some(idx) = self.buf.iter().position(|b| matches!(b, b'\r' | b'\n'))
        else {
            return Ok(None);
        };

        let eol_len = if self.buf[idx] == b'\n' {
            1
        } else if idx + 1 < self.buf.len() {
            if self.buf[idx + 1] == b'\n' { 2 } else { 1 }
        } else if self.eof {
            1
        } else {
            // Can't tell `cr` from `cr lf` yet.
            return Ok(None);
        };

        let line = self.buf.split_to(idx);
        self.buf.advance(eol_len);
        String::from_utf8(line.to_vec())
            .map(Some)
            .map_err(|_| Error::InvalidPayload)
    }

    fn process_line(&mut self, line: &str) {
        if line.starts_with(':') {
            // Comment, often used as a keep-alive.
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => {
                (field, value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };
        match field {
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_owned()),
            },
            _ => trace!("ignoring sse field `{field}`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn sse(chunks: &[&'static [u8]]) -> Sse {
        Sse::new(Body::scripted(
            chunks.iter().copied().map(Bytes::from_static),
        ))
    }

    #[tokio::test]
    async fn test_normal_events() {
        let mut events = sse(&[b"data: hello\n\n", b"data: bye\n\n"]);
        assert_eq!(events.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(events.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(events.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let mut events = sse(&[b"data:", b" hello\n", b"\n"]);
        assert_eq!(events.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(events.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_crlf_and_comments() {
        let mut events = sse(&[
            b": keep-alive\r\n\r\n",
            b"event: message\r\nid: 7\r",
            b"\ndata: hello\r\n\r\n",
        ]);
        assert_eq!(events.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(events.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_multiline_data() {
        let mut events = sse(&[b"data: first\ndata:second\ndata\n\n"]);
        assert_eq!(
            events.next_event().await.unwrap().unwrap(),
            "first\nsecond\n"
        );
    }

    #[tokio::test]
    async fn test_split_utf8() {
        // "é" is 0xC3 0xA9.
        let mut events = sse(&[b"data: caf\xC3", b"\xA9\n\n"]);
        assert_eq!(events.next_event().await.unwrap().unwrap(), "café");
    }

    #[tokio::test]
    async fn test_incomplete_events() {
        let mut events = sse(&[b"xxxxxx\n\n"]);
        assert_eq!(events.next_event().await.unwrap(), None);

        let mut events = sse(&[b"data: hello\n", b"data: bye\n"]);
        assert_eq!(events.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let mut events = sse(&[b"data: \xFF\xFE\n\n"]);
        assert_eq!(
            events.next_event().await.unwrap_err(),
            Error::InvalidPayload
        );
    }
}
