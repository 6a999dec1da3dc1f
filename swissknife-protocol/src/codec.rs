//! Message codec for stdio framing
//!
//! Each message is a block of ASCII header lines (CRLF or LF terminated)
//! ending at the first blank line, followed by exactly `Content-Length`
//! bytes of UTF-8 JSON.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

/// Maximum message body size (16 MB)
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Protocol codec error
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// One decoded unit of the stdio stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete message body
    Message(Bytes),
    /// A header block declared a zero or negative length; the peer is done
    End,
}

/// Codec for `Content-Length` framed JSON messages
///
/// A body longer than the size limit is discarded and decoding resumes at
/// the next header block.
#[derive(Debug)]
pub struct ContentLengthCodec {
    /// Length declared by the header block currently being read
    content_length: Option<i64>,
    /// Set once the header block is complete and the body is pending
    body_len: Option<usize>,
    /// Bytes of an oversized body still to be thrown away
    skip: usize,
    max_size: usize,
}

impl Default for ContentLengthCodec {
    fn default() -> Self {
        Self::with_max_size(MAX_MESSAGE_SIZE)
    }
}

impl ContentLengthCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec that accepts bodies of at most `max_size` bytes
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            content_length: None,
            body_len: None,
            skip: 0,
            max_size,
        }
    }
}

impl Decoder for ContentLengthCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.skip > 0 {
                let n = self.skip.min(src.len());
                src.advance(n);
                self.skip -= n;
                if self.skip > 0 {
                    return Ok(None);
                }
            }

            if let Some(len) = self.body_len {
                if src.len() < len {
                    src.reserve(len - src.len());
                    return Ok(None);
                }
                self.body_len = None;
                let body = src.split_to(len).freeze();
                return Ok(Some(Frame::Message(body)));
            }

            let Some(newline) = src.iter().position(|b| *b == b'\n') else {
                return Ok(None);
            };
            let raw = src.split_to(newline + 1);
            let line = strip_line_ending(&raw);

            if line.is_empty() {
                let declared = self.content_length.take().unwrap_or(0);
                if declared <= 0 {
                    return Ok(Some(Frame::End));
                }
                let len = usize::try_from(declared).unwrap_or(usize::MAX);
                if len > self.max_size {
                    warn!(size = len, max = self.max_size, "Discarding oversized message");
                    self.skip = len;
                    continue;
                }
                self.body_len = Some(len);
                continue;
            }

            match parse_header(line) {
                Some((key, value)) if key.eq_ignore_ascii_case("content-length") => {
                    match value.parse::<i64>() {
                        Ok(len) => self.content_length = Some(len),
                        Err(_) => debug!(value, "Ignoring non-numeric Content-Length"),
                    }
                }
                Some(_) => {}
                None => debug!(
                    line = %String::from_utf8_lossy(line),
                    "Skipping unparseable header line"
                ),
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !buf.is_empty() {
                    debug!(remaining = buf.len(), "Discarding partial frame at end of stream");
                    buf.clear();
                }
                self.content_length = None;
                self.body_len = None;
                self.skip = 0;
                Ok(None)
            }
        }
    }
}

impl<T: Serialize> Encoder<T> for ContentLengthCodec {
    type Error = CodecError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&item)?;

        if body.len() > self.max_size {
            return Err(CodecError::MessageTooLarge {
                size: body.len(),
                max: self.max_size,
            });
        }

        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        dst.reserve(header.len() + body.len());
        dst.put_slice(header.as_bytes());
        dst.put_slice(&body);
        Ok(())
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Split a `Key: value` header line
fn parse_header(line: &[u8]) -> Option<(&str, &str)> {
    let text = std::str::from_utf8(line).ok()?;
    let (key, value) = text.split_once(':')?;
    Some((key.trim(), value.trim()))
}
