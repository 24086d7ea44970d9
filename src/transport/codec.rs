//! Incremental frame codec for JSON messages on a byte stream.
//!
//! Two framings are supported:
//!
//! - **Newline**: one JSON message per `\n`-terminated line. Blank lines
//!   between frames are tolerated and skipped.
//! - **Content-Length**: an HTTP-style header block
//!   (`Content-Length: <n>\r\n\r\n`) followed by exactly `n` bytes of JSON
//!   body.
//!
//! Framing is fixed per codec instance; there is no negotiation, so both
//! peers must agree on the mode out of band.
//!
//! The codec is purely incremental: bytes are fed in with
//! [`FrameCodec::append`] as they arrive from the stream, and complete
//! messages are pulled out with [`FrameCodec::try_read_message`]. A partial
//! frame stays buffered across calls until the rest of it arrives.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameDecodeError;

/// How messages are delimited on the byte stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    /// One JSON message per newline-terminated line (the default).
    #[default]
    Newline,
    /// `Content-Length` header, blank line, then the JSON body.
    ContentLength,
}

/// Incremental decoder/encoder for framed JSON messages.
#[derive(Debug)]
pub struct FrameCodec {
    framing: Framing,
    buffer: Vec<u8>,
}

impl FrameCodec {
    /// Creates a codec for the given framing with an empty buffer.
    #[must_use]
    pub const fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: Vec::new(),
        }
    }

    /// Appends raw bytes received from the stream.
    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Attempts to extract the next complete message from the buffer.
    ///
    /// Returns `Ok(None)` when no complete frame has arrived yet; the
    /// buffered partial frame is kept for subsequent calls.
    ///
    /// # Errors
    ///
    /// Returns [`FrameDecodeError::Json`] when a complete frame does not
    /// contain valid JSON, and [`FrameDecodeError::Header`] when a complete
    /// header block lacks a usable `Content-Length`. Both are fatal to the
    /// stream: framing cannot be trusted afterwards.
    pub fn try_read_message(&mut self) -> Result<Option<Value>, FrameDecodeError> {
        match self.framing {
            Framing::Newline => self.read_line_frame(),
            Framing::ContentLength => self.read_header_frame(),
        }
    }

    fn read_line_frame(&mut self) -> Result<Option<Value>, FrameDecodeError> {
        loop {
            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
                return Ok(None);
            };
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop(); // the '\n' terminator
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            // Blank lines are stream noise, not frames.
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let value =
                serde_json::from_slice(&line).map_err(|source| FrameDecodeError::Json { source })?;
            return Ok(Some(value));
        }
    }

    fn read_header_frame(&mut self) -> Result<Option<Value>, FrameDecodeError> {
        let Some(header_end) = find_subslice(&self.buffer, b"\r\n\r\n") else {
            return Ok(None);
        };
        let header = String::from_utf8_lossy(&self.buffer[..header_end]).into_owned();
        let Some(length) = content_length(&header) else {
            return Err(FrameDecodeError::Header { header });
        };
        let body_start = header_end + 4;
        if self.buffer.len() < body_start + length {
            // Header complete but the body has not fully arrived.
            return Ok(None);
        }
        let frame: Vec<u8> = self.buffer.drain(..body_start + length).collect();
        let value = serde_json::from_slice(&frame[body_start..])
            .map_err(|source| FrameDecodeError::Json { source })?;
        Ok(Some(value))
    }

    /// Encodes one message as a single frame in the active framing.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialised to JSON.
    pub fn encode<M: Serialize>(&self, message: &M) -> Result<Vec<u8>, serde_json::Error> {
        let body = serde_json::to_vec(message)?;
        // Compact JSON never contains a raw newline, so one line is one frame.
        debug_assert!(!body.contains(&b'\n'));
        Ok(match self.framing {
            Framing::Newline => {
                let mut frame = body;
                frame.push(b'\n');
                frame
            }
            Framing::ContentLength => {
                let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
                frame.extend_from_slice(&body);
                frame
            }
        })
    }

    /// Discards all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes currently buffered.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// The framing this codec was created with.
    #[must_use]
    pub const fn framing(&self) -> Framing {
        self.framing
    }
}

/// Extracts the `Content-Length` value from a header block.
///
/// Header names are matched case-insensitively.
fn content_length(header: &str) -> Option<usize> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(?i)content-length:\s*(\d+)").expect("hardcoded pattern is valid")
    });
    pattern
        .captures(header)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
