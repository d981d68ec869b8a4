//! Streaming frame decoder
//!
//! Turns a byte stream into a lazy sequence of decode results. One
//! decoder owns one stream; it is never shared between readers.
//!
//! ## State Machine
//! ```text
//!            ┌──────────────────────────────────────────────┐
//!            ▼                                              │
//!        ┌───────┐  line   ┌────────┐  + - :  $-1  *0       │
//!        │ START ├────────►│ HEADER ├──────────────► MESSAGE┤
//!        └───────┘         └───┬─┬──┘                       │
//!                         $N   │ │  *N                      │
//!                     ┌────────┘ └──────────┐               │
//!                     ▼                     ▼               │
//!                 ┌──────┐            ┌─────────┐           │
//!                 │ BODY ├──────────► │ COLLECT ├──► MESSAGE┘
//!                 └──────┘  (top      └─────────┘  (count
//!                           level)                  reached)
//! ```
//!
//! A protocol error yields one `Err(DecodeError::Protocol)` and resets to
//! START; the stream continues. A read failure or end of stream yields one
//! terminal error and the iterator is exhausted afterwards.

use std::io::{self, BufRead, BufReader, Read};
use std::iter::FusedIterator;

use bytes::Bytes;

use crate::error::DecodeError;
use super::Frame;

/// Largest accepted bulk string (512 MiB)
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest accepted array element count
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// Longest accepted header or single-line frame, terminator included
pub const MAX_LINE_LEN: u64 = 64 * 1024;

/// Outcome of a decode step
pub type DecodeResult = std::result::Result<Frame, DecodeError>;

/// Where the decoder is inside the current frame
#[derive(Debug)]
enum Phase {
    /// About to read the leading sigil of a new frame
    Start,

    /// Header said `$len`; the body has not been read yet
    Body { len: usize },

    /// Header said `*expected`; gathering bulk elements
    Collect {
        expected: usize,
        elements: Vec<Option<Bytes>>,
        pending: Option<usize>,
    },
}

/// What a header line turned into
enum Header {
    /// Single-line frame or shortcut form, already complete
    Complete(Frame),

    /// More bytes are needed
    Continue(Phase),
}

/// Incremental decoder over any `Read`
pub struct FrameDecoder<R> {
    reader: BufReader<R>,
    phase: Phase,
    position: u64,
    finished: bool,
}

impl<R: Read> FrameDecoder<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            phase: Phase::Start,
            position: 0,
            finished: false,
        }
    }

    /// Bytes consumed from the underlying reader so far
    ///
    /// After a non-terminal result this is a frame boundary.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether a terminal result has been produced
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Get a reference to the underlying reader
    pub fn get_ref(&self) -> &R {
        self.reader.get_ref()
    }

    /// Drive the state machine until one result is ready
    fn decode_next(&mut self) -> DecodeResult {
        loop {
            // Taking the phase out means any early `?` return leaves START behind.
            match std::mem::replace(&mut self.phase, Phase::Start) {
                Phase::Start => {
                    let line = self.read_line(true)?;
                    match parse_header(&line)? {
                        Header::Complete(frame) => return Ok(frame),
                        Header::Continue(next) => self.phase = next,
                    }
                }
                Phase::Body { len } => {
                    let body = self.read_body(len)?;
                    return Ok(Frame::Bulk(Some(body)));
                }
                Phase::Collect {
                    expected,
                    mut elements,
                    pending,
                } => {
                    match pending {
                        None => {
                            let line = self.read_line(false)?;
                            match parse_element_header(&line)? {
                                Some(len) => {
                                    self.phase = Phase::Collect {
                                        expected,
                                        elements,
                                        pending: Some(len),
                                    };
                                    continue;
                                }
                                None => elements.push(None),
                            }
                        }
                        Some(len) => {
                            let body = self.read_body(len)?;
                            elements.push(Some(body));
                        }
                    }

                    if elements.len() == expected {
                        return Ok(Frame::Array(elements));
                    }
                    self.phase = Phase::Collect {
                        expected,
                        elements,
                        pending: None,
                    };
                }
            }
        }
    }

    /// Read one CRLF-terminated line, without the terminator
    ///
    /// `at_boundary` tells whether a clean end of stream here is a normal close.
    fn read_line(&mut self, at_boundary: bool) -> Result<Vec<u8>, DecodeError> {
        let mut line = Vec::new();
        let n = (&mut self.reader)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut line)?;
        self.position += n as u64;

        if n == 0 {
            return Err(if at_boundary {
                DecodeError::Closed
            } else {
                truncated("stream ended before the next header")
            });
        }

        if line.last() != Some(&b'\n') {
            if n as u64 == MAX_LINE_LEN {
                // Resync on the next line instead of parsing the overflow.
                self.skip_line()?;
                return Err(DecodeError::Protocol(format!(
                    "line exceeds {} bytes",
                    MAX_LINE_LEN
                )));
            }
            return Err(truncated("stream ended in the middle of a line"));
        }

        if line.len() < 2 || line[line.len() - 2] != b'\r' {
            return Err(DecodeError::Protocol(format!(
                "line not terminated by CRLF: {:?}",
                String::from_utf8_lossy(&line)
            )));
        }

        line.truncate(line.len() - 2);
        Ok(line)
    }

    /// Discard input up to and including the next `\n`, or to end of stream
    fn skip_line(&mut self) -> io::Result<()> {
        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            let (used, done) = match buf.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (buf.len(), false),
            };
            self.reader.consume(used);
            self.position += used as u64;
            if done {
                return Ok(());
            }
        }
    }

    /// Read exactly `len` payload bytes plus the CRLF that must follow them
    fn read_body(&mut self, len: usize) -> Result<Bytes, DecodeError> {
        let want = len as u64 + 2;
        let mut body = Vec::with_capacity((want as usize).min(64 * 1024));
        let n = (&mut self.reader).take(want).read_to_end(&mut body)?;
        self.position += n as u64;

        if (n as u64) < want {
            return Err(truncated("stream ended inside a bulk body"));
        }
        if &body[len..] != b"\r\n" {
            return Err(DecodeError::Protocol(
                "bulk body not followed by CRLF".to_string(),
            ));
        }

        body.truncate(len);
        Ok(Bytes::from(body))
    }
}

impl<R: Read> Iterator for FrameDecoder<R> {
    type Item = DecodeResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = self.decode_next();
        if let Err(e) = &result {
            if e.is_terminal() {
                self.finished = true;
            }
        }
        Some(result)
    }
}

impl<R: Read> FusedIterator for FrameDecoder<R> {}

// =============================================================================
// Header Parsing
// =============================================================================

fn parse_header(line: &[u8]) -> Result<Header, DecodeError> {
    let (&sigil, rest) = line
        .split_first()
        .ok_or_else(|| DecodeError::Protocol("empty line".to_string()))?;

    match sigil {
        b'+' => Ok(Header::Complete(Frame::Status(text(rest)))),
        b'-' => Ok(Header::Complete(Frame::Error(text(rest)))),
        b':' => {
            let value = parse_int(line, rest)?;
            Ok(Header::Complete(Frame::Integer(value)))
        }
        b'$' => match parse_bulk_len(line, rest)? {
            None => Ok(Header::Complete(Frame::Bulk(None))),
            Some(len) => Ok(Header::Continue(Phase::Body { len })),
        },
        b'*' => {
            let count = parse_int(line, rest)?;
            if count == 0 {
                return Ok(Header::Complete(Frame::Array(Vec::new())));
            }
            if !(1..=MAX_ARRAY_LEN).contains(&count) {
                return Err(bad_line("invalid array count", line));
            }
            let expected = count as usize;
            Ok(Header::Continue(Phase::Collect {
                expected,
                elements: Vec::with_capacity(expected.min(1024)),
                pending: None,
            }))
        }
        _ => Err(bad_line("unknown frame type", line)),
    }
}

/// Header of an array element: must be a bulk header
///
/// Returns `None` for a null element, `Some(len)` when a body follows.
fn parse_element_header(line: &[u8]) -> Result<Option<usize>, DecodeError> {
    match line.split_first() {
        Some((b'$', rest)) => parse_bulk_len(line, rest),
        _ => Err(bad_line("expected bulk string inside array", line)),
    }
}

fn parse_bulk_len(line: &[u8], digits: &[u8]) -> Result<Option<usize>, DecodeError> {
    match parse_int(line, digits)? {
        -1 => Ok(None),
        len if (0..=MAX_BULK_LEN).contains(&len) => Ok(Some(len as usize)),
        _ => Err(bad_line("invalid bulk length", line)),
    }
}

fn parse_int(line: &[u8], digits: &[u8]) -> Result<i64, DecodeError> {
    std::str::from_utf8(digits)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| bad_line("invalid integer", line))
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn bad_line(what: &str, line: &[u8]) -> DecodeError {
    DecodeError::Protocol(format!("{}: {:?}", what, String::from_utf8_lossy(line)))
}

fn truncated(what: &str) -> DecodeError {
    DecodeError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, what))
}
