//! Frame encoding
//!
//! Byte-exact inverse of the decoder's grammar. Stateless: the same frame
//! always encodes to the same bytes.
//!
//! ## Wire Format
//! ```text
//! +<text>\r\n                   status
//! -<text>\r\n                   error
//! :<i64>\r\n                    integer
//! $<len>\r\n<bytes>\r\n         bulk string      ($-1\r\n = null)
//! *<count>\r\n<bulk frames>     array            (*0\r\n  = empty)
//! ```

use std::io::Write;

use bytes::Bytes;

use crate::error::{DecodeError, Result};
use super::{Frame, FrameDecoder};

const CRLF: &[u8] = b"\r\n";

// =============================================================================
// Encoding
// =============================================================================

/// Encode a frame to bytes
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(frame));
    encode_into(frame, &mut buf);
    buf
}

/// Append the encoding of `frame` to `buf`
pub fn encode_into(frame: &Frame, buf: &mut Vec<u8>) {
    match frame {
        Frame::Status(text) => put_line(buf, b'+', text.as_bytes()),
        Frame::Error(text) => put_line(buf, b'-', text.as_bytes()),
        Frame::Integer(value) => put_line(buf, b':', value.to_string().as_bytes()),
        Frame::Bulk(data) => put_bulk(buf, data.as_ref()),
        Frame::Array(elements) => {
            put_line(buf, b'*', elements.len().to_string().as_bytes());
            for element in elements {
                put_bulk(buf, element.as_ref());
            }
        }
    }
}

/// Exact number of bytes `encode_frame` will produce
pub fn encoded_len(frame: &Frame) -> usize {
    fn line_len(body: usize) -> usize {
        1 + body + CRLF.len()
    }
    fn bulk_len(data: Option<&Bytes>) -> usize {
        match data {
            None => line_len(2),
            Some(d) => line_len(digits(d.len() as i64)) + d.len() + CRLF.len(),
        }
    }

    match frame {
        Frame::Status(text) | Frame::Error(text) => line_len(text.len()),
        Frame::Integer(value) => line_len(digits(*value)),
        Frame::Bulk(data) => bulk_len(data.as_ref()),
        Frame::Array(elements) => {
            line_len(digits(elements.len() as i64))
                + elements.iter().map(|e| bulk_len(e.as_ref())).sum::<usize>()
        }
    }
}

fn put_line(buf: &mut Vec<u8>, sigil: u8, body: &[u8]) {
    buf.push(sigil);
    buf.extend_from_slice(body);
    buf.extend_from_slice(CRLF);
}

fn put_bulk(buf: &mut Vec<u8>, data: Option<&Bytes>) {
    match data {
        None => buf.extend_from_slice(b"$-1\r\n"),
        Some(data) => {
            put_line(buf, b'$', data.len().to_string().as_bytes());
            buf.extend_from_slice(data);
            buf.extend_from_slice(CRLF);
        }
    }
}

fn digits(value: i64) -> usize {
    let sign = usize::from(value < 0);
    let mut n = value.unsigned_abs();
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    sign + count
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a frame to a stream and flush it
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<()> {
    writer.write_all(&encode_frame(frame))?;
    writer.flush()?;
    Ok(())
}

/// Decode the first frame of an in-memory buffer
pub fn decode_frame(bytes: &[u8]) -> std::result::Result<Frame, DecodeError> {
    FrameDecoder::new(bytes)
        .next()
        .unwrap_or(Err(DecodeError::Closed))
}
