//! Frame definitions
//!
//! A frame is one self-delimited unit of the wire grammar. Requests are
//! always flat arrays of bulk strings; replies may be any variant.

use bytes::Bytes;

use super::{command_line, CommandLine};

/// A decoded (or to-be-encoded) wire frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `+<text>\r\n`
    Status(String),

    /// `-<text>\r\n`
    Error(String),

    /// `:<i64>\r\n`
    Integer(i64),

    /// `$<len>\r\n<bytes>\r\n`, or `$-1\r\n` for `None`
    Bulk(Option<Bytes>),

    /// `*<count>\r\n` followed by `count` bulk sub-frames; elements may be null
    Array(Vec<Option<Bytes>>),
}

impl Frame {
    /// `+OK`
    pub fn ok() -> Self {
        Frame::Status("OK".to_string())
    }

    /// `+PONG`
    pub fn pong() -> Self {
        Frame::Status("PONG".to_string())
    }

    /// An error reply
    pub fn error(message: impl Into<String>) -> Self {
        Frame::Error(message.into())
    }

    /// A non-null bulk string
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Frame::Bulk(Some(data.into()))
    }

    /// The null bulk string
    pub fn null_bulk() -> Self {
        Frame::Bulk(None)
    }

    /// An array frame holding a command invocation
    pub fn command<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Frame::from(command_line(parts))
    }

    /// Whether this is an error reply
    pub fn is_error(&self) -> bool {
        matches!(self, Frame::Error(_))
    }

    /// Turn an array frame into a command line
    ///
    /// Null elements become empty arguments. Returns `None` for anything
    /// that is not a non-empty array.
    pub fn into_command_line(self) -> Option<CommandLine> {
        match self {
            Frame::Array(elements) if !elements.is_empty() => Some(
                elements
                    .into_iter()
                    .map(|e| e.unwrap_or_default())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Short type name, used in log messages
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Status(_) => "status",
            Frame::Error(_) => "error",
            Frame::Integer(_) => "integer",
            Frame::Bulk(_) => "bulk",
            Frame::Array(_) => "array",
        }
    }
}

impl From<CommandLine> for Frame {
    fn from(line: CommandLine) -> Self {
        Frame::Array(line.into_iter().map(Some).collect())
    }
}
