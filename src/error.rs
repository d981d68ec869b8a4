//! Error types for RespKV
//!
//! Provides a unified error type for all operations, plus the decode
//! error carried by every result of the frame decoder.

use std::io;
use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for RespKV operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // AOF Errors
    // -------------------------------------------------------------------------
    #[error("AOF write failed: {0}")]
    AofWrite(String),

    #[error("AOF corruption detected: {0}")]
    AofCorruption(String),

    #[error("AOF writer is closed")]
    AofClosed,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error half of a decode result
///
/// `Protocol` is recoverable: the decoder resets and keeps producing
/// results. `Closed` and `Io` are terminal: the decoder yields nothing
/// after them.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Malformed frame (bad terminator, unparsable length, unsupported count)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Clean end of stream at a frame boundary
    #[error("stream closed")]
    Closed,

    /// Read failure, or end of stream in the middle of a frame
    #[error("stream read failed: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Whether this result ends the decode session
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DecodeError::Protocol(_))
    }

    /// Whether the stream ended inside a frame
    pub fn is_truncated(&self) -> bool {
        matches!(self, DecodeError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}

impl From<DecodeError> for KvError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Protocol(msg) => KvError::Protocol(msg),
            DecodeError::Closed => KvError::Network("connection closed".to_string()),
            DecodeError::Io(e) => KvError::Io(e),
        }
    }
}
