//! Append-Only File (AOF) Module
//!
//! Durability through an append-only log of executed write commands.
//!
//! ## Responsibilities
//! - Append accepted write commands in submission order
//! - Insert namespace-select frames when the namespace changes
//! - Replay the log at startup to rebuild state
//! - Tolerate a partially written last frame
//!
//! ## File Format
//! A raw concatenation of RESP array frames; no header, no checksum.
//! ```text
//! *3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n
//! *2\r\n$6\r\nSELECT\r\n$1\r\n1\r\n
//! *3\r\n$3\r\nSET\r\n$1\r\nb\r\n$1\r\n2\r\n
//! ```

mod writer;
mod loader;

pub use writer::{AofSink, AofStats, AofWriter};
pub use loader::{AofLoader, ReplayContext, ReplayReport};
