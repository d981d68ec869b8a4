//! # RespKV
//!
//! A key-value server speaking the RESP wire protocol, with:
//! - A streaming, binary-safe frame decoder and its inverse encoder
//! - An append-only file (AOF) of accepted write commands
//! - Startup replay of the AOF to rebuild state
//! - Multiple selectable namespaces
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │            (one thread + FrameDecoder per client)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ command lines
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │              (Executor over N keyspaces)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  AofWriter  │          │  Keyspace   │
//!   │ (queue + 1  │          │  (RwLock)   │
//!   │   worker)   │          └─────────────┘
//!   └──────┬──────┘
//!          ▼
//!   appendonly.aof ──► AofLoader (startup replay)
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod aof;
pub mod keyspace;
pub mod network;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DecodeError, KvError, Result};
pub use config::Config;
pub use engine::{Engine, ExecContext, Executor};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of RespKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
