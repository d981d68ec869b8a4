//! Keyspace Module
//!
//! In-memory data for one namespace.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Many concurrent readers, writers serialized by the lock
//! - Ordered snapshots for comparisons and debugging
//!
//! ## Data Structure Choice
//! A `HashMap` behind a `parking_lot::RwLock`. Keys and values are
//! `Bytes`, so handing a value back to a reply is a refcount bump.

mod table;

pub use table::Keyspace;
