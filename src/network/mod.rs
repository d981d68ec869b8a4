//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread polling a non-blocking listener
//! - One thread per connection, each owning its own frame decoder
//! - Commands routed through Engine

mod server;
mod connection;

pub use server::Server;
pub use connection::{Connection, Session};
