//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufWriter};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{Engine, ExecContext, Executor};
use crate::error::{DecodeError, KvError, Result};
use crate::protocol::{write_frame, CommandKind, Frame, FrameDecoder};

/// Per-connection execution state
#[derive(Debug, Default, Clone, Copy)]
pub struct Session {
    namespace: usize,
}

impl ExecContext for Session {
    fn namespace(&self) -> usize {
        self.namespace
    }

    fn set_namespace(&mut self, index: usize) {
        self.namespace = index;
    }
}

/// Handles a single client connection
pub struct Connection {
    /// Frame decoder over the read half
    decoder: FrameDecoder<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Selected namespace for this client
    session: Session,

    /// Set when a client asks the server to stop
    shutdown: Arc<AtomicBool>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>, shutdown: Arc<AtomicBool>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            decoder: FrameDecoder::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            session: Session::default(),
            shutdown,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.decoder
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Decodes frames in a loop and answers each one. Pipelined requests are
    /// answered in order. Returns when the client disconnects.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        while let Some(result) = self.decoder.next() {
            let reply = match result {
                Ok(frame) => match frame.into_command_line() {
                    Some(argv) => {
                        tracing::trace!("Received {} args from {}", argv.len(), self.peer_addr);
                        if CommandKind::lookup(&argv[0]) == Some(CommandKind::Shutdown) {
                            tracing::info!("Shutdown requested by {}", self.peer_addr);
                            self.shutdown.store(true, Ordering::Release);
                            return match self.send(&Frame::ok()) {
                                Ok(()) => Ok(()),
                                Err(e) => self.write_failed(e),
                            };
                        }
                        self.engine.execute(&mut self.session, &argv)
                    }
                    None => Frame::error("ERR Protocol error: expected a command array"),
                },
                Err(DecodeError::Protocol(message)) => {
                    tracing::debug!("Protocol error from {}: {}", self.peer_addr, message);
                    Frame::error(format!("ERR Protocol error: {}", message))
                }
                Err(DecodeError::Closed) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(DecodeError::Io(e)) => return self.read_failed(e),
            };

            if let Err(e) = self.send(&reply) {
                return self.write_failed(e);
            }
        }

        Ok(())
    }

    fn read_failed(&self, e: io::Error) -> Result<()> {
        match e.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => {
                tracing::debug!("Client {} went away: {}", self.peer_addr, e);
                Ok(())
            }
            // Windows reports TimedOut instead of WouldBlock
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                tracing::debug!("Read timeout for client {}", self.peer_addr);
                Ok(())
            }
            _ => {
                tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                Err(KvError::Io(e))
            }
        }
    }

    /// Send a reply
    fn send(&mut self, reply: &Frame) -> Result<()> {
        write_frame(&mut self.writer, reply)
    }

    /// Decide whether a failed reply write ends the connection quietly
    fn write_failed(&self, e: KvError) -> Result<()> {
        // A client that hung up before its reply went out is a normal close.
        if let KvError::Io(ref io_err) = e {
            match io_err.kind() {
                io::ErrorKind::ConnectionAborted
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::BrokenPipe => {
                    tracing::debug!(
                        "Client {} disconnected before reply could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                _ => {}
            }
        }
        tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
        Err(e)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
