//! AOF Writer
//!
//! A bounded queue in front of one dedicated worker thread that appends
//! encoded command frames to the log.
//!
//! ```text
//!  producer ─┐
//!  producer ─┼─► [ bounded queue ] ──► aof-writer thread ──► appendonly.aof
//!  producer ─┘      (backpressure)       SELECT n (when namespace changes)
//!                                        *N ... (the command itself)
//! ```
//!
//! The queue is the only synchronization point. Shutdown closes the queue,
//! waits for the worker to drain what is left, then flushes and syncs.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::config::AofSyncStrategy;
use crate::error::{KvError, Result};
use crate::protocol::{encode_frame, select_command, CommandLine, Frame};

/// Destination of the log worker
pub trait AofSink: Write + Send + 'static {
    /// Push written bytes to durable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl AofSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// One submitted command
#[derive(Debug)]
struct AofEntry {
    namespace: usize,
    command: CommandLine,
}

/// Counters kept by the worker
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AofStats {
    /// Command frames appended
    pub entries_written: u64,

    /// Namespace-select frames appended
    pub selects_written: u64,

    /// Appends or syncs that failed and were skipped
    pub write_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    entries_written: AtomicU64,
    selects_written: AtomicU64,
    write_failures: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> AofStats {
        AofStats {
            entries_written: self.entries_written.load(Ordering::Relaxed),
            selects_written: self.selects_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Appends submitted commands to the log, in submission order
pub struct AofWriter {
    /// `None` once shut down (or when disabled)
    sender: RwLock<Option<Sender<AofEntry>>>,

    /// Worker thread, taken on shutdown
    worker: Mutex<Option<JoinHandle<io::Result<()>>>>,

    counters: Arc<Counters>,

    enabled: bool,
}

impl AofWriter {
    /// Open (or create) a log file in append mode and start the worker
    pub fn open(path: &Path, queue_size: usize, sync_strategy: AofSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        tracing::info!("AOF writer appending to {}", path.display());
        Self::with_sink(file, queue_size, sync_strategy)
    }

    /// Start the worker over an arbitrary sink
    pub fn with_sink<S: AofSink>(
        sink: S,
        queue_size: usize,
        sync_strategy: AofSyncStrategy,
    ) -> Result<Self> {
        if queue_size == 0 {
            return Err(KvError::Config("AOF queue size must be at least 1".to_string()));
        }

        let (sender, receiver) = channel::bounded(queue_size);
        let counters = Arc::new(Counters::default());

        let worker = AofWorker {
            sink,
            current_namespace: 0,
            sync_strategy,
            uncommitted: 0,
            counters: Arc::clone(&counters),
        };
        let handle = thread::Builder::new()
            .name("aof-writer".into())
            .spawn(move || worker.run(receiver))?;

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            worker: Mutex::new(Some(handle)),
            counters,
            enabled: true,
        })
    }

    /// A writer that accepts and discards every submission
    pub fn disabled() -> Self {
        Self {
            sender: RwLock::new(None),
            worker: Mutex::new(None),
            counters: Arc::new(Counters::default()),
            enabled: false,
        }
    }

    /// Whether submissions reach a log file
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queue a command executed in `namespace`
    ///
    /// Blocks while the queue is full. No-op on a disabled writer; fails with
    /// `AofClosed` after shutdown.
    pub fn submit(&self, namespace: usize, command: CommandLine) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let guard = self.sender.read();
        let sender = guard.as_ref().ok_or(KvError::AofClosed)?;
        sender
            .send(AofEntry { namespace, command })
            .map_err(|_| KvError::AofClosed)
    }

    /// Snapshot of the worker's counters
    pub fn stats(&self) -> AofStats {
        self.counters.snapshot()
    }

    /// Close the queue, let the worker drain it, then flush and sync
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) -> Result<()> {
        // Dropping the only sender closes the queue once it is empty.
        drop(self.sender.write().take());

        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };

        let outcome = handle
            .join()
            .map_err(|_| KvError::AofWrite("writer thread panicked".to_string()))?;

        let stats = self.stats();
        tracing::info!(
            "AOF writer stopped: {} entries, {} selects, {} failures",
            stats.entries_written,
            stats.selects_written,
            stats.write_failures
        );

        outcome.map_err(|e| KvError::AofWrite(format!("final sync failed: {}", e)))
    }
}

impl Drop for AofWriter {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::error!("AOF shutdown failed: {}", e);
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

/// State owned by the worker thread
struct AofWorker<S> {
    sink: S,

    /// Namespace of the last entry actually written
    current_namespace: usize,

    sync_strategy: AofSyncStrategy,

    /// Entries appended since the last sync
    uncommitted: usize,

    counters: Arc<Counters>,
}

impl<S: AofSink> AofWorker<S> {
    /// Drain the queue until it is closed and empty
    fn run(mut self, receiver: Receiver<AofEntry>) -> io::Result<()> {
        for entry in receiver.iter() {
            self.append(entry);
        }

        self.sink.flush()?;
        self.sink.sync()
    }

    fn append(&mut self, entry: AofEntry) {
        if entry.namespace != self.current_namespace {
            let select = encode_frame(&Frame::from(select_command(entry.namespace)));
            match self.sink.write_all(&select) {
                Ok(()) => {
                    self.current_namespace = entry.namespace;
                    self.counters.selects_written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    // The command itself is still attempted below.
                    self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("AOF select {} append failed: {}", entry.namespace, e);
                }
            }
        }

        let data = encode_frame(&Frame::from(entry.command));
        match self.sink.write_all(&data) {
            Ok(()) => {
                self.counters.entries_written.fetch_add(1, Ordering::Relaxed);
                self.maybe_sync();
            }
            Err(e) => {
                self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("AOF append failed, entry skipped: {}", e);
            }
        }
    }

    fn maybe_sync(&mut self) {
        let due = match self.sync_strategy {
            AofSyncStrategy::EveryWrite => true,
            AofSyncStrategy::EveryNEntries { count } => {
                self.uncommitted += 1;
                self.uncommitted >= count
            }
            AofSyncStrategy::Os => false,
        };
        if !due {
            return;
        }

        self.uncommitted = 0;
        if let Err(e) = self.sink.flush().and_then(|()| self.sink.sync()) {
            self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("AOF sync failed: {}", e);
        }
    }
}
