//! Engine Module
//!
//! The storage engine that coordinates keyspaces and the append-only log.
//!
//! ## Responsibilities
//! - Execute command lines against the selected namespace
//! - Submit accepted write commands to the AOF writer
//! - Replay the AOF on startup, before the writer starts

use std::fs;

use bytes::Bytes;

use crate::aof::{AofLoader, AofStats, AofWriter};
use crate::config::Config;
use crate::error::Result;
use crate::keyspace::Keyspace;
use crate::protocol::{CommandKind, Frame};

// =============================================================================
// Execution Contract
// =============================================================================

/// Per-caller state a command can read and change
pub trait ExecContext {
    /// Currently selected namespace
    fn namespace(&self) -> usize;

    /// Switch the selected namespace
    fn set_namespace(&mut self, index: usize);
}

/// Anything that can run a command line and produce a reply
pub trait Executor {
    fn execute(&self, ctx: &mut dyn ExecContext, argv: &[Bytes]) -> Frame;
}

// =============================================================================
// Engine
// =============================================================================

/// The main storage engine
///
/// ## Concurrency Model
///
/// - Each keyspace carries its own `RwLock`; commands on different
///   namespaces never contend.
/// - The AOF writer is fed through a bounded queue; `execute` blocks only
///   when that queue is full.
/// - A write is applied and submitted under the same keyspace write lock,
///   so same-namespace writes reach the log in the order they took effect.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// One keyspace per namespace
    keyspaces: Vec<Keyspace>,

    /// Log of accepted writes (disabled when `append_only` is off)
    aof: AofWriter,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Replay the AOF if present (nothing is logged while replaying)
    /// 3. Reopen the AOF for appending and start the writer
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let keyspaces = (0..config.databases).map(|_| Keyspace::new()).collect();
        let mut engine = Self {
            config,
            keyspaces,
            aof: AofWriter::disabled(),
        };

        if engine.config.append_only {
            let path = engine.config.aof_path();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            AofLoader::load(&path, &engine, engine.config.aof_load_truncated)?;

            engine.aof = AofWriter::open(
                &path,
                engine.config.aof_queue_size,
                engine.config.aof_sync_strategy,
            )?;
        }

        Ok(engine)
    }

    /// Drain and close the AOF writer
    ///
    /// Writes after this are still applied in memory but no longer logged.
    pub fn close(&self) -> Result<()> {
        self.aof.shutdown()
    }

    // =========================================================================
    // Command Handlers
    // =========================================================================

    fn select(&self, ctx: &mut dyn ExecContext, arg: &[u8]) -> Frame {
        let index = match std::str::from_utf8(arg).ok().and_then(|s| s.parse::<usize>().ok()) {
            Some(index) => index,
            None => return Frame::error("ERR invalid DB index"),
        };
        if index >= self.keyspaces.len() {
            return Frame::error("ERR DB index is out of range");
        }
        ctx.set_namespace(index);
        Frame::ok()
    }

    fn ping(argv: &[Bytes]) -> Frame {
        match argv {
            [_] => Frame::pong(),
            [_, message] => Frame::Bulk(Some(message.clone())),
            _ => Frame::error("ERR wrong number of arguments for 'ping' command"),
        }
    }

    /// Submit an applied write to the AOF
    ///
    /// Called with the keyspace write lock held, so the log order of writes
    /// to one namespace matches the order they were applied in.
    fn log_write(&self, kind: CommandKind, namespace: usize, argv: &[Bytes]) {
        if let Err(e) = self.aof.submit(namespace, argv.to_vec()) {
            tracing::warn!("Failed to log {} in namespace {}: {}", kind.name(), namespace, e);
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get a namespace's keyspace
    pub fn keyspace(&self, index: usize) -> Option<&Keyspace> {
        self.keyspaces.get(index)
    }

    /// Number of namespaces
    pub fn databases(&self) -> usize {
        self.keyspaces.len()
    }

    /// Counters of the AOF writer
    pub fn aof_stats(&self) -> AofStats {
        self.aof.stats()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Executor for Engine {
    fn execute(&self, ctx: &mut dyn ExecContext, argv: &[Bytes]) -> Frame {
        let Some(name) = argv.first() else {
            return Frame::error("ERR empty command");
        };
        let Some(kind) = CommandKind::lookup(name) else {
            return Frame::error(format!(
                "ERR unknown command '{}'",
                String::from_utf8_lossy(name)
            ));
        };
        if !kind.accepts(argv.len()) {
            return Frame::error(format!(
                "ERR wrong number of arguments for '{}' command",
                kind.name()
            ));
        }

        let namespace = ctx.namespace();
        let Some(keyspace) = self.keyspaces.get(namespace) else {
            return Frame::error("ERR DB index is out of range");
        };

        match kind {
            CommandKind::Ping => Self::ping(argv),
            CommandKind::Echo => Frame::Bulk(Some(argv[1].clone())),
            CommandKind::Select => self.select(ctx, &argv[1]),
            CommandKind::Set => keyspace.write_with(|map| {
                map.insert(argv[1].clone(), argv[2].clone());
                self.log_write(kind, namespace, argv);
                Frame::ok()
            }),
            CommandKind::Get => Frame::Bulk(keyspace.get(&argv[1])),
            CommandKind::Del => keyspace.write_with(|map| {
                let removed = argv[1..]
                    .iter()
                    .filter(|key| map.remove(&key[..]).is_some())
                    .count();
                self.log_write(kind, namespace, argv);
                Frame::Integer(removed as i64)
            }),
            CommandKind::Exists => Frame::Integer(keyspace.count_existing(&argv[1..]) as i64),
            CommandKind::DbSize => Frame::Integer(keyspace.len() as i64),
            CommandKind::FlushDb => keyspace.write_with(|map| {
                map.clear();
                self.log_write(kind, namespace, argv);
                Frame::ok()
            }),
            CommandKind::Shutdown => Frame::error("ERR SHUTDOWN is handled by the server"),
        }
    }
}
