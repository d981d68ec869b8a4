//! Configuration for RespKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{KvError, Result};

/// Main configuration for a RespKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── appendonly.aof   (append-only command log)
    pub data_dir: PathBuf,

    /// Number of selectable namespaces (SELECT 0 .. databases-1)
    pub databases: usize,

    // -------------------------------------------------------------------------
    // AOF Configuration
    // -------------------------------------------------------------------------
    /// Whether accepted write commands are logged and replayed at startup
    pub append_only: bool,

    /// Log file name, relative to `data_dir` unless absolute
    pub append_filename: PathBuf,

    /// Capacity of the submission queue in front of the log writer
    pub aof_queue_size: usize,

    /// Sync strategy: how often to fsync the log
    pub aof_sync_strategy: AofSyncStrategy,

    /// Truncate a partially written last frame on load instead of failing
    pub aof_load_truncated: bool,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// AOF sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AofSyncStrategy {
    /// fsync after every appended entry (safest, slowest)
    EveryWrite,

    /// fsync after N appended entries (balanced durability/performance)
    EveryNEntries { count: usize },

    /// Never fsync explicitly, leave it to the OS
    Os,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./respkv_data"),
            databases: 16,
            append_only: true,
            append_filename: PathBuf::from("appendonly.aof"),
            aof_queue_size: 1 << 16,
            aof_sync_strategy: AofSyncStrategy::EveryNEntries { count: 100 },
            aof_load_truncated: true,
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the append-only log
    pub fn aof_path(&self) -> PathBuf {
        if self.append_filename.is_absolute() {
            self.append_filename.clone()
        } else {
            self.data_dir.join(&self.append_filename)
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.databases == 0 {
            return Err(KvError::Config("databases must be at least 1".to_string()));
        }
        if self.aof_queue_size == 0 {
            return Err(KvError::Config("aof_queue_size must be at least 1".to_string()));
        }
        if let AofSyncStrategy::EveryNEntries { count: 0 } = self.aof_sync_strategy {
            return Err(KvError::Config("sync interval must be at least 1 entry".to_string()));
        }
        if self.append_filename.as_os_str().is_empty() {
            return Err(KvError::Config("append_filename is empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the number of namespaces
    pub fn databases(mut self, count: usize) -> Self {
        self.config.databases = count;
        self
    }

    /// Enable or disable the append-only log
    pub fn append_only(mut self, enabled: bool) -> Self {
        self.config.append_only = enabled;
        self
    }

    /// Set the log file name
    pub fn append_filename(mut self, name: impl Into<PathBuf>) -> Self {
        self.config.append_filename = name.into();
        self
    }

    /// Set the submission queue capacity
    pub fn aof_queue_size(mut self, size: usize) -> Self {
        self.config.aof_queue_size = size;
        self
    }

    /// Set the AOF sync strategy
    pub fn aof_sync_strategy(mut self, strategy: AofSyncStrategy) -> Self {
        self.config.aof_sync_strategy = strategy;
        self
    }

    /// Allow loading a log whose last frame was cut short
    pub fn aof_load_truncated(mut self, allow: bool) -> Self {
        self.config.aof_load_truncated = allow;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
