//! RespKV Server Binary
//!
//! Starts the TCP server for RespKV.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use respkv::config::AofSyncStrategy;
use respkv::network::Server;
use respkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// RespKV Server
#[derive(Parser, Debug)]
#[command(name = "respkv-server")]
#[command(about = "RESP key-value server with an append-only log")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./respkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Number of selectable databases
    #[arg(long, default_value = "16")]
    databases: usize,

    /// Disable the append-only log
    #[arg(long)]
    no_appendonly: bool,

    /// Append-only log file name (relative to the data directory)
    #[arg(long, default_value = "appendonly.aof")]
    appendfilename: String,

    /// When to fsync the append-only log
    #[arg(long, value_enum, default_value = "batched")]
    appendfsync: FsyncPolicy,

    /// Refuse to start if the log ends inside a frame
    #[arg(long)]
    strict_aof_load: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FsyncPolicy {
    /// After every entry
    Always,
    /// Every 100 entries
    Batched,
    /// Leave it to the OS
    No,
}

impl From<FsyncPolicy> for AofSyncStrategy {
    fn from(policy: FsyncPolicy) -> Self {
        match policy {
            FsyncPolicy::Always => AofSyncStrategy::EveryWrite,
            FsyncPolicy::Batched => AofSyncStrategy::EveryNEntries { count: 100 },
            FsyncPolicy::No => AofSyncStrategy::Os,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,respkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("RespKV Server v{}", respkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .databases(args.databases)
        .append_only(!args.no_appendonly)
        .append_filename(&args.appendfilename)
        .aof_sync_strategy(args.appendfsync.into())
        .aof_load_truncated(!args.strict_aof_load)
        .build();

    // Open engine (replays the AOF)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    // Runs until a client sends SHUTDOWN
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
    }

    // Drain the AOF queue before exiting
    if let Err(e) = engine.close() {
        tracing::error!("Failed to close AOF: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
