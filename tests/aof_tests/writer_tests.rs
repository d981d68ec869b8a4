//! Tests for the AOF Writer
//!
//! These tests verify:
//! - Namespace-select interleaving
//! - Submission order under concurrent producers
//! - Drain before close on shutdown
//! - Best-effort handling of failed appends
//! - Sync strategies

use std::fs;
use std::io::{self, Cursor, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use respkv::aof::{AofSink, AofWriter};
use respkv::config::AofSyncStrategy;
use respkv::protocol::{command_line, CommandLine, FrameDecoder};
use respkv::KvError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_aof() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let aof_path = temp_dir.path().join("test.aof");
    (temp_dir, aof_path)
}

fn cmd(parts: &[&str]) -> CommandLine {
    command_line(parts)
}

/// Decode every command line stored in a log
fn read_commands(bytes: Vec<u8>) -> Vec<CommandLine> {
    FrameDecoder::new(Cursor::new(bytes))
        .take_while(|r| r.is_ok())
        .map(|r| r.unwrap().into_command_line().unwrap())
        .collect()
}

/// In-memory sink that can be told to reject SELECT frames
#[derive(Clone, Default)]
struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
    syncs: Arc<Mutex<usize>>,
    reject_selects: bool,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.reject_selects && buf.starts_with(b"*2\r\n$6\r\nSELECT") {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.data.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AofSink for MemorySink {
    fn sync(&mut self) -> io::Result<()> {
        *self.syncs.lock() += 1;
        Ok(())
    }
}

// =============================================================================
// Interleaving Tests
// =============================================================================

#[test]
fn test_namespace_select_interleaving() {
    let (_temp, aof_path) = setup_temp_aof();

    let writer = AofWriter::open(&aof_path, 16, AofSyncStrategy::EveryWrite).unwrap();
    writer.submit(0, cmd(&["SET", "a", "1"])).unwrap();
    writer.submit(1, cmd(&["SET", "b", "2"])).unwrap();
    writer.submit(0, cmd(&["SET", "a", "3"])).unwrap();
    writer.shutdown().unwrap();

    let commands = read_commands(fs::read(&aof_path).unwrap());
    assert_eq!(
        commands,
        vec![
            cmd(&["SET", "a", "1"]),
            cmd(&["SELECT", "1"]),
            cmd(&["SET", "b", "2"]),
            cmd(&["SELECT", "0"]),
            cmd(&["SET", "a", "3"]),
        ]
    );
}

#[test]
fn test_no_redundant_select() {
    let sink = MemorySink::default();
    let writer = AofWriter::with_sink(sink.clone(), 16, AofSyncStrategy::Os).unwrap();

    writer.submit(3, cmd(&["SET", "a", "1"])).unwrap();
    writer.submit(3, cmd(&["SET", "b", "2"])).unwrap();
    writer.submit(3, cmd(&["DEL", "a"])).unwrap();
    writer.shutdown().unwrap();

    let commands = read_commands(sink.data.lock().clone());
    assert_eq!(
        commands,
        vec![
            cmd(&["SELECT", "3"]),
            cmd(&["SET", "a", "1"]),
            cmd(&["SET", "b", "2"]),
            cmd(&["DEL", "a"]),
        ]
    );

    let stats = writer.stats();
    assert_eq!(stats.entries_written, 3);
    assert_eq!(stats.selects_written, 1);
    assert_eq!(stats.write_failures, 0);
}

#[test]
fn test_binary_arguments_survive() {
    let sink = MemorySink::default();
    let writer = AofWriter::with_sink(sink.clone(), 4, AofSyncStrategy::Os).unwrap();

    let line = command_line([&b"SET"[..], &b"k\r\n"[..], &[0u8, 255, 13, 10][..]]);
    writer.submit(0, line.clone()).unwrap();
    writer.shutdown().unwrap();

    assert_eq!(read_commands(sink.data.lock().clone()), vec![line]);
}

// =============================================================================
// Ordering and Shutdown Tests
// =============================================================================

#[test]
fn test_concurrent_producers_keep_per_producer_order() {
    let sink = MemorySink::default();
    // Tiny queue so producers block on backpressure.
    let writer = Arc::new(AofWriter::with_sink(sink.clone(), 1, AofSyncStrategy::Os).unwrap());

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let writer = Arc::clone(&writer);
            thread::spawn(move || {
                for i in 0..250 {
                    let key = format!("p{}", p);
                    let value = i.to_string();
                    writer.submit(0, command_line(["SET", key.as_str(), value.as_str()])).unwrap();
                }
            })
        })
        .collect();
    for handle in producers {
        handle.join().unwrap();
    }
    writer.shutdown().unwrap();

    let commands = read_commands(sink.data.lock().clone());
    assert_eq!(commands.len(), 1000);

    for p in 0..4 {
        let key = format!("p{}", p);
        let values: Vec<u32> = commands
            .iter()
            .filter(|c| c[1] == key.as_bytes())
            .map(|c| std::str::from_utf8(&c[2]).unwrap().parse().unwrap())
            .collect();
        assert_eq!(values, (0..250).collect::<Vec<_>>());
    }
}

#[test]
fn test_shutdown_drains_queue() {
    let (_temp, aof_path) = setup_temp_aof();

    let writer = AofWriter::open(&aof_path, 1024, AofSyncStrategy::Os).unwrap();
    for i in 0..500 {
        writer.submit(i % 3, cmd(&["SET", "k", &i.to_string()])).unwrap();
    }
    writer.shutdown().unwrap();

    assert_eq!(writer.stats().entries_written, 500);
    let data_entries = read_commands(fs::read(&aof_path).unwrap())
        .into_iter()
        .filter(|c| c[0] != "SELECT")
        .count();
    assert_eq!(data_entries, 500);
}

#[test]
fn test_submit_after_shutdown_fails() {
    let sink = MemorySink::default();
    let writer = AofWriter::with_sink(sink, 4, AofSyncStrategy::Os).unwrap();

    writer.shutdown().unwrap();
    // Second shutdown is a no-op
    writer.shutdown().unwrap();

    let result = writer.submit(0, cmd(&["SET", "a", "1"]));
    assert!(matches!(result, Err(KvError::AofClosed)));
}

#[test]
fn test_disabled_writer_accepts_and_discards() {
    let writer = AofWriter::disabled();

    assert!(!writer.is_enabled());
    writer.submit(5, cmd(&["SET", "a", "1"])).unwrap();
    writer.shutdown().unwrap();
    assert_eq!(writer.stats().entries_written, 0);
}

#[test]
fn test_open_appends_to_existing_file() {
    let (_temp, aof_path) = setup_temp_aof();

    let first = AofWriter::open(&aof_path, 4, AofSyncStrategy::EveryWrite).unwrap();
    first.submit(0, cmd(&["SET", "a", "1"])).unwrap();
    drop(first);

    let second = AofWriter::open(&aof_path, 4, AofSyncStrategy::EveryWrite).unwrap();
    second.submit(0, cmd(&["SET", "b", "2"])).unwrap();
    drop(second);

    let commands = read_commands(fs::read(&aof_path).unwrap());
    assert_eq!(commands, vec![cmd(&["SET", "a", "1"]), cmd(&["SET", "b", "2"])]);
}

// =============================================================================
// Failure Handling Tests
// =============================================================================

#[test]
fn test_failed_select_still_writes_entry() {
    let sink = MemorySink {
        reject_selects: true,
        ..MemorySink::default()
    };
    let writer = AofWriter::with_sink(sink.clone(), 4, AofSyncStrategy::Os).unwrap();

    writer.submit(2, cmd(&["SET", "a", "1"])).unwrap();
    writer.submit(2, cmd(&["SET", "b", "2"])).unwrap();
    writer.shutdown().unwrap();

    let commands = read_commands(sink.data.lock().clone());
    assert_eq!(commands, vec![cmd(&["SET", "a", "1"]), cmd(&["SET", "b", "2"])]);

    // Namespace never advanced, so the select was retried for the second entry
    let stats = writer.stats();
    assert_eq!(stats.entries_written, 2);
    assert_eq!(stats.selects_written, 0);
    assert_eq!(stats.write_failures, 2);
}

#[test]
fn test_open_fails_for_missing_directory() {
    let (_temp, aof_path) = setup_temp_aof();
    let bad_path = aof_path.join("nested").join("x.aof");

    let result = AofWriter::open(&bad_path, 4, AofSyncStrategy::Os);
    assert!(matches!(result, Err(KvError::Io(_))));
}

#[test]
fn test_zero_queue_size_rejected() {
    let result = AofWriter::with_sink(MemorySink::default(), 0, AofSyncStrategy::Os);
    assert!(matches!(result, Err(KvError::Config(_))));
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_sync_every_write() {
    let sink = MemorySink::default();
    let writer = AofWriter::with_sink(sink.clone(), 8, AofSyncStrategy::EveryWrite).unwrap();

    for i in 0..3 {
        writer.submit(0, cmd(&["SET", "k", &i.to_string()])).unwrap();
    }
    writer.shutdown().unwrap();

    // One per entry plus the final sync on shutdown
    assert_eq!(*sink.syncs.lock(), 4);
}

#[test]
fn test_sync_every_n_entries() {
    let sink = MemorySink::default();
    let writer = AofWriter::with_sink(
        sink.clone(),
        8,
        AofSyncStrategy::EveryNEntries { count: 5 },
    )
    .unwrap();

    for i in 0..12 {
        writer.submit(0, cmd(&["SET", "k", &i.to_string()])).unwrap();
    }
    writer.shutdown().unwrap();

    // After entries 5 and 10, then the final sync
    assert_eq!(*sink.syncs.lock(), 3);
}

#[test]
fn test_sync_os_only_on_shutdown() {
    let sink = MemorySink::default();
    let writer = AofWriter::with_sink(sink.clone(), 8, AofSyncStrategy::Os).unwrap();

    writer.submit(0, cmd(&["SET", "k", "v"])).unwrap();
    writer.shutdown().unwrap();

    assert_eq!(*sink.syncs.lock(), 1);
    assert_eq!(read_commands(sink.data.lock().clone()).len(), 1);
}
