//! AOF Loader
//!
//! Replays the log at startup, before the writer takes over the file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use crate::engine::{ExecContext, Executor};
use crate::error::{DecodeError, KvError, Result};
use crate::protocol::{encode_frame, select_command, Frame, FrameDecoder};

/// Execution context used while replaying
///
/// Only tracks the selected namespace; there is no client behind it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayContext {
    namespace: usize,
}

impl ExecContext for ReplayContext {
    fn namespace(&self) -> usize {
        self.namespace
    }

    fn set_namespace(&mut self, index: usize) {
        self.namespace = index;
    }
}

/// Result of a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Commands executed without an error reply
    pub entries_replayed: u64,

    /// Commands whose execution returned an error reply
    pub entries_failed: u64,

    /// Malformed frames skipped
    pub protocol_errors: u64,

    /// Well-formed frames that were not command arrays
    pub entries_skipped: u64,

    /// Whether the log ended inside a frame
    pub truncated: bool,

    /// Byte offset just past the last frame boundary reached
    pub valid_len: u64,

    /// Namespace selected when replay finished
    pub final_namespace: usize,
}

/// Replays append-only logs
pub struct AofLoader;

impl AofLoader {
    /// Replay the log at `path` into `executor`
    ///
    /// A missing file is an empty history. A log whose last frame was cut
    /// short is truncated back to the last complete frame when
    /// `allow_truncated` is set, and rejected otherwise. If replay ends in a
    /// namespace other than 0, a `SELECT 0` frame is appended so a writer
    /// starting from namespace 0 continues a consistent log.
    pub fn load<E: Executor + ?Sized>(
        path: &Path,
        executor: &E,
        allow_truncated: bool,
    ) -> Result<ReplayReport> {
        if !path.exists() {
            tracing::info!("No AOF at {}, starting empty", path.display());
            return Ok(ReplayReport::default());
        }

        let file = File::open(path)?;
        let report = Self::replay(file, executor);

        if report.truncated {
            if !allow_truncated {
                return Err(KvError::AofCorruption(format!(
                    "{} ends inside a frame after byte {}",
                    path.display(),
                    report.valid_len
                )));
            }
            tracing::warn!(
                "AOF {} ends inside a frame, truncating to {} bytes",
                path.display(),
                report.valid_len
            );
            OpenOptions::new()
                .write(true)
                .open(path)?
                .set_len(report.valid_len)?;
        }

        if report.final_namespace != 0 {
            let mut file = OpenOptions::new().append(true).open(path)?;
            file.write_all(&encode_frame(&Frame::from(select_command(0))))?;
            file.sync_data()?;
        }

        tracing::info!(
            "AOF replay: {} replayed, {} failed, {} protocol errors, {} skipped",
            report.entries_replayed,
            report.entries_failed,
            report.protocol_errors,
            report.entries_skipped
        );

        Ok(report)
    }

    /// Replay every frame of `reader` into `executor`, in order
    pub fn replay<R: Read, E: Executor + ?Sized>(reader: R, executor: &E) -> ReplayReport {
        let mut decoder = FrameDecoder::new(reader);
        let mut context = ReplayContext::default();
        let mut report = ReplayReport::default();

        while let Some(result) = decoder.next() {
            match result {
                Ok(frame) => {
                    let kind = frame.kind();
                    match frame.into_command_line() {
                        Some(argv) => {
                            let reply = executor.execute(&mut context, &argv);
                            if let Frame::Error(message) = reply {
                                report.entries_failed += 1;
                                tracing::error!(
                                    "AOF replay of {:?} failed: {}",
                                    String::from_utf8_lossy(&argv[0]),
                                    message
                                );
                            } else {
                                report.entries_replayed += 1;
                            }
                        }
                        None => {
                            report.entries_skipped += 1;
                            tracing::warn!("AOF replay skipped a {} frame, expected a command", kind);
                        }
                    }
                }
                Err(DecodeError::Protocol(message)) => {
                    report.protocol_errors += 1;
                    tracing::warn!("AOF replay skipped a malformed frame: {}", message);
                }
                Err(DecodeError::Closed) => break,
                Err(e) if e.is_truncated() => {
                    report.truncated = true;
                    break;
                }
                Err(e) => {
                    tracing::error!("AOF replay stopped early: {}", e);
                    break;
                }
            }
            report.valid_len = decoder.position();
        }

        report.final_namespace = context.namespace();
        report
    }
}
