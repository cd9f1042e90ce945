//! Buffered application log.
//!
//! Entries are kept in memory and appended to `{kind}-{date}.log` files in
//! batches. A batch is written when the buffer reaches its capacity or as soon
//! as an error entry is recorded. Every entry is also echoed through `tracing`.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

/// Entries retained while writes keep failing, as a multiple of the capacity.
const RETAIN_FACTOR: usize = 10;

/// Severity of a log entry. Also selects the file it is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Debug => "debug",
            LogKind::Info => "info",
            LogKind::Warn => "warn",
            LogKind::Error => "error",
        }
    }
}

/// A single structured entry, serialized as one JSON line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub kind: LogKind,
    pub message: String,
    pub data: Value,
}

/// In-memory log buffer with file-backed flushing.
pub struct LogSink {
    dir: PathBuf,
    capacity: usize,
    buffer: Mutex<Vec<LogEntry>>,
}

impl LogSink {
    /// Create a sink writing into `dir`. The directory is created on first flush.
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity: capacity.max(1),
            buffer: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// Number of entries waiting to be written.
    pub fn pending(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Record an entry. Error entries are written out immediately; other
    /// kinds are written once the buffer is full.
    ///
    /// A failed write is returned to the caller. The entries that could not
    /// be written stay buffered and are retried on the next flush, up to
    /// `capacity * RETAIN_FACTOR` entries; beyond that the oldest are dropped.
    ///
    /// Writes are synchronous appends under the buffer lock. A batch is at
    /// most the retention bound, and holding the lock keeps file order equal
    /// to record order.
    pub fn record(&self, kind: LogKind, message: impl Into<String>, data: Value) -> io::Result<()> {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            kind,
            message: message.into(),
            data,
        };
        echo(&entry);

        let mut buffer = self.buffer.lock();
        buffer.push(entry);

        if kind == LogKind::Error || buffer.len() >= self.capacity {
            if let Err(e) = self.write_out(&mut buffer) {
                self.shed(&mut buffer);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn info(&self, message: impl Into<String>, data: Value) -> io::Result<()> {
        self.record(LogKind::Info, message, data)
    }

    /// Record an error entry carrying the error's message.
    pub fn error(&self, message: impl Into<String>, err: &dyn std::error::Error) -> io::Result<()> {
        self.record(
            LogKind::Error,
            message,
            serde_json::json!({ "error": err.to_string() }),
        )
    }

    /// Write every buffered entry out. Returns how many entries were written.
    pub fn flush(&self) -> io::Result<usize> {
        let mut buffer = self.buffer.lock();
        self.write_out(&mut buffer)
    }

    /// Drop the oldest entries past the retention bound.
    fn shed(&self, buffer: &mut Vec<LogEntry>) {
        let limit = self.capacity.saturating_mul(RETAIN_FACTOR);
        if buffer.len() > limit {
            let dropped = buffer.len() - limit;
            buffer.drain(..dropped);
            tracing::warn!(dropped, "Log buffer full while writes fail, dropped oldest entries");
        }
    }

    fn write_out(&self, buffer: &mut Vec<LogEntry>) -> io::Result<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }

        fs::create_dir_all(&self.dir)?;
        let date = Utc::now().format("%Y-%m-%d").to_string();

        let mut batches: BTreeMap<LogKind, String> = BTreeMap::new();
        for entry in buffer.iter() {
            let line = serde_json::to_string(entry).map_err(io::Error::other)?;
            let batch = batches.entry(entry.kind).or_default();
            batch.push_str(&line);
            batch.push('\n');
        }

        let mut written = 0;
        for (kind, lines) in batches {
            let path = self.dir.join(format!("{}-{}.log", kind.as_str(), date));
            let result = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .and_then(|mut file| file.write_all(lines.as_bytes()));

            if let Err(e) = result {
                tracing::error!("Failed to flush log buffer to {:?}: {}", path, e);
                return Err(e);
            }

            let before = buffer.len();
            buffer.retain(|entry| entry.kind != kind);
            written += before - buffer.len();
        }

        Ok(written)
    }
}

fn echo(entry: &LogEntry) {
    match entry.kind {
        LogKind::Debug => tracing::debug!(data = %entry.data, "{}", entry.message),
        LogKind::Info => tracing::info!(data = %entry.data, "{}", entry.message),
        LogKind::Warn => tracing::warn!(data = %entry.data, "{}", entry.message),
        LogKind::Error => tracing::error!(data = %entry.data, "{}", entry.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn log_file(dir: &Path, kind: LogKind) -> PathBuf {
        dir.join(format!(
            "{}-{}.log",
            kind.as_str(),
            Utc::now().format("%Y-%m-%d")
        ))
    }

    fn read_lines(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_buffers_until_capacity() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::new(temp_dir.path().join("logs"), 10);

        for i in 0..9 {
            sink.info("entry", json!({ "n": i })).unwrap();
        }
        assert_eq!(sink.pending(), 9);
        assert!(!temp_dir.path().join("logs").exists());

        sink.info("entry", json!({ "n": 9 })).unwrap();
        assert_eq!(sink.pending(), 0);

        let lines = read_lines(&log_file(&temp_dir.path().join("logs"), LogKind::Info));
        assert_eq!(lines.len(), 10);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(line["kind"], "info");
            assert_eq!(line["message"], "entry");
            assert_eq!(line["data"]["n"], i);
            assert!(line["timestamp"].is_string());
        }
    }

    #[test]
    fn test_error_forces_flush() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::new(temp_dir.path(), 10);

        sink.record(LogKind::Debug, "warming up", json!({})).unwrap();
        let err = io::Error::new(io::ErrorKind::Other, "disk on fire");
        sink.error("Route error", &err).unwrap();

        assert_eq!(sink.pending(), 0);

        let errors = read_lines(&log_file(temp_dir.path(), LogKind::Error));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["message"], "Route error");
        assert_eq!(errors[0]["data"]["error"], "disk on fire");

        let debug = read_lines(&log_file(temp_dir.path(), LogKind::Debug));
        assert_eq!(debug.len(), 1);
        assert_eq!(debug[0]["message"], "warming up");
    }

    #[test]
    fn test_flush_appends_across_batches() {
        let temp_dir = TempDir::new().unwrap();
        let sink = LogSink::new(temp_dir.path(), 2);

        for _ in 0..4 {
            sink.info("tick", Value::Null).unwrap();
        }
        sink.info("tail", Value::Null).unwrap();
        assert_eq!(sink.pending(), 1);
        assert_eq!(sink.flush().unwrap(), 1);
        assert_eq!(sink.flush().unwrap(), 0);

        let lines = read_lines(&log_file(temp_dir.path(), LogKind::Info));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4]["message"], "tail");
    }

    #[test]
    fn test_failed_flush_keeps_entries() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the log directory should be
        let blocked = temp_dir.path().join("not-a-dir");
        fs::write(&blocked, b"").unwrap();

        let sink = LogSink::new(&blocked, 10);
        sink.info("kept", Value::Null).unwrap();
        assert!(sink.record(LogKind::Warn, "also kept", Value::Null).is_ok());
        assert!(sink.flush().is_err());
        assert_eq!(sink.pending(), 2);
    }

    #[test]
    fn test_failing_writes_bound_the_buffer() {
        let temp_dir = TempDir::new().unwrap();
        let blocked = temp_dir.path().join("not-a-dir");
        fs::write(&blocked, b"").unwrap();

        let sink = LogSink::new(&blocked, 2);
        let limit = 2 * RETAIN_FACTOR;

        for i in 0..100 {
            let result = sink.info("stuck", json!({ "n": i }));
            assert_eq!(result.is_err(), i >= 1);
            assert!(sink.pending() <= limit);
        }
        assert_eq!(sink.pending(), limit);

        // The newest entries are the ones kept
        let buffer = sink.buffer.lock();
        assert_eq!(buffer[0].data["n"], 100 - limit);
        assert_eq!(buffer[limit - 1].data["n"], 99);
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let sink = Arc::new(LogSink::new(temp_dir.path(), 7));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        sink.info("parallel", json!({ "t": t, "i": i })).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        sink.flush().unwrap();

        let lines = read_lines(&log_file(temp_dir.path(), LogKind::Info));
        assert_eq!(lines.len(), 200);
    }
}
