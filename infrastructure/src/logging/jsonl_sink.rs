//! JSONL file writer for observability events.
//!
//! [`JsonlEventSink::emit`] never blocks: events go through a bounded
//! channel to a background task that owns the file. When the channel is
//! full the event is dropped and counted.

use alchemy_application::{ObservabilityEvent, ObservabilitySink};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default number of events buffered before new ones are dropped
pub const DEFAULT_CAPACITY: usize = 1024;

pub struct JsonlEventSink {
    tx: mpsc::Sender<ObservabilityEvent>,
    dropped: AtomicU64,
    path: PathBuf,
}

impl JsonlEventSink {
    /// Open `path` for appending and start the writer task.
    ///
    /// Creates parent directories if needed. Returns `None` if the file
    /// cannot be opened. The writer finishes once every sink handle is
    /// dropped; await the returned handle to make sure all lines hit disk.
    /// Must be called inside a tokio runtime.
    pub fn spawn(path: impl AsRef<Path>, capacity: usize) -> Option<(Self, JoinHandle<()>)> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create event log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open event log file {}: {}", path.display(), e);
                return None;
            }
        };

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let writer = BufWriter::new(File::from_std(file));
        let handle = tokio::spawn(write_events(rx, writer));

        Some((
            Self {
                tx,
                dropped: AtomicU64::new(0),
                path: path.to_path_buf(),
            },
            handle,
        ))
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Events discarded because the writer could not keep up
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ObservabilitySink for JsonlEventSink {
    fn emit(&self, event: ObservabilityEvent) {
        if self.tx.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Drop for JsonlEventSink {
    fn drop(&mut self) {
        let dropped = self.dropped();
        if dropped > 0 {
            warn!("{} observability event(s) were dropped", dropped);
        }
    }
}

async fn write_events(mut rx: mpsc::Receiver<ObservabilityEvent>, mut writer: BufWriter<File>) {
    while let Some(event) = rx.recv().await {
        let Some(mut line) = to_line(&event) else {
            continue;
        };
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("Failed to write observability event: {}", e);
        }
        // Flush whenever the queue drains
        if rx.is_empty() {
            flush(&mut writer).await;
        }
    }
    flush(&mut writer).await;
    debug!("Observability writer finished");
}

async fn flush(writer: &mut BufWriter<File>) {
    if let Err(e) = writer.flush().await {
        warn!("Failed to flush observability events: {}", e);
    }
}

/// The event's fields plus a UTC `timestamp`
fn to_line(event: &ObservabilityEvent) -> Option<String> {
    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    let mut record = serde_json::to_value(event).ok()?;
    if let serde_json::Value::Object(map) = &mut record {
        map.insert(
            "timestamp".to_string(),
            serde_json::Value::String(timestamp),
        );
    }
    serde_json::to_string(&record).ok()
}

/// Sink that forwards events to `tracing` at debug level.
pub struct TracingEventSink;

impl ObservabilitySink for TracingEventSink {
    fn emit(&self, event: ObservabilityEvent) {
        debug!(
            target: "alchemy::events",
            event = event.event_type.as_str(),
            phase = event.phase.map(|p| p.as_str()),
            provider = event.provider.as_ref().map(|p| p.as_str()),
            duration_ms = event.duration_ms,
            tokens = event.tokens,
            outcome = %event.outcome,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alchemy_application::EventType;
    use alchemy_domain::{PhaseId, ProviderId};
    use std::time::Duration;

    #[tokio::test]
    async fn test_sink_writes_valid_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events").join("events.jsonl");
        let (sink, handle) = JsonlEventSink::spawn(&path, DEFAULT_CAPACITY).unwrap();

        sink.emit(
            ObservabilityEvent::provider_request(
                PhaseId::PrimaMateria,
                ProviderId::new("ollama"),
                "success",
            )
            .with_duration(Duration::from_millis(250))
            .with_tokens(99),
        );
        sink.emit(ObservabilityEvent::new(EventType::RankingPass, "3 of 5 selected"));

        drop(sink);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event_type"], "provider_request");
        assert_eq!(first["phase"], "prima-materia");
        assert_eq!(first["provider"], "ollama");
        assert_eq!(first["duration_ms"], 250);
        assert_eq!(first["tokens"], 99);
        assert!(first.get("timestamp").is_some());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event_type"], "ranking_pass");
        assert!(second.get("phase").is_none());
    }

    #[tokio::test]
    async fn test_sink_appends_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        for _ in 0..2 {
            let (sink, handle) = JsonlEventSink::spawn(&path, 8).unwrap();
            sink.emit(ObservabilityEvent::new(EventType::Retrain, "v1"));
            drop(sink);
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim().lines().count(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_channel_drops_instead_of_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let (sink, handle) = JsonlEventSink::spawn(&path, 2).unwrap();

        // The writer task cannot run until this test yields, so the
        // channel fills after two events.
        for _ in 0..5 {
            sink.emit(ObservabilityEvent::new(EventType::PhaseOutcome, "completed"));
        }
        assert_eq!(sink.dropped(), 3);

        drop(sink);
        handle.await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim().lines().count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_path_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // a regular file cannot act as a parent directory
        assert!(JsonlEventSink::spawn(blocker.join("events.jsonl"), 8).is_none());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_writer_survives_failed_flush() {
        // writes to /dev/full fail with ENOSPC once the buffer is flushed
        let (sink, handle) = JsonlEventSink::spawn("/dev/full", 8).unwrap();
        sink.emit(ObservabilityEvent::new(EventType::Retrain, "v1"));
        sink.emit(ObservabilityEvent::new(EventType::Retrain, "v2"));
        drop(sink);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
