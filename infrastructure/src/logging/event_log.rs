//! JSONL event log
//!
//! Subscribes to the event bus and appends every event as a single JSON
//! line with an ISO-8601 `logged_at` timestamp. Thread-safe via
//! `Mutex<BufWriter<File>>`; each line is flushed so the log survives a
//! crash. Flushes again on `Drop`.

use agora_application::bus::{EventBus, TypePattern};
use agora_domain::Event;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// JSONL writer for bus events
pub struct JsonlEventLog {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlEventLog {
    /// Open (or create) the log file, creating parent directories.
    /// Returns `None` if the file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && let Err(error) = std::fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), %error, "Could not create event log directory");
            return None;
        }
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => file,
            Err(error) => {
                warn!(path = %path.display(), %error, "Could not create event log file");
                return None;
            }
        };
        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a JSON line.
    pub fn log(&self, event: &Event) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let Ok(mut value) = serde_json::to_value(event) else {
            return;
        };
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("logged_at".into(), serde_json::Value::String(timestamp));
        }
        let Ok(line) = serde_json::to_string(&value) else {
            return;
        };

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(writer, "{}", line);
        let _ = writer.flush();
    }

    /// Subscribe to the bus and stream every event into this log until the
    /// returned handle is stopped.
    pub fn attach(self: Arc<Self>, bus: &EventBus) -> EventLogHandle {
        let subscription = bus.subscribe("event-log", TypePattern::all());
        let token = CancellationToken::new();
        let task_token = token.clone();
        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    event = subscription.recv() => match event {
                        Some(event) => self.log(&event),
                        None => break,
                    },
                }
            }
        });
        EventLogHandle { token, join }
    }
}

impl Drop for JsonlEventLog {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

/// Running event-log subscription; stop it to detach from the bus
pub struct EventLogHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl EventLogHandle {
    /// Stop streaming and wait for the writer task to finish.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_domain::{EventKind, EventPriority};
    use serde_json::json;

    #[test]
    fn test_log_writes_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlEventLog::open(dir.path().join("events.jsonl")).unwrap();

        log.log(
            &Event::new(EventKind::WorkflowStatus, "orchestrator", json!({"status": "initiated"}))
                .with_priority(EventPriority::High),
        );

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(value["kind"], "workflow_status");
        assert!(value.get("logged_at").is_some());
    }

    #[tokio::test]
    async fn test_attach_streams_bus_events() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(JsonlEventLog::open(dir.path().join("events.jsonl")).unwrap());
        let bus = EventBus::default();
        let handle = Arc::clone(&log).attach(&bus);

        bus.publish(Event::new(EventKind::AgentHealth, "registry", json!({"agent_id": "a"})));
        bus.publish(Event::new(EventKind::AgentHealth, "registry", json!({"agent_id": "b"})));
        // Let the writer task drain the queue
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.stop().await;

        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
