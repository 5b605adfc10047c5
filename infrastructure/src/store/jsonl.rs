//! Append-only JSONL durable store
//!
//! Each record is serialized as a single JSON line with a `logged_at`
//! timestamp, appended via a buffered writer. Thread-safe via
//! `Mutex<BufWriter<File>>`; every line is flushed so queries (which
//! re-read the file) always see completed writes.

use agora_application::ports::durable_store::{DurableStore, StoreError, StoreFilter, StoreRecord};
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable store backed by an append-only JSONL file
pub struct JsonlStore {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlStore {
    /// Open (or create) the store file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DurableStore for JsonlStore {
    async fn persist(&self, record: StoreRecord) -> Result<(), StoreError> {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        let mut value = serde_json::to_value(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let serde_json::Value::Object(map) = &mut value {
            map.insert("logged_at".into(), serde_json::Value::String(timestamp));
        }
        let line = serde_json::to_string(&value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{}", line).map_err(|e| StoreError::Unreachable(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| StoreError::Unreachable(e.to_string()))
    }

    async fn query(&self, filter: StoreFilter) -> Result<Vec<StoreRecord>, StoreError> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        let mut found = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let record: StoreRecord = serde_json::from_str(line)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            if filter.matches(&record) {
                found.push(record);
            }
        }
        Ok(found)
    }
}
