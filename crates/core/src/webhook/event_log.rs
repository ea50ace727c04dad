//! Append-only webhook event log.
//!
//! Events are written as pretty-printed JSON records separated by a blank
//! line. The file is read back most-recent-first for fallback resolution.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::WebhookEvent;

/// Record separator between serialized events.
const RECORD_SEPARATOR: &str = "\n\n";

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("Event log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Size-bounded, append-only log of raw webhook events.
pub struct EventLog {
    path: PathBuf,
    max_bytes: u64,
    write_lock: Mutex<()>,
}

impl EventLog {
    /// Create a log at `path`. When the file grows past `max_bytes` it is
    /// moved to `<path>.1` (replacing any previous rotation) before the next
    /// append.
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            path: path.into(),
            max_bytes,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotated_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".1");
        PathBuf::from(name)
    }

    /// Append one event.
    pub async fn append(&self, event: &WebhookEvent) -> Result<(), EventLogError> {
        let mut record = serde_json::to_string_pretty(event)?;
        record.push_str(RECORD_SEPARATOR);

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        self.rotate_if_full().await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    async fn rotate_if_full(&self) -> Result<(), EventLogError> {
        let len = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if len >= self.max_bytes {
            let rotated = self.rotated_path();
            fs::rename(&self.path, &rotated).await?;
            info!(path = %rotated.display(), bytes = len, "Rotated webhook event log");
        }
        Ok(())
    }

    /// Raw records of the current log file, most recent first, at most `limit`.
    ///
    /// A missing file reads as empty. Records are not parsed here.
    pub async fn recent_records(&self, limit: usize) -> Result<Vec<String>, EventLogError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(contents
            .rsplit(RECORD_SEPARATOR)
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .take(limit)
            .map(str::to_string)
            .collect())
    }
}
