//! FileBackend - spools messages to disk as JSON lines

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use contracts::{BackendError, DeliveryBackend, DeliveryReceipt, Message};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Configuration for FileBackend
#[derive(Debug, Clone)]
pub struct FileBackendConfig {
    /// Spool directory
    pub dir: PathBuf,
}

impl FileBackendConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let dir = params
            .get("dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./outbox"));

        Self { dir }
    }
}

/// One spooled line
#[derive(Debug, Serialize)]
struct SpoolRecord<'a> {
    id: Option<&'a str>,
    from: Option<&'a str>,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
    payload_len: usize,
    spooled_at: DateTime<Utc>,
}

impl<'a> From<&'a Message> for SpoolRecord<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            id: message.id().map(|id| id.as_str()),
            from: message.sender(),
            to: message.to(),
            subject: message.subject(),
            body: message.body(),
            payload_len: message.payload().len(),
            spooled_at: Utc::now(),
        }
    }
}

/// Backend that appends each message to `<dir>/<name>.jsonl`
pub struct FileBackend {
    name: String,
    path: PathBuf,
    /// Serializes appends so lines never interleave
    write_lock: Mutex<()>,
    lines: AtomicU64,
}

impl FileBackend {
    /// Create a new FileBackend, creating the spool directory if needed
    pub fn new(name: impl Into<String>, config: FileBackendConfig) -> std::io::Result<Self> {
        let name = name.into();
        fs::create_dir_all(&config.dir)?;
        let path = config.dir.join(format!("{name}.jsonl"));

        Ok(Self {
            name,
            path,
            write_lock: Mutex::new(()),
            lines: AtomicU64::new(0),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileBackendConfig::from_params(params))
    }

    /// Spool file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn append(&self, line: &[u8]) -> std::io::Result<u64> {
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line).await?;
        file.flush().await?;
        Ok(self.lines.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl DeliveryBackend for FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "file_backend_attempt", skip(self, message), fields(backend = %self.name))]
    async fn attempt(&self, message: &Message) -> Result<DeliveryReceipt, BackendError> {
        let mut line = serde_json::to_vec(&SpoolRecord::from(message))
            .map_err(|e| BackendError::permanent(&self.name, e.to_string()))?;
        line.push(b'\n');

        // IO errors may clear up (disk full, locked file): retry them
        let line_no = self
            .append(&line)
            .await
            .map_err(|e| BackendError::transient(&self.name, e.to_string()))?;

        debug!(path = %self.path.display(), line = line_no, "Message spooled");
        Ok(DeliveryReceipt::new(&self.name)
            .with_reference(format!("{}:{}", self.path.display(), line_no)))
    }
}
