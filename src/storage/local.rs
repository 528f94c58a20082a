//! Local filesystem document store.
//!
//! Each collection is an append-only JSON-lines file. Suitable for
//! development and single-host deployments.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── raw_locations.jsonl   # one location snapshot per line
//! └── raw_stations.jsonl    # one station snapshot per line
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::BulkWriter;

const EXTENSION: &str = "jsonl";

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    /// Serializes appends so concurrent batches never interleave lines.
    write_lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// File backing a collection.
    fn path(&self, collection: &str) -> PathBuf {
        self.root_dir.join(format!("{collection}.{EXTENSION}"))
    }

    /// Encode documents as newline-terminated JSON lines.
    fn encode(documents: &[Value]) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        for document in documents {
            serde_json::to_writer(&mut buffer, document)?;
            buffer.push(b'\n');
        }
        Ok(buffer)
    }

    /// Append raw bytes to a collection file, creating it if needed.
    async fn append(&self, collection: &str, bytes: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.root_dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(collection))
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read every document of a collection. Missing collections are empty.
    pub async fn load_collection(&self, collection: &str) -> Result<Vec<Value>> {
        let bytes = match tokio::fs::read(self.path(collection)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        bytes
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).map_err(AppError::from))
            .collect()
    }

    /// Names of all collections present on disk, sorted.
    pub async fn collections(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl BulkWriter for LocalStorage {
    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let bytes = Self::encode(&documents)?;
        self.append(collection, &bytes)
            .await
            .map_err(|e| AppError::store(collection, e))?;

        log::debug!("Appended {} documents to {}", documents.len(), collection);
        Ok(documents.len())
    }

    async fn close(&self) -> Result<()> {
        // Wait for any in-flight append before reporting closed.
        let _guard = self.write_lock.lock().await;
        log::info!("Local store at {} closed", self.root_dir.display());
        Ok(())
    }
}
