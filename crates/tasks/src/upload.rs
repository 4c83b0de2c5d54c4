//! Durable artifact sinks. Uploads begin transmitting before the full row
//! set is known; the artifact URL becomes available only after `finish`
//! is acknowledged.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::info;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to open upload for '{key}': {source}")]
    Open {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to upload '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to finalize upload '{key}': {source}")]
    Finish {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// One in-flight artifact upload.
#[async_trait]
pub trait UploadStream: Send {
    async fn write(&mut self, chunk: Bytes) -> Result<(), UploadError>;

    /// Flush buffered output and wait for the sink's acknowledgment.
    /// Returns the fetchable artifact URL.
    async fn finish(self: Box<Self>) -> Result<String, UploadError>;
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn begin(&self, key: &str) -> Result<Box<dyn UploadStream>, UploadError>;
}

/// Filesystem-backed upload store. Artifacts land under `root`; links are
/// `base_url`-prefixed when configured, plain `file://` paths otherwise.
pub struct FsUploadStore {
    root: PathBuf,
    base_url: Option<String>,
}

impl FsUploadStore {
    pub fn new(root: impl Into<PathBuf>, base_url: Option<String>) -> Self {
        FsUploadStore {
            root: root.into(),
            base_url,
        }
    }
}

#[async_trait]
impl UploadStore for FsUploadStore {
    async fn begin(&self, key: &str) -> Result<Box<dyn UploadStream>, UploadError> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| UploadError::Open {
                key: key.to_string(),
                source,
            })?;
        }
        let file = fs::File::create(&path).await.map_err(|source| UploadError::Open {
            key: key.to_string(),
            source,
        })?;
        let url = match &self.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("file://{}", path.display()),
        };
        Ok(Box::new(FsUploadStream {
            key: key.to_string(),
            file,
            url,
        }))
    }
}

struct FsUploadStream {
    key: String,
    file: fs::File,
    url: String,
}

#[async_trait]
impl UploadStream for FsUploadStream {
    async fn write(&mut self, chunk: Bytes) -> Result<(), UploadError> {
        self.file
            .write_all(&chunk)
            .await
            .map_err(|source| UploadError::Write {
                key: self.key.clone(),
                source,
            })
    }

    async fn finish(mut self: Box<Self>) -> Result<String, UploadError> {
        self.file
            .flush()
            .await
            .map_err(|source| UploadError::Finish {
                key: self.key.clone(),
                source,
            })?;
        self.file
            .sync_all()
            .await
            .map_err(|source| UploadError::Finish {
                key: self.key.clone(),
                source,
            })?;
        info!(key = %self.key, url = %self.url, "Upload finished");
        Ok(self.url)
    }
}

/// In-memory upload store for tests: captures artifact bytes by key.
#[derive(Default, Clone)]
pub struct MemoryUploadStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryUploadStore {
    pub fn new() -> Self {
        MemoryUploadStore::default()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl UploadStore for MemoryUploadStore {
    async fn begin(&self, key: &str) -> Result<Box<dyn UploadStream>, UploadError> {
        Ok(Box::new(MemoryUploadStream {
            key: key.to_string(),
            buffer: Vec::new(),
            objects: self.objects.clone(),
        }))
    }
}

struct MemoryUploadStream {
    key: String,
    buffer: Vec<u8>,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

#[async_trait]
impl UploadStream for MemoryUploadStream {
    async fn write(&mut self, chunk: Bytes) -> Result<(), UploadError> {
        self.buffer.extend_from_slice(&chunk);
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<String, UploadError> {
        let url = format!("memory://{}", self.key);
        self.objects.lock().unwrap().insert(self.key, self.buffer);
        Ok(url)
    }
}
