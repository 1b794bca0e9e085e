//! Persistence seam for the suppression store

use std::path::PathBuf;

use async_trait::async_trait;

/// Where the suppression document lives between runs
#[async_trait]
pub trait StateBackend: Send + Sync + std::fmt::Debug {
    /// Read the stored document; `None` when nothing has been stored yet
    async fn read(&self) -> crate::Result<Option<String>>;

    /// Replace the stored document
    async fn write(&self, contents: &str) -> crate::Result<()>;
}

/// Keeps the suppression document in a local file
#[derive(Debug, Clone)]
pub struct FileStateBackend {
    path: PathBuf,
}

impl FileStateBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateBackend for FileStateBackend {
    async fn read(&self) -> crate::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(crate::WatchpostError::State(format!(
                "Failed to read {:?}: {}",
                self.path, e
            ))),
        }
    }

    async fn write(&self, contents: &str) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, contents).await.map_err(|e| {
            crate::WatchpostError::State(format!("Failed to write {:?}: {}", self.path, e))
        })
    }
}
