use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::GraphResult;

/// Where snapshot bytes live between process runs
///
/// The engine only produces and consumes bytes; implementations decide
/// whether they land in a file, an object store or a blob column.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns the most recent snapshot, if one was ever stored
    async fn fetch_latest(&self) -> GraphResult<Option<Vec<u8>>>;

    /// Persists a snapshot, replacing the previous one
    async fn store(&self, bytes: Vec<u8>) -> GraphResult<()>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

/// Snapshot kept in a single local file
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait::async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn fetch_latest(&self) -> GraphResult<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a sibling temp file, then renames over the target, so a
    /// crash mid-write never leaves a truncated snapshot behind.
    async fn store(&self, bytes: Vec<u8>) -> GraphResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::info!(
            path = %self.path.display(),
            bytes = bytes.len(),
            "Snapshot written"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
