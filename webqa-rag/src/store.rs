//! Single-slot persistence for the vector index.
//!
//! There is at most one index at a time. An [`IndexStore`] exposes it through
//! `get`/`put`/`delete` on one fixed key, so callers never deal with paths.
//!
//! - [`FileIndexStore`]: a versioned JSON document in a fixed directory,
//!   replaced atomically with write-to-temp-then-rename
//! - [`InMemoryIndexStore`]: a process-local slot for tests and ephemeral use

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RagError, Result};
use crate::index::{INDEX_FORMAT_VERSION, VectorIndex};

/// File name of the persisted index inside the store directory.
pub const INDEX_FILE_NAME: &str = "index.json";

const FILE_BACKEND: &str = "File";

/// Identifies one stored version of the index.
///
/// Two revisions compare equal only if nothing replaced or deleted the index
/// in between, so a cached index can be revalidated without reloading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRevision {
    generation: u64,
    len: u64,
    modified: Option<SystemTime>,
}

impl IndexRevision {
    /// Build a revision from a store-specific generation number, the stored
    /// size and the last modification time, where available.
    pub fn new(generation: u64, len: u64, modified: Option<SystemTime>) -> Self {
        Self { generation, len, modified }
    }
}

/// A storage slot holding at most one [`VectorIndex`].
///
/// Writes replace the previous index as a whole; readers see either the old
/// or the new index, never a mix.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Load the stored index, or `None` if nothing has been indexed yet.
    async fn get(&self) -> Result<Option<VectorIndex>>;

    /// Replace the stored index.
    async fn put(&self, index: &VectorIndex) -> Result<()>;

    /// Delete the stored index. Deleting an absent index is a no-op.
    async fn delete(&self) -> Result<()>;

    /// Current revision of the stored index, or `None` if nothing is stored.
    ///
    /// Must be much cheaper than [`get`](IndexStore::get); it is checked on
    /// every query.
    async fn revision(&self) -> Result<Option<IndexRevision>>;
}

/// An [`IndexStore`] backed by a JSON file in a fixed directory.
///
/// # Example
///
/// ```rust,ignore
/// use webqa_rag::{FileIndexStore, IndexStore};
///
/// let store = FileIndexStore::new("vectorstore");
/// if store.get().await?.is_none() {
///     println!("nothing indexed yet");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileIndexStore {
    dir: PathBuf,
}

impl FileIndexStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the index file.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the index file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    async fn write_temp(&self, tmp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(tmp_path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await
    }
}

/// Just enough of the document to check its version before a full parse.
#[derive(Deserialize)]
struct VersionHeader {
    format_version: u32,
}

#[async_trait]
impl IndexStore for FileIndexStore {
    async fn get(&self) -> Result<Option<VectorIndex>> {
        let path = self.path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no persisted index");
                return Ok(None);
            }
            Err(e) => {
                return Err(RagError::storage(
                    FILE_BACKEND,
                    format!("failed to read '{}': {e}", path.display()),
                ));
            }
        };

        let header: VersionHeader = serde_json::from_slice(&bytes).map_err(|e| {
            RagError::storage(FILE_BACKEND, format!("unreadable index '{}': {e}", path.display()))
        })?;
        if header.format_version != INDEX_FORMAT_VERSION {
            return Err(RagError::IncompatibleIndex {
                found: header.format_version,
                expected: INDEX_FORMAT_VERSION,
            });
        }

        let index: VectorIndex = serde_json::from_slice(&bytes).map_err(|e| {
            RagError::storage(FILE_BACKEND, format!("corrupt index '{}': {e}", path.display()))
        })?;
        index.validate()?;

        debug!(path = %path.display(), chunk_count = index.len(), "loaded persisted index");
        Ok(Some(index))
    }

    async fn put(&self, index: &VectorIndex) -> Result<()> {
        let bytes = serde_json::to_vec(index).map_err(|e| {
            RagError::storage(FILE_BACKEND, format!("failed to serialize index: {e}"))
        })?;

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            RagError::storage(
                FILE_BACKEND,
                format!("failed to create '{}': {e}", self.dir.display()),
            )
        })?;

        let tmp_path = self.dir.join(format!(".{INDEX_FILE_NAME}.{}.tmp", Uuid::new_v4()));
        if let Err(e) = self.write_temp(&tmp_path, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(RagError::storage(
                FILE_BACKEND,
                format!("failed to write '{}': {e}", tmp_path.display()),
            ));
        }

        let path = self.path();
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(RagError::storage(
                FILE_BACKEND,
                format!("failed to replace '{}': {e}", path.display()),
            ));
        }

        info!(path = %path.display(), bytes = bytes.len(), "persisted index");
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        let path = self.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "deleted persisted index");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "no persisted index to delete");
                Ok(())
            }
            Err(e) => Err(RagError::storage(
                FILE_BACKEND,
                format!("failed to delete '{}': {e}", path.display()),
            )),
        }
    }

    /// Derived from file metadata. Every `put` renames a fresh file into
    /// place, so the inode changes along with size and modification time.
    async fn revision(&self) -> Result<Option<IndexRevision>> {
        let path = self.path();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RagError::storage(
                    FILE_BACKEND,
                    format!("failed to stat '{}': {e}", path.display()),
                ));
            }
        };
        let modified = metadata.modified().ok();
        Ok(Some(IndexRevision::new(file_identity(&metadata), metadata.len(), modified)))
    }
}

#[cfg(unix)]
fn file_identity(metadata: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.ino()
}

#[cfg(not(unix))]
fn file_identity(_metadata: &std::fs::Metadata) -> u64 {
    0
}

/// An in-memory [`IndexStore`].
///
/// The slot is protected by a `tokio::sync::RwLock`. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryIndexStore {
    slot: RwLock<Option<(IndexRevision, VectorIndex)>>,
    generation: AtomicU64,
}

impl InMemoryIndexStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for InMemoryIndexStore {
    async fn get(&self) -> Result<Option<VectorIndex>> {
        Ok(self.slot.read().await.as_ref().map(|(_, index)| index.clone()))
    }

    async fn put(&self, index: &VectorIndex) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let revision = IndexRevision::new(generation, index.len() as u64, None);
        *self.slot.write().await = Some((revision, index.clone()));
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.slot.write().await.take();
        Ok(())
    }

    async fn revision(&self) -> Result<Option<IndexRevision>> {
        Ok(self.slot.read().await.as_ref().map(|(revision, _)| *revision))
    }
}
