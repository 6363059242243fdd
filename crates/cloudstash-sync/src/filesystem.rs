//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] using `tokio::fs` for async file operations.
//!
//! - **MD5 fingerprints**: content is digested in fixed 8 KiB chunks so
//!   large files are never held in memory.
//! - **Sorted listings**: `list_dir` orders entries by file name.
//! - **Symlinks**: followed; a dangling link is reported as not found.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument};

use cloudstash_core::domain::Fingerprint;
use cloudstash_core::ports::{ContentReader, FileSystemState, ILocalFileSystem};

/// Read size used while digesting file contents
pub const HASH_CHUNK_SIZE: usize = 8192;

/// Adapter that bridges the [`ILocalFileSystem`] port to the real filesystem.
///
/// Zero-sized: every operation takes its context from the path argument.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    /// Create a new `LocalFileSystemAdapter`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("path not found");
                return Ok(FileSystemState::not_found());
            }
            Err(e) => return Err(e.into()),
        };

        let modified = metadata.modified().ok().and_then(|st| {
            st.duration_since(std::time::UNIX_EPOCH)
                .ok()
                .and_then(|dur| DateTime::from_timestamp(dur.as_secs() as i64, dur.subsec_nanos()))
        });

        let state = FileSystemState {
            exists: true,
            is_file: metadata.is_file(),
            is_dir: metadata.is_dir(),
            size: if metadata.is_file() { metadata.len() } else { 0 },
            modified,
        };
        debug!(is_file = state.is_file, is_dir = state.is_dir, size = state.size, "state retrieved");
        Ok(state)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn list_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            children.push(entry.path());
        }
        children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!(entries = children.len(), "directory listed");
        Ok(children)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn compute_fingerprint(&self, path: &Path) -> anyhow::Result<Fingerprint> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Md5::new();
        let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        let fingerprint = Fingerprint::from_slice(hasher.finalize().as_slice())?;
        debug!(fingerprint = %fingerprint, "fingerprint computed");
        Ok(fingerprint)
    }

    async fn open_read(&self, path: &Path) -> anyhow::Result<ContentReader> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Box::new(file))
    }
}
