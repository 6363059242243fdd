//! Local filesystem port (driven/secondary port)
//!
//! This module defines the interface for reading the local source tree:
//! classifying paths, listing directories, digesting file contents and
//! streaming them to the remote store.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - Missing paths are not errors: `get_state` reports them through
//!   [`FileSystemState::not_found`] so the caller decides how to react.
//! - File contents are exposed as an `AsyncRead` so uploads never hold a
//!   whole file in memory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;

use crate::domain::newtypes::Fingerprint;

// ============================================================================
// FileSystemState struct
// ============================================================================

/// Snapshot of a path's state on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemState {
    /// Whether the path exists on disk
    pub exists: bool,
    /// Whether this is a regular file
    pub is_file: bool,
    /// Whether this is a directory
    pub is_dir: bool,
    /// Size in bytes (0 for directories or non-existent paths)
    pub size: u64,
    /// Last modification time (None if not available or path doesn't exist)
    pub modified: Option<DateTime<Utc>>,
}

impl FileSystemState {
    /// Returns a state representing a non-existent path
    pub fn not_found() -> Self {
        Self {
            exists: false,
            is_file: false,
            is_dir: false,
            size: 0,
            modified: None,
        }
    }

    /// Returns true if the path exists and is a regular file
    pub fn is_regular_file(&self) -> bool {
        self.exists && self.is_file
    }

    /// Returns true if the path exists and is a directory
    pub fn is_directory(&self) -> bool {
        self.exists && self.is_dir
    }
}

/// Streaming reader over a local file's content
pub type ContentReader = Box<dyn AsyncRead + Send + Unpin>;

// ============================================================================
// ILocalFileSystem trait
// ============================================================================

/// Port trait for local filesystem operations
///
/// ## Implementation Notes
///
/// - Symlinks are followed; a dangling link reports `not_found`.
/// - `list_dir` must return entries sorted by file name so that walks
///   and their progress events are deterministic.
/// - `compute_fingerprint` digests the full byte stream with MD5.
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Gets the current state of a file or directory
    ///
    /// Returns `FileSystemState::not_found()` if the path doesn't exist
    /// (does not return an error for missing paths).
    ///
    /// # Arguments
    /// * `path` - Absolute path to check
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState>;

    /// Lists the direct children of a directory, sorted by name
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read
    async fn list_dir(&self, path: &Path) -> anyhow::Result<Vec<PathBuf>>;

    /// Computes the MD5 fingerprint of a file
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be read
    async fn compute_fingerprint(&self, path: &Path) -> anyhow::Result<Fingerprint>;

    /// Opens a file for streaming reads
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened
    async fn open_read(&self, path: &Path) -> anyhow::Result<ContentReader>;
}
