//! Remote store port (driven/secondary port)
//!
//! This module defines the interface for talking to the hierarchical
//! remote object store the backup is written to. The store has no native
//! directory primitive: folders and files are metadata objects that point
//! at a parent, and lookups go through an application-private marker
//! property holding the local base name.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification. Use cases map them to
//!   `BackupError` variants.
//! - Content is written through an [`IContentWriter`] so large files are
//!   streamed chunk by chunk; metadata is applied when the writer commits.
//! - The core never deletes nodes. Trashing is a user-side action the
//!   store reports through `RemoteNode::is_trashed`.

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::RemoteId;
use crate::domain::remote_node::{MetadataChanges, RemoteNode};

// ============================================================================
// ConnectResult struct
// ============================================================================

/// Outcome of a connection attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResult {
    /// Whether the store is ready for requests
    pub success: bool,
    /// Transport diagnostic when `success` is false
    pub failure_detail: Option<String>,
}

impl ConnectResult {
    /// A successful connection
    pub fn connected() -> Self {
        Self {
            success: true,
            failure_detail: None,
        }
    }

    /// A failed connection with a diagnostic
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            failure_detail: Some(detail.into()),
        }
    }
}

// ============================================================================
// IContentWriter trait
// ============================================================================

/// Handle for streaming the content of one remote file
///
/// Obtained from [`IRemoteStore::create_file`] or
/// [`IRemoteStore::open_for_overwrite`]. Nothing becomes visible in the
/// store until [`commit`](IContentWriter::commit) succeeds; dropping the
/// writer discards the pending content.
#[async_trait::async_trait]
pub trait IContentWriter: Send {
    /// Appends a chunk of content
    async fn write(&mut self, chunk: &[u8]) -> anyhow::Result<()>;

    /// Publishes the content and applies `metadata`
    ///
    /// # Returns
    /// The node as stored after the commit
    async fn commit(self: Box<Self>, metadata: &MetadataChanges) -> anyhow::Result<RemoteNode>;
}

// ============================================================================
// IRemoteStore trait
// ============================================================================

/// Port trait for the remote object store
///
/// ## Implementation Notes
///
/// - `query_children` must return matches in a stable order; callers
///   take the first usable match.
/// - `query_children` includes trashed nodes so that callers can detach
///   their markers.
/// - Requests other than `connect` may fail while disconnected.
#[async_trait::async_trait]
pub trait IRemoteStore: Send + Sync {
    /// Opens the connection to the store
    ///
    /// Connection problems are reported through [`ConnectResult`] rather
    /// than as an error.
    async fn connect(&self) -> ConnectResult;

    /// Returns the store's true root folder
    async fn root(&self) -> anyhow::Result<RemoteNode>;

    /// Lists the children of `parent` whose marker equals `marker`
    ///
    /// # Arguments
    /// * `parent` - Folder to search in (direct children only)
    /// * `marker` - Marker property value to match exactly
    async fn query_children(&self, parent: &RemoteId, marker: &str)
        -> anyhow::Result<Vec<RemoteNode>>;

    /// Creates a folder under `parent` with the given metadata
    async fn create_folder(
        &self,
        parent: &RemoteId,
        metadata: &MetadataChanges,
    ) -> anyhow::Result<RemoteNode>;

    /// Allocates content for a new file under `parent`
    ///
    /// The file node is created when the returned writer commits.
    async fn create_file(&self, parent: &RemoteId) -> anyhow::Result<Box<dyn IContentWriter>>;

    /// Opens an existing file for a full content replacement
    ///
    /// # Errors
    /// Returns an error if the node doesn't exist or is not a file
    async fn open_for_overwrite(&self, node: &RemoteId)
        -> anyhow::Result<Box<dyn IContentWriter>>;

    /// Applies a metadata change set to a node
    async fn update_metadata(
        &self,
        node: &RemoteId,
        changes: &MetadataChanges,
    ) -> anyhow::Result<RemoteNode>;

    /// Asks the store to flush pending changes
    async fn request_sync(&self) -> anyhow::Result<()>;

    /// Closes the connection
    async fn disconnect(&self) -> anyhow::Result<()>;
}
