//! Remote store session
//!
//! A [`SyncSession`] owns the connection to the remote store and the
//! handle of the backup's root folder. The root is resolved lazily on the
//! first remote operation that needs it and then reused for the lifetime
//! of the session, across runs, until [`SyncSession::disconnect`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::resolve_folder::{FolderResolution, RemoteFolderResolver};
use super::upload_file::{RemoteFileUploader, UploadOutcome};
use crate::domain::{BackupError, RemoteId, RemoteNode};
use crate::ports::{ILocalFileSystem, IRemoteStore};

/// Connection state and cached root for one remote store
pub struct SyncSession {
    store: Arc<dyn IRemoteStore + Send + Sync>,
    root_name: String,
    connected: AtomicBool,
    root: Mutex<Option<RemoteNode>>,
    folders: RemoteFolderResolver,
    uploader: RemoteFileUploader,
}

impl SyncSession {
    /// Creates a disconnected session
    ///
    /// # Arguments
    ///
    /// * `store` - Remote store to back up into
    /// * `local_filesystem` - Source of uploaded content
    /// * `root_name` - Title of the top-level backup folder
    /// * `chunk_size` - Upload chunk size in bytes
    pub fn new(
        store: Arc<dyn IRemoteStore + Send + Sync>,
        local_filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
        root_name: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            folders: RemoteFolderResolver::new(Arc::clone(&store)),
            uploader: RemoteFileUploader::new(Arc::clone(&store), local_filesystem, chunk_size),
            store,
            root_name: root_name.into(),
            connected: AtomicBool::new(false),
            root: Mutex::new(None),
        }
    }

    /// Returns true once `connect` has succeeded
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Title of the top-level backup folder
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Connects to the store if not already connected
    ///
    /// # Errors
    /// Returns [`BackupError::RemoteConnect`] with the store's diagnostic
    pub async fn connect(&self) -> Result<(), BackupError> {
        if self.is_connected() {
            return Ok(());
        }

        let result = self.store.connect().await;
        if !result.success {
            let detail = result
                .failure_detail
                .unwrap_or_else(|| "connection refused".to_string());
            warn!(detail = %detail, "Could not connect to remote store");
            return Err(BackupError::RemoteConnect(detail));
        }

        self.connected.store(true, Ordering::Release);
        info!("Connected to remote store");
        Ok(())
    }

    /// Returns the backup's root folder, resolving it on first use
    ///
    /// The root is found or created under the store's true root with the
    /// configured root name, then cached.
    ///
    /// # Errors
    /// Returns the resolver's branch error, or [`BackupError::RemoteQuery`]
    /// if the store's true root cannot be read
    pub async fn root_folder(&self) -> Result<RemoteNode, BackupError> {
        let mut cached = self.root.lock().await;
        if let Some(root) = cached.as_ref() {
            return Ok(root.clone());
        }

        let store_root = self
            .store
            .root()
            .await
            .map_err(|e| BackupError::RemoteQuery {
                name: self.root_name.clone(),
                message: format!("{e:#}"),
            })?;

        let (root, _) = self
            .folders
            .resolve(&self.root_name, store_root.id())
            .await?;
        info!(remote_id = %root.id(), name = %self.root_name, "Resolved backup root");

        *cached = Some(root.clone());
        Ok(root)
    }

    /// Resolves the folder for local directory `name`
    ///
    /// A `None` parent means the backup's root folder.
    pub async fn resolve_folder(
        &self,
        name: &str,
        parent: Option<&RemoteNode>,
    ) -> Result<(RemoteNode, FolderResolution), BackupError> {
        let parent_id = self.parent_id(parent).await?;
        self.folders.resolve(name, &parent_id).await
    }

    /// Uploads `path` into `parent`
    ///
    /// A `None` parent means the backup's root folder.
    pub async fn upload_file(
        &self,
        path: &Path,
        parent: Option<&RemoteNode>,
    ) -> Result<UploadOutcome, BackupError> {
        let parent_id = self.parent_id(parent).await?;
        self.uploader.upload(path, &parent_id).await
    }

    /// Asks the store to flush pending changes
    pub async fn request_sync(&self) -> anyhow::Result<()> {
        self.store.request_sync().await
    }

    /// Closes the connection and forgets the cached root
    pub async fn disconnect(&self) -> anyhow::Result<()> {
        *self.root.lock().await = None;
        if self.connected.swap(false, Ordering::AcqRel) {
            self.store.disconnect().await?;
            info!("Disconnected from remote store");
        }
        Ok(())
    }

    async fn parent_id(&self, parent: Option<&RemoteNode>) -> Result<RemoteId, BackupError> {
        match parent {
            Some(node) => Ok(node.id().clone()),
            None => Ok(self.root_folder().await?.id().clone()),
        }
    }
}
