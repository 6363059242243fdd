//! File upload use case
//!
//! Streams one local file into the remote store under a given parent
//! folder. An existing live file node with the same marker is overwritten
//! in full; otherwise a new file node is created. Either way the node ends
//! up with the file's name as title and marker, and a MIME type derived
//! from its extension.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, instrument};

use super::locate_node::NodeLocator;
use crate::domain::{mime_type_for, BackupError, MetadataChanges, NodeKind, RemoteId, RemoteNode};
use crate::ports::{IContentWriter, ILocalFileSystem, IRemoteStore};

/// Default upload chunk size (8 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// How a file reached the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    /// Content of an existing node was replaced
    Overwritten,
    /// A new node was created
    Created,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub node: RemoteNode,
    pub kind: UploadKind,
    pub bytes: u64,
}

/// Use case for streaming local files to the remote store
pub struct RemoteFileUploader {
    store: Arc<dyn IRemoteStore + Send + Sync>,
    local_filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
    locator: NodeLocator,
    chunk_size: usize,
}

impl RemoteFileUploader {
    /// Creates a new RemoteFileUploader
    ///
    /// # Arguments
    ///
    /// * `store` - Remote store receiving the content
    /// * `local_filesystem` - Source of the file content
    /// * `chunk_size` - Bytes per streamed write; 0 selects [`DEFAULT_CHUNK_SIZE`]
    pub fn new(
        store: Arc<dyn IRemoteStore + Send + Sync>,
        local_filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
        chunk_size: usize,
    ) -> Self {
        Self {
            locator: NodeLocator::new(Arc::clone(&store)),
            store,
            local_filesystem,
            chunk_size: if chunk_size == 0 {
                DEFAULT_CHUNK_SIZE
            } else {
                chunk_size
            },
        }
    }

    /// Uploads `path` under `parent`
    ///
    /// This method:
    /// 1. Checks that `path` is a regular file
    /// 2. Looks up a live file node with the file's name as marker
    /// 3. Opens it for overwrite, or allocates content for a new node
    /// 4. Streams the content in chunks and commits the metadata
    ///
    /// # Errors
    ///
    /// - [`BackupError::FileNotFound`] if `path` is not a regular file
    /// - [`BackupError::LocalIo`] if the file cannot be read
    /// - [`BackupError::RemoteQuery`] if the lookup or the open is rejected
    /// - [`BackupError::RemoteCreate`] if the content cannot be written or committed
    #[instrument(skip(self), fields(path = %path.display(), parent = %parent))]
    pub async fn upload(&self, path: &Path, parent: &RemoteId) -> Result<UploadOutcome, BackupError> {
        // Step 1: Only regular files are uploaded
        let state = self
            .local_filesystem
            .get_state(path)
            .await
            .map_err(|e| local_io(path, &e))?;
        if !state.is_regular_file() {
            return Err(BackupError::FileNotFound(path.to_path_buf()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BackupError::FileNotFound(path.to_path_buf()))?;

        // Step 2: Find the node to overwrite, if any
        let existing = self
            .locator
            .find_reusable(parent, &name, NodeKind::File)
            .await?;

        // Step 3: Obtain a content writer
        let (writer, kind) = match &existing {
            Some(node) => {
                debug!(remote_id = %node.id(), "Overwriting existing remote file");
                let writer = self
                    .store
                    .open_for_overwrite(node.id())
                    .await
                    .map_err(|e| BackupError::RemoteQuery {
                        name: name.clone(),
                        message: format!("{e:#}"),
                    })?;
                (writer, UploadKind::Overwritten)
            }
            None => {
                let writer = self
                    .store
                    .create_file(parent)
                    .await
                    .map_err(|e| create_error(&name, &e))?;
                (writer, UploadKind::Created)
            }
        };

        // Step 4: Stream and commit
        let (writer, bytes) = self.stream_content(path, &name, writer).await?;
        let metadata = MetadataChanges::for_file(&name, mime_type_for(path));
        let node = writer
            .commit(&metadata)
            .await
            .map_err(|e| create_error(&name, &e))?;

        info!(
            remote_id = %node.id(),
            bytes,
            kind = ?kind,
            "Uploaded file"
        );
        Ok(UploadOutcome { node, kind, bytes })
    }

    async fn stream_content(
        &self,
        path: &Path,
        name: &str,
        mut writer: Box<dyn IContentWriter>,
    ) -> Result<(Box<dyn IContentWriter>, u64), BackupError> {
        let mut reader = self
            .local_filesystem
            .open_read(path)
            .await
            .map_err(|e| local_io(path, &e))?;

        let mut buf = vec![0u8; self.chunk_size];
        let mut total: u64 = 0;
        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| BackupError::LocalIo {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            if n == 0 {
                break;
            }
            writer
                .write(&buf[..n])
                .await
                .map_err(|e| create_error(name, &e))?;
            total += n as u64;
        }

        Ok((writer, total))
    }
}

fn local_io(path: &Path, err: &anyhow::Error) -> BackupError {
    BackupError::LocalIo {
        path: path.to_path_buf(),
        message: format!("{err:#}"),
    }
}

fn create_error(name: &str, err: &anyhow::Error) -> BackupError {
    BackupError::RemoteCreate {
        name: name.to_string(),
        message: format!("{err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::usecases::test_support::{MockFileSystem, MockRemoteStore};

    fn setup(chunk_size: usize) -> (Arc<MockRemoteStore>, Arc<MockFileSystem>, RemoteFileUploader) {
        let store = Arc::new(MockRemoteStore::new());
        let fs = Arc::new(MockFileSystem::new());
        let uploader = RemoteFileUploader::new(store.clone(), fs.clone(), chunk_size);
        (store, fs, uploader)
    }

    #[tokio::test]
    async fn test_creates_new_file_with_metadata() {
        let (store, fs, uploader) = setup(4);
        fs.add_file("/src/a.jpg", b"jpeg-bytes");
        let root = MockRemoteStore::root_id();

        let outcome = uploader.upload(Path::new("/src/a.jpg"), &root).await.unwrap();

        assert_eq!(outcome.kind, UploadKind::Created);
        assert_eq!(outcome.bytes, 10);
        assert_eq!(outcome.node.title(), "a.jpg");
        assert_eq!(outcome.node.marker(), Some("a.jpg"));
        assert_eq!(outcome.node.mime_type(), Some("image/jpeg"));
        assert_eq!(outcome.node.parent_id(), Some(&root));
        assert_eq!(store.content(outcome.node.id()).unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_second_upload_overwrites_same_node() {
        let (store, fs, uploader) = setup(0);
        let root = MockRemoteStore::root_id();
        fs.add_file("/src/notes.txt", b"v1");
        let first = uploader.upload(Path::new("/src/notes.txt"), &root).await.unwrap();

        fs.add_file("/src/notes.txt", b"version two");
        let second = uploader.upload(Path::new("/src/notes.txt"), &root).await.unwrap();

        assert_eq!(second.kind, UploadKind::Overwritten);
        assert_eq!(first.node.id(), second.node.id());
        assert_eq!(store.content(second.node.id()).unwrap(), b"version two");
        assert_eq!(store.node(second.node.id()).unwrap().size_bytes(), 11);
        assert_eq!(store.file_creates.load(Ordering::SeqCst), 1);
        assert_eq!(store.overwrites.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trashed_file_is_replaced() {
        let (store, fs, uploader) = setup(0);
        let root = MockRemoteStore::root_id();
        fs.add_file("/src/b.png", b"png");
        let first = uploader.upload(Path::new("/src/b.png"), &root).await.unwrap();
        store.trash(first.node.id());

        let second = uploader.upload(Path::new("/src/b.png"), &root).await.unwrap();

        assert_eq!(second.kind, UploadKind::Created);
        assert_ne!(second.node.id(), first.node.id());
        assert_eq!(store.node(first.node.id()).unwrap().marker(), None);
    }

    #[tokio::test]
    async fn test_unknown_extension_defaults_to_text_plain() {
        let (_store, fs, uploader) = setup(0);
        fs.add_file("/src/Makefile", b"all:");

        let outcome = uploader
            .upload(Path::new("/src/Makefile"), &MockRemoteStore::root_id())
            .await
            .unwrap();
        assert_eq!(outcome.node.mime_type(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_directory_is_file_not_found() {
        let (_store, fs, uploader) = setup(0);
        fs.add_dir("/src/Photos");

        let err = uploader
            .upload(Path::new("/src/Photos"), &MockRemoteStore::root_id())
            .await
            .unwrap_err();
        assert_eq!(err, BackupError::FileNotFound(PathBuf::from("/src/Photos")));
    }

    #[tokio::test]
    async fn test_open_failure_is_branch_error() {
        let (store, fs, uploader) = setup(0);
        let root = MockRemoteStore::root_id();
        fs.add_file("/src/c.txt", b"c");
        uploader.upload(Path::new("/src/c.txt"), &root).await.unwrap();

        store.fail_open.store(true, Ordering::SeqCst);
        let err = uploader.upload(Path::new("/src/c.txt"), &root).await.unwrap_err();

        assert!(matches!(err, BackupError::RemoteQuery { .. }));
    }

    #[tokio::test]
    async fn test_create_failure_is_branch_error() {
        let (store, fs, uploader) = setup(0);
        fs.add_file("/src/d.txt", b"d");
        store.fail_create.store(true, Ordering::SeqCst);

        let err = uploader
            .upload(Path::new("/src/d.txt"), &MockRemoteStore::root_id())
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::RemoteCreate { ref name, .. } if name == "d.txt"));
    }

    #[tokio::test]
    async fn test_read_failure_is_fatal() {
        let (_store, fs, uploader) = setup(0);
        fs.add_file("/src/e.txt", b"e");
        fs.fail_reads.store(true, Ordering::SeqCst);

        let err = uploader
            .upload(Path::new("/src/e.txt"), &MockRemoteStore::root_id())
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::LocalIo { .. }));
        assert!(err.is_fatal());
    }
}
