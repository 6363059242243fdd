//! Remote folder resolution use case
//!
//! Maps a local directory name to a remote folder node under a given
//! parent, creating the folder when no usable one exists.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::locate_node::NodeLocator;
use crate::domain::{BackupError, MetadataChanges, NodeKind, RemoteId, RemoteNode};
use crate::ports::IRemoteStore;

/// How a folder was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderResolution {
    /// A live folder with the same marker already existed
    Reused,
    /// A new folder was created
    Created,
}

/// Use case for find-or-create of remote folders
pub struct RemoteFolderResolver {
    store: Arc<dyn IRemoteStore + Send + Sync>,
    locator: NodeLocator,
}

impl RemoteFolderResolver {
    /// Creates a new RemoteFolderResolver over the given store
    pub fn new(store: Arc<dyn IRemoteStore + Send + Sync>) -> Self {
        Self {
            locator: NodeLocator::new(Arc::clone(&store)),
            store,
        }
    }

    /// Resolves the folder for local directory `name` under `parent`
    ///
    /// This method:
    /// 1. Looks up a live folder whose marker equals `name`
    /// 2. Creates one with title and marker set to `name` if none exists
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::RemoteQuery`] if the lookup fails and
    /// [`BackupError::RemoteCreate`] if the folder cannot be created
    pub async fn resolve(
        &self,
        name: &str,
        parent: &RemoteId,
    ) -> Result<(RemoteNode, FolderResolution), BackupError> {
        // Step 1: Reuse a live folder if there is one
        if let Some(existing) = self
            .locator
            .find_reusable(parent, name, NodeKind::Folder)
            .await?
        {
            return Ok((existing, FolderResolution::Reused));
        }

        // Step 2: Create it
        let created = self
            .store
            .create_folder(parent, &MetadataChanges::for_folder(name))
            .await
            .map_err(|e| BackupError::RemoteCreate {
                name: name.to_string(),
                message: format!("{e:#}"),
            })?;

        info!(
            remote_id = %created.id(),
            parent = %parent,
            name = %name,
            "Created remote folder"
        );
        Ok((created, FolderResolution::Created))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::usecases::test_support::MockRemoteStore;

    fn setup() -> (Arc<MockRemoteStore>, RemoteFolderResolver) {
        let store = Arc::new(MockRemoteStore::new());
        let resolver = RemoteFolderResolver::new(store.clone());
        (store, resolver)
    }

    #[tokio::test]
    async fn test_creates_folder_when_absent() {
        let (store, resolver) = setup();
        let root = MockRemoteStore::root_id();

        let (node, how) = resolver.resolve("Photos", &root).await.unwrap();

        assert_eq!(how, FolderResolution::Created);
        assert!(node.is_folder());
        assert_eq!(node.title(), "Photos");
        assert_eq!(node.marker(), Some("Photos"));
        assert_eq!(node.parent_id(), Some(&root));
        assert_eq!(store.folder_creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let (store, resolver) = setup();
        let root = MockRemoteStore::root_id();

        let (first, _) = resolver.resolve("Photos", &root).await.unwrap();
        let (second, how) = resolver.resolve("Photos", &root).await.unwrap();

        assert_eq!(how, FolderResolution::Reused);
        assert_eq!(first.id(), second.id());
        assert_eq!(store.folder_creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_trashed_folder_is_replaced() {
        let (store, resolver) = setup();
        let root = MockRemoteStore::root_id();

        let (original, _) = resolver.resolve("Photos", &root).await.unwrap();
        store.trash(original.id());

        let (replacement, how) = resolver.resolve("Photos", &root).await.unwrap();

        assert_eq!(how, FolderResolution::Created);
        assert_ne!(replacement.id(), original.id());
        assert_eq!(store.node(original.id()).unwrap().marker(), None);

        // The replacement is now the one reused.
        let (again, how) = resolver.resolve("Photos", &root).await.unwrap();
        assert_eq!(how, FolderResolution::Reused);
        assert_eq!(again.id(), replacement.id());
    }

    #[tokio::test]
    async fn test_trashed_first_match_wins_over_live_second() {
        let (store, resolver) = setup();
        let root = MockRemoteStore::root_id();
        let node = |trashed| {
            RemoteNode::new(
                RemoteId::generate(),
                Some(root.clone()),
                "Photos",
                NodeKind::Folder,
                Some("Photos".to_string()),
            )
            .with_trashed(trashed)
        };
        let trashed = store.insert(node(true));
        let live = store.insert(node(false));

        let (created, how) = resolver.resolve("Photos", &root).await.unwrap();

        assert_eq!(how, FolderResolution::Created);
        assert_ne!(created.id(), live.id());
        assert_eq!(store.node(trashed.id()).unwrap().marker(), None);
    }

    #[tokio::test]
    async fn test_same_name_under_different_parents() {
        let (_store, resolver) = setup();
        let root = MockRemoteStore::root_id();

        let (a, _) = resolver.resolve("A", &root).await.unwrap();
        let (b, _) = resolver.resolve("B", &root).await.unwrap();
        let (a_img, _) = resolver.resolve("img", a.id()).await.unwrap();
        let (b_img, _) = resolver.resolve("img", b.id()).await.unwrap();

        assert_ne!(a_img.id(), b_img.id());
    }

    #[tokio::test]
    async fn test_create_failure_is_branch_error() {
        let (store, resolver) = setup();
        store.fail_create.store(true, Ordering::SeqCst);

        let err = resolver
            .resolve("Photos", &MockRemoteStore::root_id())
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::RemoteCreate { .. }));
        assert!(!err.is_fatal());
    }
}
