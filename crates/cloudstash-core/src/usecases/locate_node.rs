//! Marker-based node lookup with trash recovery
//!
//! Folders and files are found the same way: query the parent for
//! children whose marker equals the local base name and look at the first
//! match only. A live match of the right kind is reused. A trashed match
//! has its marker detached so that later lookups no longer see it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{BackupError, MetadataChanges, NodeKind, RemoteId, RemoteNode};
use crate::ports::IRemoteStore;

/// Shared lookup step of folder resolution and file upload
pub struct NodeLocator {
    store: Arc<dyn IRemoteStore + Send + Sync>,
}

impl NodeLocator {
    /// Creates a new NodeLocator over the given store
    pub fn new(store: Arc<dyn IRemoteStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Finds a reusable node named `name` under `parent`
    ///
    /// Only the first candidate in store order is examined. If it is
    /// trashed its marker is cleared.
    ///
    /// # Returns
    /// The first candidate when it is live and of `kind`, or `None` if the
    /// caller must create a new node
    ///
    /// # Errors
    /// Returns [`BackupError::RemoteQuery`] if the query or a marker
    /// update is rejected by the store
    pub async fn find_reusable(
        &self,
        parent: &RemoteId,
        name: &str,
        kind: NodeKind,
    ) -> Result<Option<RemoteNode>, BackupError> {
        let candidates = self
            .store
            .query_children(parent, name)
            .await
            .map_err(|e| query_error(name, &e))?;

        debug!(
            parent = %parent,
            name = %name,
            kind = %kind,
            candidates = candidates.len(),
            "Queried children by marker"
        );

        let Some(candidate) = candidates.into_iter().next() else {
            return Ok(None);
        };

        if candidate.is_trashed() {
            info!(
                remote_id = %candidate.id(),
                name = %name,
                "Detaching marker from trashed node"
            );
            self.store
                .update_metadata(candidate.id(), &MetadataChanges::clear_marker())
                .await
                .map_err(|e| query_error(name, &e))?;
            return Ok(None);
        }

        if candidate.kind() != kind {
            debug!(
                remote_id = %candidate.id(),
                found = %candidate.kind(),
                "First match has the wrong kind"
            );
            return Ok(None);
        }

        Ok(Some(candidate))
    }
}

fn query_error(name: &str, err: &anyhow::Error) -> BackupError {
    BackupError::RemoteQuery {
        name: name.to_string(),
        message: format!("{err:#}"),
    }
}
