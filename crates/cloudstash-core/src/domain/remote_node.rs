//! Remote node metadata
//!
//! A [`RemoteNode`] is the core's view of a folder or file object in the
//! remote store. The store owns the node lifecycle; the core only creates
//! nodes, queries them by marker and updates their metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;

/// Kind of a remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Folder,
    File,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Folder => write!(f, "folder"),
            NodeKind::File => write!(f, "file"),
        }
    }
}

/// A folder or file object in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNode {
    id: RemoteId,
    parent_id: Option<RemoteId>,
    title: String,
    kind: NodeKind,
    is_trashed: bool,
    marker: Option<String>,
    mime_type: Option<String>,
    size_bytes: u64,
    modified_at: DateTime<Utc>,
}

impl RemoteNode {
    /// Creates a live (untrashed) node with no MIME type and zero size
    pub fn new(
        id: RemoteId,
        parent_id: Option<RemoteId>,
        title: impl Into<String>,
        kind: NodeKind,
        marker: Option<String>,
    ) -> Self {
        Self {
            id,
            parent_id,
            title: title.into(),
            kind,
            is_trashed: false,
            marker,
            mime_type: None,
            size_bytes: 0,
            modified_at: Utc::now(),
        }
    }

    /// Builder-style setter for the trash flag
    #[must_use]
    pub fn with_trashed(mut self, trashed: bool) -> Self {
        self.is_trashed = trashed;
        self
    }

    /// Builder-style setter for the MIME type
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Builder-style setter for the content size
    #[must_use]
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    /// Builder-style setter for the modification time
    #[must_use]
    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = modified_at;
        self
    }

    pub fn id(&self) -> &RemoteId {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&RemoteId> {
        self.parent_id.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_trashed(&self) -> bool {
        self.is_trashed
    }

    /// The application-private marker property, if any
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Returns true if this node can be reused for a local item of `kind`
    pub fn is_reusable_as(&self, kind: NodeKind) -> bool {
        self.kind == kind && !self.is_trashed
    }

    /// Applies a metadata change set in place
    pub fn apply(&mut self, changes: &MetadataChanges) {
        if let Some(title) = &changes.title {
            self.title.clone_from(title);
        }
        if let Some(mime_type) = &changes.mime_type {
            self.mime_type = Some(mime_type.clone());
        }
        match &changes.marker {
            MarkerChange::Keep => {}
            MarkerChange::Set(marker) => self.marker = Some(marker.clone()),
            MarkerChange::Clear => self.marker = None,
        }
        self.modified_at = Utc::now();
    }
}

/// Update to the marker property
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerChange {
    #[default]
    Keep,
    Set(String),
    Clear,
}

/// Partial metadata update for a remote node
///
/// Fields left as `None` are not touched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetadataChanges {
    pub title: Option<String>,
    pub mime_type: Option<String>,
    pub marker: MarkerChange,
}

impl MetadataChanges {
    /// Title, MIME type and marker for a backed-up file
    #[must_use]
    pub fn for_file(name: &str, mime_type: &str) -> Self {
        Self {
            title: Some(name.to_string()),
            mime_type: Some(mime_type.to_string()),
            marker: MarkerChange::Set(name.to_string()),
        }
    }

    /// Title and marker for a backed-up folder
    #[must_use]
    pub fn for_folder(name: &str) -> Self {
        Self {
            title: Some(name.to_string()),
            mime_type: None,
            marker: MarkerChange::Set(name.to_string()),
        }
    }

    /// Removes the marker so the node no longer matches lookups
    #[must_use]
    pub fn clear_marker() -> Self {
        Self {
            marker: MarkerChange::Clear,
            ..Self::default()
        }
    }

    /// Returns true if applying these changes would be a no-op
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.mime_type.is_none() && self.marker == MarkerChange::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(kind: NodeKind) -> RemoteNode {
        RemoteNode::new(
            RemoteId::generate(),
            None,
            "Photos",
            kind,
            Some("Photos".to_string()),
        )
    }

    #[test]
    fn test_reusable_requires_kind_and_live() {
        let folder = node(NodeKind::Folder);
        assert!(folder.is_reusable_as(NodeKind::Folder));
        assert!(!folder.is_reusable_as(NodeKind::File));

        let trashed = node(NodeKind::Folder).with_trashed(true);
        assert!(!trashed.is_reusable_as(NodeKind::Folder));
    }

    #[test]
    fn test_apply_clear_marker() {
        let mut n = node(NodeKind::File);
        n.apply(&MetadataChanges::clear_marker());
        assert_eq!(n.marker(), None);
        assert_eq!(n.title(), "Photos");
    }

    #[test]
    fn test_apply_file_metadata() {
        let mut n = node(NodeKind::File);
        n.apply(&MetadataChanges::for_file("a.jpg", "image/jpeg"));
        assert_eq!(n.title(), "a.jpg");
        assert_eq!(n.mime_type(), Some("image/jpeg"));
        assert_eq!(n.marker(), Some("a.jpg"));
    }

    #[test]
    fn test_empty_changes() {
        assert!(MetadataChanges::default().is_empty());
        assert!(!MetadataChanges::clear_marker().is_empty());
        assert!(!MetadataChanges::for_folder("x").is_empty());
    }

    #[test]
    fn test_node_kind_display() {
        assert_eq!(NodeKind::Folder.to_string(), "folder");
        assert_eq!(NodeKind::File.to_string(), "file");
    }
}
