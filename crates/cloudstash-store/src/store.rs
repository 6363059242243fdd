//! SQLite implementation of IRemoteStore
//!
//! Nodes live in one `nodes` table. The well-known row `root` is the
//! store's true root; everything the backup creates hangs below it.
//!
//! ## Type Mapping
//!
//! | Domain Type      | SQL Type | Strategy                                   |
//! |------------------|----------|--------------------------------------------|
//! | RemoteId         | TEXT     | String via `.as_str()` / `RemoteId::new()` |
//! | NodeKind         | TEXT     | `"folder"` / `"file"`                      |
//! | is_trashed       | INTEGER  | 0 / 1                                      |
//! | DateTime<Utc>    | TEXT     | RFC 3339 with milliseconds                 |
//! | content          | BLOB     | Whole file content, buffered until commit  |

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, instrument};

use cloudstash_core::domain::{MarkerChange, MetadataChanges, NodeKind, RemoteId, RemoteNode};
use cloudstash_core::ports::{ConnectResult, IContentWriter, IRemoteStore};

use crate::StoreError;

/// ID of the store's true root folder
pub const ROOT_ID: &str = "root";

/// SQLite-based implementation of the remote store port
pub struct SqliteRemoteStore {
    pool: SqlitePool,
    connected: AtomicBool,
}

/// One line of a depth-first listing of the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Distance from the true root (its direct children have depth 0)
    pub depth: usize,
    pub node: RemoteNode,
}

impl SqliteRemoteStore {
    /// Creates a new, disconnected store over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            connected: AtomicBool::new(false),
        }
    }

    /// Returns a node by ID, trashed or not
    pub async fn node(&self, id: &RemoteId) -> Result<Option<RemoteNode>, StoreError> {
        let row = sqlx::query("SELECT * FROM nodes WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(node_from_row(r)?)),
            None => Ok(None),
        }
    }

    /// Lists every child of `parent` in creation order
    pub async fn list_children(&self, parent: &RemoteId) -> Result<Vec<RemoteNode>, StoreError> {
        let rows = sqlx::query("SELECT * FROM nodes WHERE parent_id = ? ORDER BY seq")
            .bind(parent.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(node_from_row).collect()
    }

    /// Reads the content blob of a file node
    pub async fn read_content(&self, id: &RemoteId) -> Result<Option<Vec<u8>>, StoreError> {
        let content: Option<Option<Vec<u8>>> =
            sqlx::query_scalar("SELECT content FROM nodes WHERE id = ?")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(content.flatten())
    }

    /// Number of times a file node's content has been written
    pub async fn revision(&self, id: &RemoteId) -> Result<Option<i64>, StoreError> {
        let revision: Option<i64> = sqlx::query_scalar("SELECT revision FROM nodes WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(revision)
    }

    /// Moves a node to the trash
    ///
    /// This is the user-side action the backup recovers from: the node keeps
    /// its marker and stays queryable, but is no longer reused.
    pub async fn trash(&self, id: &RemoteId) -> Result<RemoteNode, StoreError> {
        if id.as_str() == ROOT_ID {
            return Err(StoreError::QueryFailed(
                "the store root cannot be trashed".to_string(),
            ));
        }

        let result = sqlx::query("UPDATE nodes SET is_trashed = 1, modified_at = ? WHERE id = ?")
            .bind(now_rfc3339())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NodeNotFound(id.to_string()));
        }

        info!(remote_id = %id, "Node moved to trash");
        self.node(id)
            .await?
            .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))
    }

    /// Depth-first listing of everything below the true root
    pub async fn tree(&self) -> Result<Vec<TreeEntry>, StoreError> {
        let root = RemoteId::new(ROOT_ID.to_string())
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let mut entries = Vec::new();
        let mut stack: Vec<(usize, RemoteNode)> = self
            .list_children(&root)
            .await?
            .into_iter()
            .rev()
            .map(|n| (0, n))
            .collect();

        while let Some((depth, node)) = stack.pop() {
            if node.is_folder() {
                let children = self.list_children(node.id()).await?;
                stack.extend(children.into_iter().rev().map(|c| (depth + 1, c)));
            }
            entries.push(TreeEntry { depth, node });
        }

        Ok(entries)
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }

    async fn require_kind(&self, id: &RemoteId, kind: NodeKind) -> Result<RemoteNode, StoreError> {
        let node = self
            .node(id)
            .await?
            .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;
        match (kind, node.kind()) {
            (NodeKind::Folder, NodeKind::File) => Err(StoreError::NotAFolder(id.to_string())),
            (NodeKind::File, NodeKind::Folder) => Err(StoreError::NotAFile(id.to_string())),
            _ => Ok(node),
        }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn kind_to_str(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Folder => "folder",
        NodeKind::File => "file",
    }
}

fn kind_from_str(s: &str) -> Result<NodeKind, StoreError> {
    match s {
        "folder" => Ok(NodeKind::Folder),
        "file" => Ok(NodeKind::File),
        other => Err(StoreError::SerializationError(format!(
            "Unknown node kind: {}",
            other
        ))),
    }
}

fn parse_id(s: String) -> Result<RemoteId, StoreError> {
    RemoteId::new(s).map_err(|e| StoreError::SerializationError(e.to_string()))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::SerializationError(format!("Invalid timestamp {}: {}", s, e)))
}

fn node_from_row(row: &SqliteRow) -> Result<RemoteNode, StoreError> {
    let id: String = row.try_get("id")?;
    let parent_id: Option<String> = row.try_get("parent_id")?;
    let title: String = row.try_get("title")?;
    let kind: String = row.try_get("kind")?;
    let is_trashed: i64 = row.try_get("is_trashed")?;
    let marker: Option<String> = row.try_get("marker")?;
    let mime_type: Option<String> = row.try_get("mime_type")?;
    let size_bytes: i64 = row.try_get("size_bytes")?;
    let modified_at: String = row.try_get("modified_at")?;

    let mut node = RemoteNode::new(
        parse_id(id)?,
        parent_id.map(parse_id).transpose()?,
        title,
        kind_from_str(&kind)?,
        marker,
    )
    .with_trashed(is_trashed != 0)
    .with_size(u64::try_from(size_bytes).unwrap_or(0))
    .with_modified_at(parse_datetime(&modified_at)?);

    if let Some(mime) = mime_type {
        node = node.with_mime_type(mime);
    }
    Ok(node)
}

fn marker_value(change: &MarkerChange, current: Option<&str>) -> Option<String> {
    match change {
        MarkerChange::Keep => current.map(str::to_string),
        MarkerChange::Set(marker) => Some(marker.clone()),
        MarkerChange::Clear => None,
    }
}

async fn write_metadata(
    conn: &mut sqlx::SqliteConnection,
    node: &RemoteNode,
) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE nodes SET title = ?, mime_type = ?, marker = ?, modified_at = ? WHERE id = ?",
    )
    .bind(node.title())
    .bind(node.mime_type())
    .bind(node.marker())
    .bind(now_rfc3339())
    .bind(node.id().as_str())
    .execute(conn)
    .await?;
    Ok(())
}

// ============================================================================
// IRemoteStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IRemoteStore for SqliteRemoteStore {
    #[instrument(skip(self))]
    async fn connect(&self) -> ConnectResult {
        let root: Result<i64, sqlx::Error> =
            sqlx::query_scalar("SELECT COUNT(*) FROM nodes WHERE id = ?")
                .bind(ROOT_ID)
                .fetch_one(&self.pool)
                .await;

        match root {
            Ok(1) => {
                self.connected.store(true, Ordering::Release);
                debug!("Remote store connected");
                ConnectResult::connected()
            }
            Ok(_) => ConnectResult::failed("store root is missing"),
            Err(e) => ConnectResult::failed(e.to_string()),
        }
    }

    async fn root(&self) -> anyhow::Result<RemoteNode> {
        self.ensure_connected()?;
        let root = RemoteId::new(ROOT_ID.to_string())?;
        let node = self
            .node(&root)
            .await?
            .ok_or_else(|| StoreError::NodeNotFound(ROOT_ID.to_string()))?;
        Ok(node)
    }

    #[instrument(skip(self), fields(parent = %parent))]
    async fn query_children(
        &self,
        parent: &RemoteId,
        marker: &str,
    ) -> anyhow::Result<Vec<RemoteNode>> {
        self.ensure_connected()?;
        let rows = sqlx::query("SELECT * FROM nodes WHERE parent_id = ? AND marker = ? ORDER BY seq")
            .bind(parent.as_str())
            .bind(marker)
            .fetch_all(&self.pool)
            .await
            .context("Failed to query children by marker")?;

        let nodes = rows
            .iter()
            .map(node_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    #[instrument(skip(self, metadata), fields(parent = %parent))]
    async fn create_folder(
        &self,
        parent: &RemoteId,
        metadata: &MetadataChanges,
    ) -> anyhow::Result<RemoteNode> {
        self.ensure_connected()?;
        self.require_kind(parent, NodeKind::Folder).await?;

        let id = RemoteId::generate();
        let now = now_rfc3339();
        sqlx::query(
            "INSERT INTO nodes (id, parent_id, title, kind, marker, mime_type, created_at, modified_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(parent.as_str())
        .bind(metadata.title.as_deref().unwrap_or_default())
        .bind(kind_to_str(NodeKind::Folder))
        .bind(marker_value(&metadata.marker, None))
        .bind(metadata.mime_type.as_deref())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to insert folder node")?;

        let node = self
            .node(&id)
            .await?
            .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;
        Ok(node)
    }

    async fn create_file(&self, parent: &RemoteId) -> anyhow::Result<Box<dyn IContentWriter>> {
        self.ensure_connected()?;
        self.require_kind(parent, NodeKind::Folder).await?;

        Ok(Box::new(SqliteContentWriter {
            pool: self.pool.clone(),
            target: WriteTarget::New(parent.clone()),
            buffer: Vec::new(),
        }))
    }

    async fn open_for_overwrite(
        &self,
        node: &RemoteId,
    ) -> anyhow::Result<Box<dyn IContentWriter>> {
        self.ensure_connected()?;
        self.require_kind(node, NodeKind::File).await?;

        Ok(Box::new(SqliteContentWriter {
            pool: self.pool.clone(),
            target: WriteTarget::Existing(node.clone()),
            buffer: Vec::new(),
        }))
    }

    #[instrument(skip(self, changes), fields(node = %node))]
    async fn update_metadata(
        &self,
        node: &RemoteId,
        changes: &MetadataChanges,
    ) -> anyhow::Result<RemoteNode> {
        self.ensure_connected()?;
        let mut current = self
            .node(node)
            .await?
            .ok_or_else(|| StoreError::NodeNotFound(node.to_string()))?;
        current.apply(changes);

        let mut conn = self.pool.acquire().await?;
        write_metadata(&mut *conn, &current).await?;
        Ok(current)
    }

    async fn request_sync(&self) -> anyhow::Result<()> {
        self.ensure_connected()?;
        sqlx::query("PRAGMA wal_checkpoint(PASSIVE)")
            .execute(&self.pool)
            .await
            .context("Failed to checkpoint the store")?;
        debug!("Remote store checkpointed");
        Ok(())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.connected.store(false, Ordering::Release);
        debug!("Remote store disconnected");
        Ok(())
    }
}

// ============================================================================
// Content writer
// ============================================================================

enum WriteTarget {
    New(RemoteId),
    Existing(RemoteId),
}

/// Buffers content and publishes it in one transaction on commit
///
/// The whole file is held in memory until `commit`, since the content is
/// stored as a single BLOB per node. Chunked writes bound the reads from
/// the local file, not the memory used by this writer.
struct SqliteContentWriter {
    pool: SqlitePool,
    target: WriteTarget,
    buffer: Vec<u8>,
}

#[async_trait::async_trait]
impl IContentWriter for SqliteContentWriter {
    async fn write(&mut self, chunk: &[u8]) -> anyhow::Result<()> {
        self.buffer.extend_from_slice(chunk);
        Ok(())
    }

    async fn commit(self: Box<Self>, metadata: &MetadataChanges) -> anyhow::Result<RemoteNode> {
        let SqliteContentWriter {
            pool,
            target,
            buffer,
        } = *self;
        let size = i64::try_from(buffer.len()).context("Content too large")?;
        let now = now_rfc3339();
        let mut tx = pool.begin().await?;

        let id = match target {
            WriteTarget::New(parent) => {
                let id = RemoteId::generate();
                sqlx::query(
                    "INSERT INTO nodes (id, parent_id, title, kind, marker, mime_type, size_bytes, \
                     revision, content, created_at, modified_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
                )
                .bind(id.as_str())
                .bind(parent.as_str())
                .bind(metadata.title.as_deref().unwrap_or_default())
                .bind(kind_to_str(NodeKind::File))
                .bind(marker_value(&metadata.marker, None))
                .bind(metadata.mime_type.as_deref())
                .bind(size)
                .bind(&buffer)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .context("Failed to insert file node")?;
                id
            }
            WriteTarget::Existing(id) => {
                let row = sqlx::query("SELECT * FROM nodes WHERE id = ?")
                    .bind(id.as_str())
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?;
                let mut node = node_from_row(&row)?;
                node.apply(metadata);

                sqlx::query(
                    "UPDATE nodes SET content = ?, size_bytes = ?, revision = revision + 1 \
                     WHERE id = ?",
                )
                .bind(&buffer)
                .bind(size)
                .bind(id.as_str())
                .execute(&mut *tx)
                .await
                .context("Failed to replace file content")?;
                write_metadata(&mut *tx, &node).await?;
                id
            }
        };

        let row = sqlx::query("SELECT * FROM nodes WHERE id = ?")
            .bind(id.as_str())
            .fetch_one(&mut *tx)
            .await?;
        let node = node_from_row(&row)?;
        tx.commit().await.context("Failed to commit file content")?;

        debug!(remote_id = %node.id(), bytes = size, "File content committed");
        Ok(node)
    }
}
