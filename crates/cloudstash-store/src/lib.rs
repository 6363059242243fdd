//! Cloudstash Store - SQLite remote object store
//!
//! A hierarchical object store kept in a single SQLite database:
//! - Folder and file nodes with a parent pointer
//! - An application-private marker property per node
//! - A user-side trash flag
//! - File content as a blob with a revision counter
//!
//! ## Architecture
//!
//! This crate implements the `IRemoteStore` port from `cloudstash-core`.
//! It is a driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteRemoteStore`] - Full `IRemoteStore` implementation
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use cloudstash_store::{DatabasePool, SqliteRemoteStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/cloudstash/remote.db")).await?;
//! let store = SqliteRemoteStore::new(pool.pool().clone());
//! // Use store as IRemoteStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod store;

pub use pool::DatabasePool;
pub use store::{SqliteRemoteStore, TreeEntry, ROOT_ID};

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row could not be mapped to a domain type
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A request was made before `connect`
    #[error("Store is not connected")]
    NotConnected,

    /// No node has the given ID
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The node exists but is not a folder
    #[error("Node is not a folder: {0}")]
    NotAFolder(String),

    /// The node exists but is not a file
    #[error("Node is not a file: {0}")]
    NotAFile(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
