//! Domain entities and business logic
//!
//! This module contains the core domain types for Cloudstash:
//! - Newtypes for type-safe identifiers and content fingerprints
//! - Backup list entries and their parser
//! - Remote node metadata and change sets
//! - Backup run tracking
//! - Domain-specific error types

pub mod backup_entry;
pub mod errors;
pub mod mime;
pub mod newtypes;
pub mod remote_node;
pub mod run;

// Re-export commonly used types
pub use backup_entry::{parse_backup_list, BackupEntry, BackupLine};
pub use errors::{BackupError, DomainError};
pub use mime::{mime_type_for, DEFAULT_MIME_TYPE};
pub use newtypes::*;
pub use remote_node::{MarkerChange, MetadataChanges, NodeKind, RemoteNode};
pub use run::{BackupRun, RunItemError, RunStatus};
