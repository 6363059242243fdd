//! Use cases (interactors) for Cloudstash
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`ChangeDetector`] - Fingerprint comparison with eager recording
//! - [`NodeLocator`] - Marker lookup with trash recovery, shared by folders and files
//! - [`RemoteFolderResolver`] - Find-or-create of remote folders
//! - [`RemoteFileUploader`] - Streaming upload with overwrite-or-create
//! - [`SyncSession`] - Connection state and the cached backup root

pub mod detect_change;
pub mod locate_node;
pub mod resolve_folder;
pub mod sync_session;
pub mod upload_file;

#[cfg(test)]
pub(crate) mod test_support;

pub use detect_change::ChangeDetector;
pub use locate_node::NodeLocator;
pub use resolve_folder::{FolderResolution, RemoteFolderResolver};
pub use sync_session::SyncSession;
pub use upload_file::{RemoteFileUploader, UploadKind, UploadOutcome, DEFAULT_CHUNK_SIZE};
