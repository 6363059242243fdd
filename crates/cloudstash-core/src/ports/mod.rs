//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Hierarchical remote object store (folders, files, markers)
//! - [`IFingerprintStore`] - Persistent storage for content fingerprints
//! - [`ILocalFileSystem`] - Local source tree access and hashing
//! - [`IProgressReporter`] - Run progress presentation

pub mod fingerprint_store;
pub mod local_filesystem;
pub mod progress;
pub mod remote_store;

pub use fingerprint_store::IFingerprintStore;
pub use local_filesystem::{ContentReader, FileSystemState, ILocalFileSystem};
pub use progress::{IProgressReporter, NoopReporter, RunEvent};
pub use remote_store::{ConnectResult, IContentWriter, IRemoteStore};
