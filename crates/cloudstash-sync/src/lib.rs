//! Cloudstash Sync - backup engine and local adapters
//!
//! Provides:
//! - The tree-walking backup engine
//! - A trigger surface with single-run enforcement and cancellation
//! - Local filesystem and fingerprint-store adapters
//!
//! ## Modules
//!
//! - [`engine`] - Backup list traversal and upload orchestration
//! - [`runner`] - Spawns runs on tokio tasks, rejects concurrent starts
//! - [`filesystem`] - Local filesystem adapter (MD5 fingerprints)
//! - [`fingerprints`] - `<name>.md5` fingerprint files
//! - [`reporter`] - Progress reporter backed by `tracing`

pub mod engine;
pub mod filesystem;
pub mod fingerprints;
pub mod reporter;
pub mod runner;

pub use engine::BackupEngine;
pub use filesystem::LocalFileSystemAdapter;
pub use fingerprints::FileFingerprintStore;
pub use reporter::TracingReporter;
pub use runner::{BackupRunner, RunHandle};
