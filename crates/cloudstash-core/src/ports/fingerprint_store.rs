//! Fingerprint store port (driven/secondary port)
//!
//! This module defines the interface for persisting the last-seen content
//! fingerprint of every backed-up file.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - Fingerprints are keyed by the file's base name only. Two files with
//!   the same name in different directories share one slot; when their
//!   contents differ, every run sees the other's digest and re-uploads both.

use crate::domain::newtypes::Fingerprint;

/// Port trait for fingerprint persistence
#[async_trait::async_trait]
pub trait IFingerprintStore: Send + Sync {
    /// Loads the stored fingerprint for `file_name`
    ///
    /// # Returns
    /// `None` when no fingerprint has been recorded yet, or when the
    /// recorded value is unreadable as a 16-byte digest
    async fn load(&self, file_name: &str) -> anyhow::Result<Option<Fingerprint>>;

    /// Stores `fingerprint` for `file_name`, replacing any previous value
    async fn save(&self, file_name: &str, fingerprint: &Fingerprint) -> anyhow::Result<()>;
}
