//! Change detection use case
//!
//! Decides whether a local file must be re-uploaded by comparing its
//! current content fingerprint with the one recorded on the previous run.
//! Every positive answer records the new fingerprint before returning,
//! so a change is reported exactly once.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::BackupError;
use crate::ports::{IFingerprintStore, ILocalFileSystem};

/// Use case for fingerprint-based change detection
pub struct ChangeDetector {
    local_filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
    fingerprints: Arc<dyn IFingerprintStore + Send + Sync>,
}

impl ChangeDetector {
    /// Creates a new ChangeDetector
    pub fn new(
        local_filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
        fingerprints: Arc<dyn IFingerprintStore + Send + Sync>,
    ) -> Self {
        Self {
            local_filesystem,
            fingerprints,
        }
    }

    /// Returns true if `file` changed since its fingerprint was last recorded
    ///
    /// A file with no recorded fingerprint counts as changed. When the
    /// answer is true the fresh fingerprint has already been stored.
    ///
    /// # Errors
    ///
    /// - [`BackupError::Hash`] if the file cannot be read while digesting
    /// - [`BackupError::LocalIo`] if the fingerprint store fails
    #[instrument(skip(self), fields(path = %file.display()))]
    pub async fn has_changed(&self, file: &Path) -> Result<bool, BackupError> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BackupError::FileNotFound(file.to_path_buf()))?;

        let current = self
            .local_filesystem
            .compute_fingerprint(file)
            .await
            .map_err(|e| BackupError::Hash {
                path: file.to_path_buf(),
                message: format!("{e:#}"),
            })?;

        let stored = self
            .fingerprints
            .load(&name)
            .await
            .map_err(|e| BackupError::LocalIo {
                path: file.to_path_buf(),
                message: format!("{e:#}"),
            })?;

        if stored.as_ref() == Some(&current) {
            debug!(fingerprint = %current, "Fingerprint unchanged");
            return Ok(false);
        }

        self.fingerprints
            .save(&name, &current)
            .await
            .map_err(|e| BackupError::LocalIo {
                path: file.to_path_buf(),
                message: format!("{e:#}"),
            })?;

        debug!(
            fingerprint = %current,
            previous = ?stored.map(|fp| fp.to_hex()),
            "Fingerprint changed"
        );
        Ok(true)
    }
}
