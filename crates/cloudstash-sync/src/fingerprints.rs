//! File-backed fingerprint store
//!
//! One file per backed-up base name, `<dir>/<file_name>.md5`, holding the
//! raw 16-byte digest.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use cloudstash_core::domain::Fingerprint;
use cloudstash_core::ports::IFingerprintStore;

/// Extension appended to the base name of every fingerprint file
const FINGERPRINT_EXTENSION: &str = "md5";

/// Fingerprint store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FileFingerprintStore {
    dir: PathBuf,
}

impl FileFingerprintStore {
    /// Creates a store below `dir`; the directory is created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot(&self, file_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_name, FINGERPRINT_EXTENSION))
    }
}

#[async_trait::async_trait]
impl IFingerprintStore for FileFingerprintStore {
    async fn load(&self, file_name: &str) -> anyhow::Result<Option<Fingerprint>> {
        let slot = self.slot(file_name);
        let bytes = match tokio::fs::read(&slot).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read fingerprint {}", slot.display()))
            }
        };

        match Fingerprint::from_slice(&bytes) {
            Ok(fingerprint) => Ok(Some(fingerprint)),
            Err(_) => {
                warn!(
                    path = %slot.display(),
                    len = bytes.len(),
                    "Ignoring malformed fingerprint file"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, file_name: &str, fingerprint: &Fingerprint) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let slot = self.slot(file_name);
        tokio::fs::write(&slot, fingerprint.as_bytes())
            .await
            .with_context(|| format!("Failed to write fingerprint {}", slot.display()))?;
        debug!(path = %slot.display(), fingerprint = %fingerprint, "Fingerprint saved");
        Ok(())
    }
}
