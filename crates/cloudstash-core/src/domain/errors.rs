//! Domain error types
//!
//! This module defines error types specific to domain operations:
//! validation failures on domain values, and the error taxonomy of a
//! backup run together with the rule deciding which failures abort a run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when constructing domain values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid fingerprint (expected 16 raw bytes or 32 hex characters)
    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

/// Errors raised while executing a backup run
///
/// Every variant carries enough context (line, path or node name) to be
/// surfaced verbatim as the terminal status of a run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackupError {
    /// A backup-list line could not be parsed
    #[error("Could not parse line {line} of the backup list: {message}")]
    ConfigParse {
        /// 1-based line number
        line: usize,
        /// Parser diagnostic
        message: String,
    },

    /// A backup-list entry does not exist below the source root
    #[error("Could not find file/directory '{path}' specified on line {line} of the backup list")]
    MissingPath {
        /// 1-based line number
        line: usize,
        /// The path as written on that line
        path: String,
    },

    /// The remote store refused the connection
    #[error("Error connecting to the remote store: {0}")]
    RemoteConnect(String),

    /// The remote store rejected a children query or an open for write
    #[error("Remote query for '{name}' failed: {message}")]
    RemoteQuery {
        /// Base name of the folder or file being resolved
        name: String,
        /// Transport diagnostic
        message: String,
    },

    /// The remote store failed to create a node or commit new contents
    #[error("Remote create for '{name}' failed: {message}")]
    RemoteCreate {
        /// Base name of the folder or file being created
        name: String,
        /// Transport diagnostic
        message: String,
    },

    /// The content digest could not be computed
    #[error("Could not fingerprint {}: {message}", path.display())]
    Hash {
        /// Local file being digested
        path: PathBuf,
        /// Underlying I/O diagnostic
        message: String,
    },

    /// Local read/write failure (source file or fingerprint store)
    #[error("Local I/O error on {}: {message}", path.display())]
    LocalIo {
        /// Path involved in the failed operation
        path: PathBuf,
        /// Underlying I/O diagnostic
        message: String,
    },

    /// A path is neither a regular file nor a directory
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// A run was requested while another one is in progress
    #[error("A backup run is already in progress")]
    AlreadyRunning,
}

impl BackupError {
    /// Returns true if this error aborts the whole run
    ///
    /// Remote query and create failures only skip the folder subtree or
    /// the single file they occurred on. Everything else stops the walk.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            BackupError::RemoteQuery { .. } | BackupError::RemoteCreate { .. }
        )
    }

    /// Returns true for errors caused by the backup list itself
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BackupError::ConfigParse { .. } | BackupError::MissingPath { .. }
        )
    }
}
