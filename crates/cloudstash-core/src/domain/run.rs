//! BackupRun domain entity
//!
//! This module defines the BackupRun entity which tracks the state and
//! progress of a single execution of the backup list. Runs are transient:
//! they live for one execution and are reported, never persisted.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::BackupError;
use super::newtypes::RunId;

/// Status of a backup run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is currently walking the backup list
    Running,
    /// Every entry was processed without error
    Success,
    /// Run ended with an error message (the most recent one)
    Error(String),
    /// Run observed a cancellation request and stopped
    Canceled,
}

impl RunStatus {
    /// Returns true if the run is still in progress
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    /// Returns true if the run has finished (successfully or not)
    pub fn is_finished(&self) -> bool {
        !self.is_running()
    }

    /// Returns true if the run completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }

    /// Returns true if the run ended with an error
    pub fn is_error(&self) -> bool {
        matches!(self, RunStatus::Error(_))
    }
}

impl Default for RunStatus {
    fn default() -> Self {
        RunStatus::Running
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Success => write!(f, "Backup completed"),
            RunStatus::Error(msg) => write!(f, "Error: {}", msg),
            RunStatus::Canceled => write!(f, "Backup job canceled"),
        }
    }
}

/// An error recorded against a single item of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunItemError {
    /// Local path the error occurred on, if any
    path: Option<PathBuf>,
    /// Human-readable error message
    message: String,
    /// Whether the error aborted the run
    fatal: bool,
    /// When the error occurred
    timestamp: DateTime<Utc>,
}

impl RunItemError {
    /// Records `error` as it occurred on `path`
    pub fn new(path: Option<&Path>, error: &BackupError) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            message: error.to_string(),
            fatal: error.is_fatal(),
            timestamp: Utc::now(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Represents one execution of the backup list
///
/// A BackupRun records the list line being processed, per-item counters,
/// every error encountered and the terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRun {
    /// Unique identifier for this run
    id: RunId,
    /// True if a user triggered the run, false for scheduled runs
    manual: bool,
    /// When the run started
    started_at: DateTime<Utc>,
    /// When the run finished (None if still running)
    completed_at: Option<DateTime<Utc>>,
    /// Current status of the run
    status: RunStatus,
    /// 1-based backup-list line currently being processed
    current_line: Option<usize>,
    /// Backup-list entries started
    entries_processed: u64,
    /// Remote folders resolved (reused or created)
    folders_resolved: u64,
    /// Local files fingerprinted
    files_checked: u64,
    /// Files whose content was sent to the remote store
    files_uploaded: u64,
    /// Files skipped because their fingerprint was unchanged
    files_unchanged: u64,
    /// Bytes sent to the remote store
    bytes_uploaded: u64,
    /// Errors encountered during the run
    errors: Vec<RunItemError>,
}

impl BackupRun {
    /// Creates a new BackupRun in Running state with zero counters
    ///
    /// # Arguments
    /// * `manual` - Whether a user (rather than the scheduler) triggered the run
    pub fn new(manual: bool) -> Self {
        Self {
            id: RunId::new(),
            manual,
            started_at: Utc::now(),
            completed_at: None,
            status: RunStatus::Running,
            current_line: None,
            entries_processed: 0,
            folders_resolved: 0,
            files_checked: 0,
            files_uploaded: 0,
            files_unchanged: 0,
            bytes_uploaded: 0,
            errors: Vec::new(),
        }
    }

    // --- Getters ---

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    pub fn current_line(&self) -> Option<usize> {
        self.current_line
    }

    pub fn entries_processed(&self) -> u64 {
        self.entries_processed
    }

    pub fn folders_resolved(&self) -> u64 {
        self.folders_resolved
    }

    pub fn files_checked(&self) -> u64 {
        self.files_checked
    }

    pub fn files_uploaded(&self) -> u64 {
        self.files_uploaded
    }

    pub fn files_unchanged(&self) -> u64 {
        self.files_unchanged
    }

    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded
    }

    pub fn errors(&self) -> &[RunItemError] {
        &self.errors
    }

    /// Message of the most recent error, if any
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(RunItemError::message)
    }

    /// Returns true if a fatal error has been recorded
    pub fn has_fatal_error(&self) -> bool {
        self.errors.iter().any(RunItemError::is_fatal)
    }

    /// Returns the duration of the run (so far or total)
    pub fn duration(&self) -> chrono::Duration {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        end - self.started_at
    }

    // --- Progress ---

    /// Marks the start of a backup-list entry
    pub fn begin_entry(&mut self, line: usize) {
        self.current_line = Some(line);
        self.entries_processed += 1;
    }

    pub fn record_folder(&mut self) {
        self.folders_resolved += 1;
    }

    pub fn record_checked(&mut self, changed: bool) {
        self.files_checked += 1;
        if !changed {
            self.files_unchanged += 1;
        }
    }

    pub fn record_upload(&mut self, bytes: u64) {
        self.files_uploaded += 1;
        self.bytes_uploaded += bytes;
    }

    /// Records an error against `path`
    pub fn record_error(&mut self, path: Option<&Path>, error: &BackupError) {
        self.errors.push(RunItemError::new(path, error));
    }

    // --- Completion ---

    /// Settles the terminal status
    ///
    /// A fatal error wins over cancellation, cancellation wins over
    /// branch-level errors, and a run with no errors succeeds.
    pub fn finish(&mut self, canceled: bool) {
        let fatal = self
            .errors
            .iter()
            .rev()
            .find(|e| e.is_fatal())
            .map(|e| e.message().to_string());
        let last = self.last_error().map(str::to_string);

        self.status = match (fatal, canceled, last) {
            (Some(msg), _, _) => RunStatus::Error(msg),
            (None, true, _) => RunStatus::Canceled,
            (None, false, Some(msg)) => RunStatus::Error(msg),
            (None, false, None) => RunStatus::Success,
        };
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch_error() -> BackupError {
        BackupError::RemoteQuery {
            name: "Photos".to_string(),
            message: "503".to_string(),
        }
    }

    mod run_status_tests {
        use super::*;

        #[test]
        fn test_is_running() {
            assert!(RunStatus::Running.is_running());
            assert!(!RunStatus::Success.is_running());
            assert!(!RunStatus::Error("x".to_string()).is_running());
            assert!(!RunStatus::Canceled.is_running());
        }

        #[test]
        fn test_display() {
            assert_eq!(RunStatus::Success.to_string(), "Backup completed");
            assert_eq!(RunStatus::Canceled.to_string(), "Backup job canceled");
            assert_eq!(
                RunStatus::Error("disk gone".to_string()).to_string(),
                "Error: disk gone"
            );
        }

        #[test]
        fn test_serialization() {
            let json = serde_json::to_string(&RunStatus::Canceled).unwrap();
            assert_eq!(json, "\"canceled\"");

            let json = serde_json::to_string(&RunStatus::Error("boom".to_string())).unwrap();
            assert_eq!(json, "{\"error\":\"boom\"}");
        }
    }

    #[test]
    fn test_new_run() {
        let run = BackupRun::new(true);
        assert!(run.is_manual());
        assert!(run.status().is_running());
        assert_eq!(run.files_uploaded(), 0);
        assert!(run.completed_at().is_none());
        assert!(run.last_error().is_none());
    }

    #[test]
    fn test_counters() {
        let mut run = BackupRun::new(false);
        run.begin_entry(3);
        run.record_folder();
        run.record_checked(true);
        run.record_upload(42);
        run.record_checked(false);

        assert_eq!(run.current_line(), Some(3));
        assert_eq!(run.entries_processed(), 1);
        assert_eq!(run.folders_resolved(), 1);
        assert_eq!(run.files_checked(), 2);
        assert_eq!(run.files_unchanged(), 1);
        assert_eq!(run.files_uploaded(), 1);
        assert_eq!(run.bytes_uploaded(), 42);
    }

    #[test]
    fn test_finish_success() {
        let mut run = BackupRun::new(true);
        run.finish(false);
        assert_eq!(run.status(), &RunStatus::Success);
        assert!(run.completed_at().is_some());
    }

    #[test]
    fn test_finish_canceled() {
        let mut run = BackupRun::new(true);
        run.record_error(None, &branch_error());
        run.finish(true);
        assert_eq!(run.status(), &RunStatus::Canceled);
    }

    #[test]
    fn test_finish_branch_error_surfaces_last_message() {
        let mut run = BackupRun::new(true);
        run.record_error(None, &branch_error());
        let last = BackupError::RemoteCreate {
            name: "b.jpg".to_string(),
            message: "quota".to_string(),
        };
        run.record_error(Some(Path::new("/p/b.jpg")), &last);
        run.finish(false);

        assert_eq!(run.status(), &RunStatus::Error(last.to_string()));
        assert!(!run.has_fatal_error());
    }

    #[test]
    fn test_finish_fatal_wins_over_cancel() {
        let mut run = BackupRun::new(true);
        let fatal = BackupError::FileNotFound(PathBuf::from("/p/x"));
        run.record_error(Some(Path::new("/p/x")), &fatal);
        run.finish(true);

        assert_eq!(run.status(), &RunStatus::Error(fatal.to_string()));
        assert!(run.has_fatal_error());
        assert_eq!(run.errors()[0].path(), Some(Path::new("/p/x")));
    }
}
