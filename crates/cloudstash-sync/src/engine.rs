//! Backup engine
//!
//! The [`BackupEngine`] executes one backup run: it reads the backup list
//! line by line, walks every entry below the source root, and mirrors
//! directories and changed files into the remote store.
//!
//! ## Run Flow
//!
//! 1. **Connect**: the session connects once; failure ends the run
//! 2. **Entries**: each list line is parsed just before it is processed;
//!    a parse failure or a missing path ends the run
//! 3. **Walk**: directories become remote folders, changed files are
//!    uploaded under the folder of their parent directory
//! 4. **Settle**: the store is asked to flush if anything was uploaded,
//!    then the terminal status is computed
//!
//! ## Error Handling
//!
//! Remote query/create failures are branch errors: the folder subtree or
//! the single file is skipped and the walk goes on. Every other error
//! aborts the run.
//!
//! ## Cancellation
//!
//! The token is observed before each entry, before each directory is
//! resolved, before each file is checked, and after each child of a
//! directory. An upload already in flight always completes.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use cloudstash_core::domain::{
    parse_backup_list, BackupError, BackupRun, RemoteNode, RunStatus,
};
use cloudstash_core::ports::{IFingerprintStore, ILocalFileSystem, IProgressReporter, RunEvent};
use cloudstash_core::usecases::{ChangeDetector, FolderResolution, SyncSession};

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BackupError>> + Send + 'a>>;

/// Orchestrates backup runs over one [`SyncSession`]
pub struct BackupEngine {
    session: Arc<SyncSession>,
    detector: ChangeDetector,
    local_filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
    source_root: PathBuf,
}

impl BackupEngine {
    /// Creates a new engine
    ///
    /// # Arguments
    ///
    /// * `session` - Remote store session, reused across runs
    /// * `local_filesystem` - Adapter for the source tree
    /// * `fingerprints` - Store of last-seen content fingerprints
    /// * `source_root` - Directory backup-list paths are relative to
    pub fn new(
        session: Arc<SyncSession>,
        local_filesystem: Arc<dyn ILocalFileSystem + Send + Sync>,
        fingerprints: Arc<dyn IFingerprintStore + Send + Sync>,
        source_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            session,
            detector: ChangeDetector::new(Arc::clone(&local_filesystem), fingerprints),
            local_filesystem,
            source_root: source_root.into(),
        }
    }

    pub fn session(&self) -> &Arc<SyncSession> {
        &self.session
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Reads the backup list at `list_file` and runs it
    ///
    /// An unreadable list file ends the run with a local I/O error.
    pub async fn run_list_file(
        &self,
        list_file: &Path,
        manual: bool,
        cancel: &CancellationToken,
        reporter: &dyn IProgressReporter,
    ) -> BackupRun {
        match tokio::fs::read_to_string(list_file).await {
            Ok(text) => self.run(&text, manual, cancel, reporter).await,
            Err(e) => {
                let mut run = self.start(manual, reporter);
                let err = BackupError::LocalIo {
                    path: list_file.to_path_buf(),
                    message: e.to_string(),
                };
                Self::record_error(&mut run, reporter, Some(list_file), &err);
                self.settle(run, cancel, reporter).await
            }
        }
    }

    /// Runs the backup list `list`
    ///
    /// Never fails: every error ends up in the returned run record and its
    /// terminal status.
    #[instrument(skip(self, list, cancel, reporter))]
    pub async fn run(
        &self,
        list: &str,
        manual: bool,
        cancel: &CancellationToken,
        reporter: &dyn IProgressReporter,
    ) -> BackupRun {
        let mut run = self.start(manual, reporter);

        if let Err(err) = self.session.connect().await {
            Self::record_error(&mut run, reporter, None, &err);
            return self.settle(run, cancel, reporter).await;
        }

        for parsed in parse_backup_list(list) {
            if cancel.is_cancelled() {
                info!("Cancellation observed between entries");
                break;
            }

            let entry = match parsed {
                Ok(entry) => entry,
                Err(err) => {
                    Self::record_error(&mut run, reporter, None, &err);
                    break;
                }
            };

            run.begin_entry(entry.line());
            let path = entry.resolve(&self.source_root);
            debug!(line = entry.line(), path = %path.display(), "Processing backup entry");

            let state = match self.local_filesystem.get_state(&path).await {
                Ok(state) => state,
                Err(e) => {
                    let err = BackupError::LocalIo {
                        path: path.clone(),
                        message: format!("{e:#}"),
                    };
                    Self::record_error(&mut run, reporter, Some(&path), &err);
                    break;
                }
            };
            if !state.exists {
                let err = BackupError::MissingPath {
                    line: entry.line(),
                    path: entry.path().to_string(),
                };
                Self::record_error(&mut run, reporter, Some(&path), &err);
                break;
            }

            reporter.report(&RunEvent::ItemProgress {
                name: display_name(&path),
            });

            if let Err(err) = self.walk(&path, None, &mut run, cancel, reporter).await {
                Self::record_error(&mut run, reporter, Some(&path), &err);
                break;
            }
        }

        self.settle(run, cancel, reporter).await
    }

    fn start(&self, manual: bool, reporter: &dyn IProgressReporter) -> BackupRun {
        let run = BackupRun::new(manual);
        info!(run_id = %run.id(), manual, "Backup run started");
        reporter.report(&RunEvent::RunStarted {
            run_id: *run.id(),
            manual,
        });
        run
    }

    async fn settle(
        &self,
        mut run: BackupRun,
        cancel: &CancellationToken,
        reporter: &dyn IProgressReporter,
    ) -> BackupRun {
        if run.files_uploaded() > 0 {
            if let Err(e) = self.session.request_sync().await {
                warn!(error = %format!("{e:#}"), "Remote store sync request failed");
            }
        }

        run.finish(cancel.is_cancelled());

        match run.status() {
            RunStatus::Error(message) => {
                warn!(run_id = %run.id(), error = %message, "Backup run failed")
            }
            status => info!(
                run_id = %run.id(),
                status = %status,
                uploaded = run.files_uploaded(),
                unchanged = run.files_unchanged(),
                folders = run.folders_resolved(),
                bytes = run.bytes_uploaded(),
                duration_ms = run.duration().num_milliseconds(),
                "Backup run finished"
            ),
        }

        reporter.report(&RunEvent::RunFinished {
            run_id: *run.id(),
            status: run.status().clone(),
        });
        run
    }

    fn record_error(
        run: &mut BackupRun,
        reporter: &dyn IProgressReporter,
        path: Option<&Path>,
        err: &BackupError,
    ) {
        let path_display = path.map(|p| p.display().to_string()).unwrap_or_default();
        if err.is_fatal() {
            error!(path = %path_display, line = ?run.current_line(), error = %err, "Backup aborted");
        } else {
            warn!(path = %path_display, error = %err, "Skipping item");
        }

        run.record_error(path, err);
        reporter.report(&RunEvent::ItemError {
            message: err.to_string(),
            fatal: err.is_fatal(),
        });
    }

    /// Mirrors `path` under `parent` (`None` is the backup root)
    ///
    /// Returns `Err` only for errors that abort the run; branch errors are
    /// recorded and swallowed here.
    fn walk<'a>(
        &'a self,
        path: &'a Path,
        parent: Option<&'a RemoteNode>,
        run: &'a mut BackupRun,
        cancel: &'a CancellationToken,
        reporter: &'a dyn IProgressReporter,
    ) -> WalkFuture<'a> {
        Box::pin(async move {
            let state = self
                .local_filesystem
                .get_state(path)
                .await
                .map_err(|e| BackupError::LocalIo {
                    path: path.to_path_buf(),
                    message: format!("{e:#}"),
                })?;

            if state.is_directory() {
                if cancel.is_cancelled() {
                    return Ok(());
                }

                let name = base_name(path)?;
                let folder = match self.session.resolve_folder(&name, parent).await {
                    Ok((folder, resolution)) => {
                        run.record_folder();
                        if resolution == FolderResolution::Created {
                            info!(name = %name, remote_id = %folder.id(), "Created remote folder");
                        }
                        folder
                    }
                    Err(err) if !err.is_fatal() => {
                        Self::record_error(run, reporter, Some(path), &err);
                        return Ok(());
                    }
                    Err(err) => return Err(err),
                };

                let children = self.local_filesystem.list_dir(path).await.map_err(|e| {
                    BackupError::LocalIo {
                        path: path.to_path_buf(),
                        message: format!("{e:#}"),
                    }
                })?;

                for child in &children {
                    self.walk(child, Some(&folder), run, cancel, reporter).await?;
                    if cancel.is_cancelled() {
                        info!(path = %path.display(), "Cancellation observed, stopping walk");
                        break;
                    }
                }
                Ok(())
            } else if state.is_regular_file() {
                if cancel.is_cancelled() {
                    return Ok(());
                }

                let changed = self.detector.has_changed(path).await?;
                run.record_checked(changed);
                if !changed {
                    debug!(path = %path.display(), "Unchanged, skipping");
                    return Ok(());
                }

                reporter.report(&RunEvent::ItemProgress {
                    name: display_name(path),
                });
                match self.session.upload_file(path, parent).await {
                    Ok(outcome) => {
                        info!(
                            path = %path.display(),
                            remote_id = %outcome.node.id(),
                            kind = ?outcome.kind,
                            bytes = outcome.bytes,
                            "Uploaded"
                        );
                        run.record_upload(outcome.bytes);
                        Ok(())
                    }
                    Err(err) if !err.is_fatal() => {
                        Self::record_error(run, reporter, Some(path), &err);
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            } else {
                Err(BackupError::FileNotFound(path.to_path_buf()))
            }
        })
    }
}

fn base_name(path: &Path) -> Result<String, BackupError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| BackupError::FileNotFound(path.to_path_buf()))
}

/// Last path component, or the whole path when there is none
fn display_name(path: &Path) -> String {
    base_name(path).unwrap_or_else(|_| path.display().to_string())
}
