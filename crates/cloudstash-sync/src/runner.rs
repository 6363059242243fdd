//! Backup runner - the trigger surface of the engine
//!
//! The [`BackupRunner`] starts runs on a dedicated tokio task so the
//! caller never blocks, and enforces that at most one run executes at a
//! time. A second start while a run is active is rejected, not queued.
//!
//! ```text
//! start_run() ──→ tokio::spawn ──→ BackupEngine::run_list_file ──→ RunHandle::wait()
//!      │                                   ▲
//!  running flag              request_cancel() ── CancellationToken
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cloudstash_core::domain::{BackupError, BackupRun};
use cloudstash_core::ports::IProgressReporter;

use crate::engine::BackupEngine;

/// Starts and cancels backup runs
pub struct BackupRunner {
    engine: Arc<BackupEngine>,
    list_file: PathBuf,
    reporter: Arc<dyn IProgressReporter>,
    /// Set while a run task is alive
    running: Arc<AtomicBool>,
    /// Token of the current (or most recent) run
    cancel: Mutex<CancellationToken>,
}

/// Handle to a run in progress
pub struct RunHandle {
    task: JoinHandle<BackupRun>,
    cancel: CancellationToken,
}

impl RunHandle {
    /// Requests cooperative cancellation of this run
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the run to settle and returns its record
    ///
    /// # Errors
    /// Returns an error if the run task panicked or was aborted
    pub async fn wait(self) -> anyhow::Result<BackupRun> {
        Ok(self.task.await?)
    }
}

/// Clears the running flag when the run task ends, however it ends
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BackupRunner {
    /// Creates a new runner
    ///
    /// # Arguments
    /// * `engine` - Engine that executes the runs
    /// * `list_file` - Backup list read at the start of every run
    /// * `reporter` - Receives the progress events of every run
    pub fn new(
        engine: Arc<BackupEngine>,
        list_file: impl Into<PathBuf>,
        reporter: Arc<dyn IProgressReporter>,
    ) -> Self {
        Self {
            engine,
            list_file: list_file.into(),
            reporter,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Returns true while a run is executing
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts a run on a new task
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns [`BackupError::AlreadyRunning`] if a run is in progress
    pub fn start_run(&self, manual: bool) -> Result<RunHandle, BackupError> {
        // The flag flips and the token is swapped under one lock, so a
        // concurrent request_cancel always reaches the new run's token.
        let mut current = self.cancel.lock().unwrap_or_else(|p| p.into_inner());
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Backup run requested while another is in progress");
            return Err(BackupError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        *current = token.clone();
        drop(current);

        let guard = RunningGuard(Arc::clone(&self.running));
        let engine = Arc::clone(&self.engine);
        let reporter = Arc::clone(&self.reporter);
        let list_file = self.list_file.clone();
        let run_token = token.clone();

        let task = tokio::spawn(async move {
            let _guard = guard;
            engine
                .run_list_file(&list_file, manual, &run_token, reporter.as_ref())
                .await
        });
        debug!(manual, list_file = %self.list_file.display(), "Backup task spawned");

        Ok(RunHandle {
            task,
            cancel: token,
        })
    }

    /// Requests cancellation of the current run
    ///
    /// Returns false if no run is executing.
    pub fn request_cancel(&self) -> bool {
        let current = self.cancel.lock().unwrap_or_else(|p| p.into_inner());
        if !self.is_running() {
            return false;
        }
        info!("Backup cancellation requested");
        current.cancel();
        true
    }
}
