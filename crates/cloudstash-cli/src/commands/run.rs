//! Run command - Back up the backup list
//!
//! Provides the `cloudstash run` CLI command which:
//! 1. Loads and validates configuration
//! 2. Opens the remote store and wires the local adapters
//! 3. Starts a run through the `BackupRunner` and streams progress
//! 4. Turns Ctrl-C into a cooperative cancellation request
//! 5. Prints the run summary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use cloudstash_core::config::{expand_home, Config};
use cloudstash_core::domain::{BackupRun, RunStatus};
use cloudstash_core::ports::{IProgressReporter, RunEvent};
use cloudstash_core::usecases::SyncSession;
use cloudstash_sync::{
    BackupEngine, BackupRunner, FileFingerprintStore, LocalFileSystemAdapter, TracingReporter,
};

use super::{open_store, CommandContext};
use crate::output::{plural, OutputFormatter};

/// Back up every entry of the backup list
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Backup list to use instead of `backup.list_file`
    #[arg(long)]
    pub list: Option<PathBuf>,

    /// Report the run as scheduled rather than user-triggered
    #[arg(long)]
    pub scheduled: bool,
}

/// Prints run events as they happen, in human format
struct ConsoleReporter {
    formatter: Box<dyn OutputFormatter>,
}

impl IProgressReporter for ConsoleReporter {
    fn report(&self, event: &RunEvent) {
        TracingReporter.report(event);
        match event {
            RunEvent::RunStarted { .. } | RunEvent::ItemProgress { .. } => {
                self.formatter.info(&event.to_string())
            }
            RunEvent::ItemError { message, fatal: true } => self.formatter.error(message),
            RunEvent::ItemError { message, fatal: false } => self.formatter.warn(message),
            RunEvent::RunFinished { .. } => {}
        }
    }
}

impl RunCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;

        let errors = config.validate();
        if !errors.is_empty() {
            for error in &errors {
                formatter.error(&error.to_string());
            }
            bail!(
                "Invalid configuration in {}",
                ctx.config_path().display()
            );
        }

        let (_pool, store) = open_store(&config).await?;
        let local = Arc::new(LocalFileSystemAdapter::new());
        let session = Arc::new(SyncSession::new(
            Arc::new(store),
            local.clone(),
            config.remote.root_name.clone(),
            config.chunk_size_bytes(),
        ));
        let engine = BackupEngine::new(
            Arc::clone(&session),
            local,
            Arc::new(FileFingerprintStore::new(expand_home(&config.state.hashes_dir))),
            expand_home(&config.backup.source_root),
        );

        let list_file = self
            .list
            .clone()
            .unwrap_or_else(|| expand_home(&config.backup.list_file));
        let reporter: Arc<dyn IProgressReporter> = if ctx.format.is_json() {
            Arc::new(TracingReporter)
        } else {
            Arc::new(ConsoleReporter {
                formatter: ctx.formatter(),
            })
        };

        info!(list_file = %list_file.display(), scheduled = self.scheduled, "Starting backup");
        let runner = BackupRunner::new(Arc::new(engine), list_file, reporter);
        let handle = runner.start_run(!self.scheduled)?;

        let wait = handle.wait();
        tokio::pin!(wait);
        let run = tokio::select! {
            run = &mut wait => run?,
            _ = tokio::signal::ctrl_c() => {
                runner.request_cancel();
                formatter.warn("Cancelling after the current item...");
                wait.await?
            }
        };

        session.disconnect().await?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&run)?);
        } else {
            print_summary(formatter.as_ref(), &run, &config);
        }

        match run.status() {
            RunStatus::Error(_) => bail!("Backup run failed"),
            _ => Ok(()),
        }
    }
}

fn print_summary(formatter: &dyn OutputFormatter, run: &BackupRun, config: &Config) {
    match run.status() {
        RunStatus::Success if run.files_uploaded() == 0 => {
            formatter.success("Backup completed, already up to date")
        }
        RunStatus::Error(message) => formatter.error(message),
        RunStatus::Canceled => formatter.warn(&run.status().to_string()),
        status => formatter.success(&status.to_string()),
    }

    let duration_ms = run.duration().num_milliseconds();
    let duration = if duration_ms >= 1000 {
        format!("{:.1}s", duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", duration_ms)
    };

    formatter.info(&format!("Remote root: {}", config.remote.root_name));
    formatter.info(&format!(
        "Uploaded:   {} file{} ({} bytes)",
        run.files_uploaded(),
        plural(run.files_uploaded()),
        run.bytes_uploaded()
    ));
    formatter.info(&format!(
        "Unchanged:  {} file{}",
        run.files_unchanged(),
        plural(run.files_unchanged())
    ));
    formatter.info(&format!(
        "Folders:    {}",
        run.folders_resolved()
    ));
    formatter.info(&format!("Duration:   {}", duration));

    let failures = run.errors().len() as u64;
    if failures > 0 {
        formatter.info(&format!("{} error{}:", failures, plural(failures)));
        for err in run.errors() {
            match err.path() {
                Some(path) => formatter.info(&format!("  - {}: {}", path.display(), err.message())),
                None => formatter.info(&format!("  - {}", err.message())),
            }
        }
    }
}
