//! Progress reporter that writes run events to the tracing log

use tracing::{error, info, warn};

use cloudstash_core::domain::RunStatus;
use cloudstash_core::ports::{IProgressReporter, RunEvent};

/// Logs every run event at a level matching its severity
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl TracingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IProgressReporter for TracingReporter {
    fn report(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { run_id, manual } => {
                info!(run_id = %run_id, manual, "{}", event)
            }
            RunEvent::ItemProgress { name } => info!(item = %name, "{}", event),
            RunEvent::ItemError { fatal: true, .. } => error!("{}", event),
            RunEvent::ItemError { fatal: false, .. } => warn!("{}", event),
            RunEvent::RunFinished { run_id, status } => match status {
                RunStatus::Error(_) => error!(run_id = %run_id, "{}", event),
                _ => info!(run_id = %run_id, "{}", event),
            },
        }
    }
}
