//! Progress reporting port (driven/secondary port)
//!
//! This module defines the events a backup run emits and the interface
//! of the presentation layer that receives them. Rendering (terminal
//! output, desktop notifications, logs) is entirely up to the adapter.
//!
//! ## Design Notes
//!
//! - Reporting is synchronous and infallible: a broken presentation layer
//!   must never fail a backup.
//! - One event is emitted per state transition; adapters that want
//!   throttling do it themselves.

use serde::{Deserialize, Serialize};

use crate::domain::newtypes::RunId;
use crate::domain::run::RunStatus;

/// A state transition of a backup run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// The run has started
    RunStarted {
        run_id: RunId,
        manual: bool,
    },
    /// A backup-list entry or a file is being processed
    ItemProgress {
        name: String,
    },
    /// An item failed; `fatal` errors end the run
    ItemError {
        message: String,
        fatal: bool,
    },
    /// The run has settled its terminal status
    RunFinished {
        run_id: RunId,
        status: RunStatus,
    },
}

impl std::fmt::Display for RunEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunEvent::RunStarted { manual: true, .. } => write!(f, "Backup started"),
            RunEvent::RunStarted { manual: false, .. } => write!(f, "Scheduled backup started"),
            RunEvent::ItemProgress { name } => write!(f, "Processing {}", name),
            RunEvent::ItemError { message, .. } => write!(f, "Error: {}", message),
            RunEvent::RunFinished { status, .. } => write!(f, "{}", status),
        }
    }
}

/// Port trait for the presentation layer of a backup run
pub trait IProgressReporter: Send + Sync {
    /// Receives one run event
    fn report(&self, event: &RunEvent);
}

/// Reporter that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl IProgressReporter for NoopReporter {
    fn report(&self, _event: &RunEvent) {}
}
