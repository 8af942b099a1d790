pub mod backoff;
pub mod controller;
pub mod scheduler;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CycleError;

pub use backoff::Backoff;
pub use controller::RefreshHandle;
pub use scheduler::{RefreshScheduler, SchedulerReport};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SchedulerStatus {
    Idle,
    Running,
    Stopped,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        SchedulerStatus::Idle
    }
}

/// What a successful tick produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub readings: usize,
    pub rejected: usize,
    pub latest: Option<DateTime<Utc>>,
}

/// One fetch-normalize-publish pass.
pub trait RefreshCycle: Send + Sync + 'static {
    fn run_cycle(&self) -> impl Future<Output = Result<CycleOutcome, CycleError>> + Send;
}
