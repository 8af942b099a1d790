use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Backoff, RefreshCycle, RefreshScheduler, SchedulerReport};

/// Owns the background refresh task: start spawns the scheduler, stop
/// cancels it and waits for the loop to wind down.
pub struct RefreshHandle {
    handle: Option<JoinHandle<Result<SchedulerReport>>>,
    cancel_token: Option<CancellationToken>,
}

impl RefreshHandle {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// `parent` lets process-wide shutdown reach the loop as well.
    pub fn start<C: RefreshCycle>(
        &mut self,
        cycle: Arc<C>,
        backoff: Backoff,
        parent: &CancellationToken,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("refresh already active");
        }

        let cancel_token = parent.child_token();
        let mut scheduler = RefreshScheduler::new(backoff, cancel_token.clone());
        let handle = tokio::spawn(async move { scheduler.run(cycle.as_ref()).await });

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Waits for the loop to end on its own, e.g. after the parent token fired.
    pub async fn join(&mut self) -> Result<SchedulerReport> {
        match self.handle.take() {
            Some(handle) => {
                self.cancel_token = None;
                handle.await.context("refresh loop task failed to join")?
            }
            None => Ok(SchedulerReport::default()),
        }
    }

    pub async fn stop(&mut self) -> Result<SchedulerReport> {
        if let Some(token) = self.cancel_token.take() {
            info!("Stopping refresh loop");
            token.cancel();
        }
        self.join().await
    }
}

impl Default for RefreshHandle {
    fn default() -> Self {
        Self::new()
    }
}
