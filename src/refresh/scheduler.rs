use anyhow::{bail, Result};
use log::debug;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{backoff::Backoff, RefreshCycle, SchedulerStatus};

// Set to false to silence per-tick logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Totals of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub ticks: u64,
    pub failures: u64,
}

/// Drives refresh cycles: Idle → Running → (tick)* → Stopped.
///
/// The first cycle runs as soon as the scheduler starts. The wait is measured
/// from the end of one cycle to the start of the next, so a slow store
/// stretches the period instead of causing back-to-back ticks.
pub struct RefreshScheduler {
    backoff: Backoff,
    cancel_token: CancellationToken,
    status: watch::Sender<SchedulerStatus>,
}

impl RefreshScheduler {
    pub fn new(backoff: Backoff, cancel_token: CancellationToken) -> Self {
        let (status, _) = watch::channel(SchedulerStatus::Idle);
        Self {
            backoff,
            cancel_token,
            status,
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.subscribe()
    }

    /// Runs until the cancellation token fires. Only an idle scheduler can
    /// run; a stopped one stays stopped.
    pub async fn run<C: RefreshCycle>(&mut self, cycle: &C) -> Result<SchedulerReport> {
        if self.status() != SchedulerStatus::Idle {
            bail!("refresh scheduler is {:?}, not idle", self.status());
        }
        self.status.send_replace(SchedulerStatus::Running);
        log_info!(
            "refresh loop started, polling every {:?}",
            self.backoff.interval()
        );

        let mut report = SchedulerReport::default();

        loop {
            if self.cancel_token.is_cancelled() {
                break;
            }

            let result = tokio::select! {
                result = cycle.run_cycle() => result,
                _ = self.cancel_token.cancelled() => break,
            };
            report.ticks += 1;

            match result {
                Ok(outcome) => {
                    if self.backoff.consecutive_failures() > 0 {
                        log_info!(
                            "store recovered after {} failed ticks",
                            self.backoff.consecutive_failures()
                        );
                    }
                    self.backoff.record_success();
                    debug!(
                        "tick {}: {} readings, {} rejected",
                        report.ticks,
                        outcome.readings,
                        outcome.rejected
                    );
                }
                Err(err) => {
                    report.failures += 1;
                    self.backoff.record_failure();
                    log_error!(
                        "tick {} failed ({} in a row), keeping previous window: {err}",
                        report.ticks,
                        self.backoff.consecutive_failures()
                    );
                }
            }

            let delay = self.backoff.next_delay();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel_token.cancelled() => break,
            }
        }

        self.status.send_replace(SchedulerStatus::Stopped);
        log_info!(
            "refresh loop stopped after {} ticks ({} failed)",
            report.ticks,
            report.failures
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use tokio::time::Instant;

    use crate::{
        error::{CycleError, FetchError},
        refresh::CycleOutcome,
    };

    /// Cycle that records when it ran and cancels after `stop_after` ticks.
    struct CountingCycle {
        started: Mutex<Vec<Instant>>,
        fail_on: Vec<usize>,
        work: Duration,
        stop_after: usize,
        cancel: CancellationToken,
    }

    impl CountingCycle {
        fn new(stop_after: usize, cancel: CancellationToken) -> Self {
            Self {
                started: Mutex::new(Vec::new()),
                fail_on: Vec::new(),
                work: Duration::ZERO,
                stop_after,
                cancel,
            }
        }

        fn starts(&self) -> Vec<Instant> {
            self.started.lock().unwrap().clone()
        }
    }

    impl RefreshCycle for CountingCycle {
        async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
            let tick = {
                let mut started = self.started.lock().unwrap();
                started.push(Instant::now());
                started.len()
            };
            tokio::time::sleep(self.work).await;
            if tick >= self.stop_after {
                self.cancel.cancel();
            }
            if self.fail_on.contains(&tick) {
                return Err(FetchError::unavailable("down").into());
            }
            Ok(CycleOutcome::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_runs_immediately() {
        let cancel = CancellationToken::new();
        let cycle = CountingCycle::new(1, cancel.clone());
        let mut scheduler = RefreshScheduler::new(Backoff::fixed(Duration::from_secs(2)), cancel);
        let started = Instant::now();

        let report = scheduler.run(&cycle).await.unwrap();

        assert_eq!(report, SchedulerReport { ticks: 1, failures: 0 });
        assert_eq!(cycle.starts()[0], started);
        assert_eq!(scheduler.status(), SchedulerStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_runs_from_end_of_previous_cycle() {
        let cancel = CancellationToken::new();
        let mut cycle = CountingCycle::new(3, cancel.clone());
        cycle.work = Duration::from_millis(500);
        let mut scheduler = RefreshScheduler::new(Backoff::fixed(Duration::from_secs(2)), cancel);

        scheduler.run(&cycle).await.unwrap();

        let starts = cycle.starts();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::from_millis(2500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_counted_and_survived() {
        let cancel = CancellationToken::new();
        let mut cycle = CountingCycle::new(4, cancel.clone());
        cycle.fail_on = vec![2, 3];
        let mut scheduler = RefreshScheduler::new(
            Backoff::new(Duration::from_secs(2), Duration::from_secs(30), 2.0, 0.0),
            cancel,
        );

        let report = scheduler.run(&cycle).await.unwrap();

        assert_eq!(report, SchedulerReport { ticks: 4, failures: 2 });
        let starts = cycle.starts();
        let gaps: Vec<_> = starts.windows(2).map(|p| p[1] - p[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_sleep_stops_within_one_interval() {
        let cancel = CancellationToken::new();
        let cycle = CountingCycle::new(usize::MAX, cancel.clone());
        let mut scheduler =
            RefreshScheduler::new(Backoff::fixed(Duration::from_secs(2)), cancel.clone());
        let mut status = scheduler.watch_status();

        let run = async { scheduler.run(&cycle).await };
        let stop = async {
            status
                .wait_for(|s| *s == SchedulerStatus::Running)
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(4500)).await;
            cancel.cancel();
            Instant::now()
        };
        let (report, cancelled_at) = tokio::join!(run, stop);

        assert_eq!(report.unwrap().ticks, 3);
        assert!(Instant::now() - cancelled_at < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_a_slow_cycle_abandons_it() {
        let cancel = CancellationToken::new();
        let mut cycle = CountingCycle::new(usize::MAX, cancel.clone());
        cycle.work = Duration::from_secs(5);
        let mut scheduler =
            RefreshScheduler::new(Backoff::fixed(Duration::from_secs(2)), cancel.clone());
        let started = Instant::now();

        let run = async { scheduler.run(&cycle).await };
        let stop = async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            cancel.cancel();
            Instant::now()
        };
        let (report, cancelled_at) = tokio::join!(run, stop);

        assert_eq!(report.unwrap(), SchedulerReport { ticks: 0, failures: 0 });
        assert!(Instant::now() - cancelled_at < Duration::from_millis(1));
        assert_eq!(cycle.starts(), vec![started]);
        assert_eq!(scheduler.status(), SchedulerStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_runs_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let cycle = CountingCycle::new(usize::MAX, cancel.clone());
        let mut scheduler = RefreshScheduler::new(Backoff::fixed(Duration::from_secs(2)), cancel);

        let report = scheduler.run(&cycle).await.unwrap();

        assert_eq!(report.ticks, 0);
        assert!(cycle.starts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_scheduler_cannot_run_again() {
        let cancel = CancellationToken::new();
        let cycle = CountingCycle::new(1, cancel.clone());
        let mut scheduler = RefreshScheduler::new(Backoff::fixed(Duration::from_secs(2)), cancel);
        scheduler.run(&cycle).await.unwrap();

        assert!(scheduler.run(&cycle).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn shared_cycles_work_through_arc() {
        let cancel = CancellationToken::new();
        let cycle = Arc::new(CountingCycle::new(2, cancel.clone()));
        let mut scheduler = RefreshScheduler::new(Backoff::fixed(Duration::from_secs(1)), cancel);

        let report = scheduler.run(cycle.as_ref()).await.unwrap();

        assert_eq!(report.ticks, 2);
    }
}
