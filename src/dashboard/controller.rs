use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::Utc;
use log::debug;
use tokio::sync::watch;

use crate::{
    error::{CycleError, MalformedResponseError, UnknownViewError},
    fetch::{DataWindowFetcher, ReadingStore},
    normalize::{normalize, NormalizeOptions, Window},
    presentation::{Frame, PublishReason},
    refresh::{CycleOutcome, RefreshCycle},
};

use super::{ViewSnapshot, ViewState};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// How many rejected records are spelled out in the log per tick.
const MAX_LOGGED_REJECTIONS: usize = 3;

struct PublishState {
    window: Arc<Window>,
    sequence: u64,
}

/// Owns the published window and the view state, and publishes a frame
/// whenever either changes.
///
/// The refresh loop is the only writer of the window, the toggle path the
/// only writer of the view state. Both publish under one lock so the newest
/// frame always carries the newest of each.
pub struct DashboardController<S> {
    fetcher: Arc<DataWindowFetcher<S>>,
    options: Arc<NormalizeOptions>,
    views: Arc<RwLock<ViewState>>,
    publish_state: Arc<Mutex<PublishState>>,
    frames: Arc<watch::Sender<Arc<Frame>>>,
}

impl<S> Clone for DashboardController<S> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            options: Arc::clone(&self.options),
            views: Arc::clone(&self.views),
            publish_state: Arc::clone(&self.publish_state),
            frames: Arc::clone(&self.frames),
        }
    }
}

impl<S: ReadingStore> DashboardController<S> {
    pub fn new(fetcher: DataWindowFetcher<S>, options: NormalizeOptions, views: ViewState) -> Self {
        let (frames, _) = watch::channel(Arc::new(Frame::initial(views.snapshot())));
        Self {
            fetcher: Arc::new(fetcher),
            options: Arc::new(options),
            views: Arc::new(RwLock::new(views)),
            publish_state: Arc::new(Mutex::new(PublishState {
                window: Arc::new(Window::empty()),
                sequence: 0,
            })),
            frames: Arc::new(frames),
        }
    }

    /// Receiver of published frames. The current frame counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Frame>> {
        self.frames.subscribe()
    }

    pub fn current_frame(&self) -> Arc<Frame> {
        Arc::clone(&self.frames.borrow())
    }

    pub fn current_window(&self) -> Arc<Window> {
        Arc::clone(&self.lock_publish_state().window)
    }

    pub fn view_snapshot(&self) -> ViewSnapshot {
        match self.views.read() {
            Ok(guard) => guard.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }

    /// One tick: fetch, normalize, replace the window and publish.
    ///
    /// On error nothing is published and the previous window stays current.
    pub async fn refresh(&self) -> Result<CycleOutcome, CycleError> {
        // No lock is held while the store is being queried.
        let batch = self.fetcher.fetch(self.options.capacity).await?;
        let normalized = normalize(&batch, &self.options);

        if !normalized.rejected.is_empty() {
            if normalized.window.is_empty() {
                let first = &normalized.rejected[0];
                return Err(MalformedResponseError::new(format!(
                    "all {} records rejected, first at index {}: {}",
                    normalized.rejected.len(),
                    first.index,
                    first.reason
                ))
                .into());
            }
            log_warn!(
                "skipped {} of {} fetched records",
                normalized.rejected.len(),
                batch.len()
            );
            for rejected in normalized.rejected.iter().take(MAX_LOGGED_REJECTIONS) {
                log_warn!("  record {}: {}", rejected.index, rejected.reason);
            }
        }

        let window = Arc::new(normalized.window);
        let outcome = CycleOutcome {
            readings: window.len(),
            rejected: normalized.rejected.len(),
            latest: window.latest().map(|reading| reading.timestamp),
        };
        let frame = self.publish(PublishReason::Tick, Some(window));
        debug!(
            "published frame #{} with {} readings",
            frame.sequence, outcome.readings
        );
        Ok(outcome)
    }

    /// Flips one view and republishes right away with the current window.
    pub fn toggle(&self, view_id: &str) -> Result<bool, UnknownViewError> {
        let visible = {
            let mut views = match self.views.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            views.toggle(view_id)?
        };
        self.publish(PublishReason::Toggle, None);
        Ok(visible)
    }

    fn publish(&self, reason: PublishReason, window: Option<Arc<Window>>) -> Arc<Frame> {
        let mut state = self.lock_publish_state();
        if let Some(window) = window {
            state.window = window;
        }
        state.sequence += 1;

        let frame = Arc::new(Frame {
            sequence: state.sequence,
            reason,
            published_at: Utc::now(),
            window: Arc::clone(&state.window),
            views: self.view_snapshot(),
        });
        self.frames.send_replace(Arc::clone(&frame));
        frame
    }

    fn lock_publish_state(&self) -> MutexGuard<'_, PublishState> {
        match self.publish_state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<S: ReadingStore> RefreshCycle for DashboardController<S> {
    async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        self.refresh().await
    }
}
