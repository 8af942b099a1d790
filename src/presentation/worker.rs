use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::{Frame, Presenter};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Feeds published frames to `presenter` until cancelled or the controller
/// goes away.
///
/// The channel only keeps the newest frame, so a presenter slower than the
/// publish rate skips superseded frames instead of queueing them.
pub async fn render_loop(
    mut frames: watch::Receiver<Arc<Frame>>,
    presenter: Arc<dyn Presenter>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    log_info!("frame channel closed, render loop exiting");
                    break;
                }
                let frame = Arc::clone(&frames.borrow_and_update());
                let presenter = Arc::clone(&presenter);
                let sequence = frame.sequence;
                if let Err(err) = tokio::task::spawn_blocking(move || presenter.publish(&frame)).await {
                    log_error!("presenter panicked on frame #{sequence}: {err}");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("render loop shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{dashboard::ViewState, models::ViewId, presentation::PublishReason, testing::RecordingPresenter};

    #[tokio::test]
    async fn presents_new_frames_and_stops_on_cancel() {
        let views = ViewState::new(ViewId::ALL).snapshot();
        let (tx, rx) = watch::channel(Arc::new(Frame::initial(views.clone())));
        let (presenter, mut presented) = RecordingPresenter::new();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(render_loop(rx, Arc::new(presenter), cancel.clone()));

        let mut next = Frame::initial(views);
        next.sequence = 1;
        next.reason = PublishReason::Tick;
        tx.send_replace(Arc::new(next));

        let frame = tokio::time::timeout(Duration::from_secs(5), presented.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.sequence, 1);

        cancel.cancel();
        handle.await.unwrap();
        assert!(presented.try_recv().is_err(), "initial frame must not be drawn");
    }
}
