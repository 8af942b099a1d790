//! Toggle input boundary.
//!
//! Any source (a UI button, an API, the terminal) pushes
//! [`ToggleEvent`]s into a queue; [`toggle_listener`] applies them to the
//! dashboard as they arrive, independent of the refresh cadence.

use log::{info, warn};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::{dashboard::DashboardController, fetch::ReadingStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleEvent {
    ToggleRequested(String),
}

/// One line typed on the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Toggle(String),
    ShowViews,
    Quit,
}

impl Command {
    /// `toggle <view>`, a bare `<view>`, `views` or `quit`. Blank lines give
    /// `None`.
    pub fn parse(line: &str) -> Option<Command> {
        let mut words = line.split_whitespace();
        let first = words.next()?;
        let command = match (first, words.next()) {
            ("toggle", Some(view)) => Command::Toggle(view.to_string()),
            ("views", None) => Command::ShowViews,
            ("quit" | "exit", None) => Command::Quit,
            (view, None) => Command::Toggle(view.to_string()),
            _ => Command::Toggle(line.trim().to_string()),
        };
        Some(command)
    }
}

/// Applies toggle events until the queue closes or `cancel_token` fires.
/// Unknown views are reported and dropped.
pub async fn toggle_listener<S: ReadingStore>(
    dashboard: DashboardController<S>,
    mut events: mpsc::Receiver<ToggleEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(ToggleEvent::ToggleRequested(view_id)) = event else {
                    info!("toggle queue closed");
                    break;
                };
                match dashboard.toggle(&view_id) {
                    Ok(visible) => info!(
                        "{} chart {}",
                        view_id.trim(),
                        if visible { "shown" } else { "hidden" }
                    ),
                    Err(err) => warn!("ignoring toggle: {err}"),
                }
            }
            _ = cancel_token.cancelled() => break,
        }
    }
}

/// Reads terminal commands from `input` and forwards toggles to `events`.
/// `quit` cancels `cancel_token`; end of input just stops reading.
pub async fn read_commands<R, S>(
    input: R,
    events: mpsc::Sender<ToggleEvent>,
    dashboard: DashboardController<S>,
    cancel_token: CancellationToken,
) where
    R: AsyncBufRead + Unpin,
    S: ReadingStore,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = cancel_token.cancelled() => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("command input closed; dashboard keeps running until interrupted");
                break;
            }
            Err(err) => {
                warn!("failed to read command input: {err}");
                break;
            }
        };

        match Command::parse(&line) {
            Some(Command::Toggle(view)) => {
                if events.send(ToggleEvent::ToggleRequested(view)).await.is_err() {
                    break;
                }
            }
            Some(Command::ShowViews) => {
                let views = dashboard
                    .view_snapshot()
                    .views()
                    .map(|(view, visible)| format!("{view}={}", if visible { "on" } else { "off" }))
                    .collect::<Vec<_>>()
                    .join(" ");
                info!("views: {views}");
            }
            Some(Command::Quit) => {
                info!("quit requested");
                cancel_token.cancel();
                break;
            }
            None => {}
        }
    }
}
