pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod fetch;
pub mod input;
pub mod models;
pub mod normalize;
pub mod presentation;
pub mod refresh;
pub mod utils;

#[cfg(test)]
mod testing;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::{io::BufReader, sync::mpsc};
use tokio_util::sync::CancellationToken;

use config::{DashboardConfig, PresenterKind, CONFIG_PATH_ENV};
use dashboard::{DashboardController, ViewState};
use db::Database;
use fetch::DataWindowFetcher;
use normalize::NormalizeOptions;
use presentation::{render_loop, JsonLinesPresenter, LogPresenter, Presenter};
use refresh::{Backoff, RefreshHandle};

const TOGGLE_QUEUE_DEPTH: usize = 32;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Process entry point: logging, config, runtime, then the dashboard until
/// Ctrl-C or `quit`.
pub fn run() -> Result<()> {
    utils::logging::init();

    info!("vitalview starting up...");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .map(PathBuf::from);
    let config = DashboardConfig::load(config_path.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("vitalview")
        .build()
        .context("failed to build tokio runtime")?;

    let result = runtime.block_on(serve(config));
    // Stdin reads park a blocking thread that never wakes on its own.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

pub async fn serve(config: DashboardConfig) -> Result<()> {
    let database = Database::open(config.store.path.clone(), config.store_credentials.clone())?;
    check_schema(&database, &config).await;

    let fetcher = DataWindowFetcher::new(
        database,
        config.store.table.clone(),
        config.store.timestamp_field.clone(),
        config.fetch_timeout(),
    );
    let options = NormalizeOptions {
        timestamp_field: config.store.timestamp_field.clone(),
        capacity: config.window_size,
    };
    let dashboard = DashboardController::new(
        fetcher,
        options,
        ViewState::new(config.view_identifiers.iter().copied()),
    );

    let shutdown = CancellationToken::new();

    let presenter: Arc<dyn Presenter> = match config.presenter {
        PresenterKind::Log => Arc::new(LogPresenter),
        PresenterKind::Json => Arc::new(JsonLinesPresenter::stdout()),
    };
    let renderer = tokio::spawn(render_loop(dashboard.subscribe(), presenter, shutdown.clone()));

    let (toggle_tx, toggle_rx) = mpsc::channel(TOGGLE_QUEUE_DEPTH);
    let listener = tokio::spawn(input::toggle_listener(
        dashboard.clone(),
        toggle_rx,
        shutdown.clone(),
    ));
    tokio::spawn(input::read_commands(
        BufReader::new(tokio::io::stdin()),
        toggle_tx,
        dashboard.clone(),
        shutdown.clone(),
    ));

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("interrupt received, shutting down"),
                Err(err) => warn!("failed to listen for Ctrl-C: {err}"),
            }
            shutdown.cancel();
        });
    }

    let backoff = Backoff::new(
        config.poll_interval(),
        config.max_backoff(),
        config.backoff.multiplier,
        config.backoff.jitter,
    );
    let mut refresh = RefreshHandle::new();
    refresh.start(Arc::new(dashboard), backoff, &shutdown)?;

    let report = refresh.join().await?;
    shutdown.cancel();
    listener.await.context("toggle listener task failed to join")?;
    renderer.await.context("render task failed to join")?;

    info!(
        "vitalview stopped after {} ticks ({} failed)",
        report.ticks, report.failures
    );
    Ok(())
}

async fn check_schema(database: &Database, config: &DashboardConfig) {
    match database.table_columns(&config.store.table).await {
        Ok(columns) if columns.is_empty() => warn!(
            "table '{}' not found in {}; ticks will fail until it exists",
            config.store.table,
            database.path().display()
        ),
        Ok(columns) if !columns.contains(&config.store.timestamp_field) => warn!(
            "table '{}' has no '{}' column",
            config.store.table, config.store.timestamp_field
        ),
        Ok(_) => {}
        Err(err) => warn!("could not inspect table '{}': {err:#}", config.store.table),
    }
}
