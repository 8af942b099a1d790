use std::{collections::BTreeSet, fmt, fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::ViewId;

pub const CONFIG_PATH_ENV: &str = "VITALVIEW_CONFIG";
pub const DB_PATH_ENV: &str = "VITALVIEW_DB";
pub const CREDENTIALS_ENV: &str = "VITALVIEW_STORE_CREDENTIALS";
pub const WINDOW_SIZE_ENV: &str = "VITALVIEW_WINDOW_SIZE";
pub const POLL_INTERVAL_ENV: &str = "VITALVIEW_POLL_INTERVAL_SECS";

/// Opaque secret handed to the store client. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreCredentials(String);

impl StoreCredentials {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoreCredentials(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PresenterKind {
    Log,
    Json,
}

impl Default for PresenterKind {
    fn default() -> Self {
        PresenterKind::Log
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    pub path: PathBuf,
    pub table: String,
    pub timestamp_field: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("vitalview.sqlite3"),
            table: "Main data".into(),
            timestamp_field: "created_at".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackoffConfig {
    pub max_delay_seconds: f64,
    pub multiplier: f64,
    /// Fraction of the delay randomly added or removed.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_delay_seconds: 30.0,
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardConfig {
    pub window_size: usize,
    pub poll_interval_seconds: f64,
    pub fetch_timeout_seconds: f64,
    pub store_credentials: Option<StoreCredentials>,
    pub view_identifiers: Vec<ViewId>,
    pub store: StoreConfig,
    pub backoff: BackoffConfig,
    pub presenter: PresenterKind,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            window_size: 200,
            poll_interval_seconds: 2.0,
            fetch_timeout_seconds: 10.0,
            store_credentials: None,
            view_identifiers: ViewId::ALL.to_vec(),
            store: StoreConfig::default(),
            backoff: BackoffConfig::default(),
            presenter: PresenterKind::default(),
        }
    }
}

impl DashboardConfig {
    /// Reads `path` if it exists, otherwise starts from defaults. Environment
    /// overrides are applied on top and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            _ => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DB_PATH_ENV) {
            self.store.path = PathBuf::from(path);
        }
        if let Some(secret) = lookup(CREDENTIALS_ENV) {
            self.store_credentials = Some(StoreCredentials::new(secret));
        }
        if let Some(size) = lookup(WINDOW_SIZE_ENV) {
            self.window_size = size
                .trim()
                .parse()
                .with_context(|| format!("{WINDOW_SIZE_ENV} must be a positive integer"))?;
        }
        if let Some(secs) = lookup(POLL_INTERVAL_ENV) {
            self.poll_interval_seconds = secs
                .trim()
                .parse()
                .with_context(|| format!("{POLL_INTERVAL_ENV} must be a number of seconds"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            bail!("windowSize must be greater than zero");
        }
        positive_seconds("pollIntervalSeconds", self.poll_interval_seconds)?;
        positive_seconds("fetchTimeoutSeconds", self.fetch_timeout_seconds)?;
        positive_seconds("backoff.maxDelaySeconds", self.backoff.max_delay_seconds)?;
        if !(self.backoff.multiplier >= 1.0 && self.backoff.multiplier.is_finite()) {
            bail!("backoff.multiplier must be at least 1");
        }
        if !(0.0..1.0).contains(&self.backoff.jitter) {
            bail!("backoff.jitter must be in [0, 1)");
        }
        if self.view_identifiers.is_empty() {
            bail!("viewIdentifiers must name at least one view");
        }
        let unique: BTreeSet<_> = self.view_identifiers.iter().collect();
        if unique.len() != self.view_identifiers.len() {
            bail!("viewIdentifiers contains duplicates");
        }
        if self.store.table.trim().is_empty() || self.store.timestamp_field.trim().is_empty() {
            bail!("store.table and store.timestampField must not be empty");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        saturating_seconds(self.poll_interval_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        saturating_seconds(self.fetch_timeout_seconds)
    }

    pub fn max_backoff(&self) -> Duration {
        saturating_seconds(self.backoff.max_delay_seconds)
    }
}

/// Accepts values that convert to a non-zero `Duration`.
fn positive_seconds(name: &str, value: f64) -> Result<()> {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if !duration.is_zero() => Ok(()),
        Ok(_) => bail!("{name} must be a positive number of seconds, got {value}"),
        Err(err) => bail!("{name} is not a usable number of seconds ({value}): {err}"),
    }
}

// Only unvalidated configs hit the fallback.
fn saturating_seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}
