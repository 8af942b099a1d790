//! Test doubles shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::{
    error::FetchError,
    fetch::{ReadingStore, StoreQuery},
    models::RawRecord,
    presentation::{Frame, Presenter},
};

#[derive(Default)]
struct ScriptState {
    responses: VecDeque<Result<Vec<RawRecord>, FetchError>>,
    queries: Vec<StoreQuery>,
}

/// Store that replays queued responses in order. Once the script runs out
/// every fetch fails as unavailable.
#[derive(Clone, Default)]
pub struct ScriptedStore {
    state: Arc<Mutex<ScriptState>>,
    delay: Option<Duration>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_ok(&self, rows: Vec<RawRecord>) {
        self.state.lock().unwrap().responses.push_back(Ok(rows));
    }

    pub fn push_err(&self, err: FetchError) {
        self.state.lock().unwrap().responses.push_back(Err(err));
    }

    pub fn queries(&self) -> Vec<StoreQuery> {
        self.state.lock().unwrap().queries.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.state.lock().unwrap().queries.len()
    }
}

impl ReadingStore for ScriptedStore {
    async fn fetch_rows(&self, query: &StoreQuery) -> Result<Vec<RawRecord>, FetchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.clone());
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::unavailable("script exhausted")))
    }
}

/// Presenter that forwards every frame to a channel.
pub struct RecordingPresenter {
    tx: mpsc::UnboundedSender<Frame>,
}

impl RecordingPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Presenter for RecordingPresenter {
    fn publish(&self, frame: &Frame) {
        let _ = self.tx.send(frame.clone());
    }
}

/// Sensor row with the given timestamp and heart rate.
pub fn row(created_at: &str, heart_rate: f64) -> RawRecord {
    let value = json!({
        "id": 1,
        "created_at": created_at,
        "Respiration Rate": 15,
        "Heart Rate": heart_rate,
        "Distance Between Target and Radar": 72,
        "Body Movement Indicator": 1,
        "Relative Body Movement Magnitude": 3.5,
        "Presence Detection": true,
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}
