use serde_json::Value;

use crate::models::{
    reading::{
        BODY_MOVEMENT_COLUMN, DISTANCE_COLUMN, HEART_RATE_COLUMN, MOVEMENT_MAGNITUDE_COLUMN,
        PRESENCE_COLUMN, RESPIRATION_RATE_COLUMN,
    },
    RawRecord, Reading,
};

use super::{timestamp::parse_timestamp, Window};

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Column carrying the reading time.
    pub timestamp_field: String,
    /// Upper bound on the window; the newest readings win.
    pub capacity: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            timestamp_field: "created_at".into(),
            capacity: 200,
        }
    }
}

/// A batch record that could not become a reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRecord {
    /// Position in the fetched batch.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedWindow {
    pub window: Window,
    pub rejected: Vec<RejectedRecord>,
    /// Adjacent records dropped because every column matched their neighbour.
    pub duplicates: usize,
}

/// Turns an unordered batch into a window.
///
/// Records whose timestamp (or a sensor value) cannot be parsed are reported
/// in `rejected`. The sort is stable, so equal timestamps keep batch order;
/// such ties survive unless the whole source row equals its neighbour.
pub fn normalize(batch: &[RawRecord], options: &NormalizeOptions) -> NormalizedWindow {
    let mut rejected = Vec::new();
    let mut parsed = Vec::with_capacity(batch.len());

    for (index, record) in batch.iter().enumerate() {
        match reading_from_record(record, &options.timestamp_field) {
            Ok(reading) => parsed.push((index, reading)),
            Err(reason) => rejected.push(RejectedRecord { index, reason }),
        }
    }

    parsed.sort_by_key(|(_, reading)| reading.timestamp);

    // Compare source rows, not readings: columns outside the reading (an id,
    // a device tag) still make two rows distinct.
    let before = parsed.len();
    parsed.dedup_by(|current, previous| batch[current.0] == batch[previous.0]);
    let duplicates = before - parsed.len();

    let mut readings: Vec<Reading> = parsed.into_iter().map(|(_, reading)| reading).collect();
    if readings.len() > options.capacity {
        let excess = readings.len() - options.capacity;
        readings.drain(..excess);
    }

    NormalizedWindow {
        window: Window::from_sorted(readings),
        rejected,
        duplicates,
    }
}

pub fn reading_from_record(record: &RawRecord, timestamp_field: &str) -> Result<Reading, String> {
    let raw_timestamp = record
        .get(timestamp_field)
        .ok_or_else(|| format!("missing '{timestamp_field}' field"))?;
    let timestamp =
        parse_timestamp(raw_timestamp).map_err(|err| format!("{timestamp_field}: {err}"))?;

    Ok(Reading {
        timestamp,
        respiration_rate: numeric_field(record, RESPIRATION_RATE_COLUMN)?,
        heart_rate: numeric_field(record, HEART_RATE_COLUMN)?,
        distance: numeric_field(record, DISTANCE_COLUMN)?,
        body_movement: numeric_field(record, BODY_MOVEMENT_COLUMN)?,
        movement_magnitude: numeric_field(record, MOVEMENT_MAGNITUDE_COLUMN)?,
        presence: flag_field(record, PRESENCE_COLUMN)?,
    })
}

fn numeric_field(record: &RawRecord, column: &str) -> Result<Option<f64>, String> {
    match record.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => Ok(number.as_f64()),
        Some(Value::String(raw)) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("{column}: '{raw}' is not numeric")),
        Some(other) => Err(format!("{column}: unexpected value {other}")),
    }
}

fn flag_field(record: &RawRecord, column: &str) -> Result<Option<bool>, String> {
    match record.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::Number(number)) => match number.as_f64() {
            Some(v) if v == 0.0 => Ok(Some(false)),
            Some(v) if v == 1.0 => Ok(Some(true)),
            _ => Err(format!("{column}: {number} is not a flag")),
        },
        Some(Value::String(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(format!("{column}: '{raw}' is not a flag")),
        },
        Some(other) => Err(format!("{column}: unexpected value {other}")),
    }
}
