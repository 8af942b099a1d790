use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{RawRecord, Reading, ViewId};

/// Readings ordered oldest first. Built only by the normalizer, so the
/// ordering invariant holds for every instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Window {
    readings: Vec<Reading>,
}

/// One chart point: x is the reading time, y the view's field (None leaves a
/// gap in the line).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

impl Window {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Caller guarantees `readings` is non-decreasing by timestamp.
    pub(super) fn from_sorted(readings: Vec<Reading>) -> Self {
        debug_assert!(readings
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
        Self { readings }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    /// Most recent reading, absent for an empty window.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.last()
    }

    pub fn oldest(&self) -> Option<&Reading> {
        self.readings.first()
    }

    pub fn series(&self, view: ViewId) -> Vec<SeriesPoint> {
        self.readings
            .iter()
            .map(|reading| SeriesPoint {
                timestamp: reading.timestamp,
                value: reading.value(view),
            })
            .collect()
    }

    pub fn to_records(&self, timestamp_field: &str) -> Vec<RawRecord> {
        self.readings
            .iter()
            .map(|reading| reading.to_record(timestamp_field))
            .collect()
    }
}
