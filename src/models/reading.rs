//! Radar vital-sign reading.
//!
//! A `Reading` is one row of the sensor table after its timestamp has been
//! parsed. Sensor fields are optional because the module reports nulls while
//! it has no lock on a target.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ViewId;

/// One store row as returned by the query: column name to JSON value.
pub type RawRecord = Map<String, Value>;

pub const RESPIRATION_RATE_COLUMN: &str = "Respiration Rate";
pub const HEART_RATE_COLUMN: &str = "Heart Rate";
pub const DISTANCE_COLUMN: &str = "Distance Between Target and Radar";
pub const BODY_MOVEMENT_COLUMN: &str = "Body Movement Indicator";
pub const MOVEMENT_MAGNITUDE_COLUMN: &str = "Relative Body Movement Magnitude";
pub const PRESENCE_COLUMN: &str = "Presence Detection";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub respiration_rate: Option<f64>,
    pub heart_rate: Option<f64>,
    pub distance: Option<f64>,
    pub body_movement: Option<f64>,
    pub movement_magnitude: Option<f64>,
    pub presence: Option<bool>,
}

impl Reading {
    /// Value plotted by `view`.
    pub fn value(&self, view: ViewId) -> Option<f64> {
        match view {
            ViewId::RespiratoryRate => self.respiration_rate,
            ViewId::HeartRate => self.heart_rate,
            ViewId::Distance => self.distance,
            ViewId::BodyMovement => self.body_movement,
            ViewId::MovementMagnitude => self.movement_magnitude,
        }
    }

    /// Renders the reading back into the store's row shape.
    pub fn to_record(&self, timestamp_field: &str) -> RawRecord {
        let mut record = Map::new();
        record.insert(
            timestamp_field.to_string(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
        let numeric = [
            (RESPIRATION_RATE_COLUMN, self.respiration_rate),
            (HEART_RATE_COLUMN, self.heart_rate),
            (DISTANCE_COLUMN, self.distance),
            (BODY_MOVEMENT_COLUMN, self.body_movement),
            (MOVEMENT_MAGNITUDE_COLUMN, self.movement_magnitude),
        ];
        for (column, value) in numeric {
            let json = value
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
            record.insert(column.to_string(), json);
        }
        record.insert(
            PRESENCE_COLUMN.to_string(),
            self.presence.map(Value::Bool).unwrap_or(Value::Null),
        );
        record
    }
}
