use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::UnknownViewError;

/// One togglable chart. Each view plots a single sensor field over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewId {
    RespiratoryRate,
    HeartRate,
    Distance,
    BodyMovement,
    MovementMagnitude,
}

impl ViewId {
    pub const ALL: [ViewId; 5] = [
        ViewId::RespiratoryRate,
        ViewId::HeartRate,
        ViewId::Distance,
        ViewId::BodyMovement,
        ViewId::MovementMagnitude,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewId::RespiratoryRate => "respiratory-rate",
            ViewId::HeartRate => "heart-rate",
            ViewId::Distance => "distance",
            ViewId::BodyMovement => "body-movement",
            ViewId::MovementMagnitude => "movement-magnitude",
        }
    }

    /// Chart heading shown above the series.
    pub fn chart_title(self) -> &'static str {
        match self {
            ViewId::RespiratoryRate => "Respiratory Rate Over Time",
            ViewId::HeartRate => "Heart Rate Over Time",
            ViewId::Distance => "Distance Over Time",
            ViewId::BodyMovement => "Body Movement Indicator Over Time",
            ViewId::MovementMagnitude => "Movement Magnitude Over Time",
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            ViewId::RespiratoryRate => "Respiratory Rate (bpm)",
            ViewId::HeartRate => "Heart Rate (bpm)",
            ViewId::Distance => "Distance (cm)",
            ViewId::BodyMovement => "Movement Indicator",
            ViewId::MovementMagnitude => "Movement Magnitude",
        }
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewId {
    type Err = UnknownViewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        ViewId::ALL
            .into_iter()
            .find(|view| view.as_str() == trimmed)
            .ok_or_else(|| UnknownViewError(value.to_string()))
    }
}
