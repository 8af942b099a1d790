//! Presentation boundary.
//!
//! The controller publishes [`Frame`]s; a render worker hands each one to a
//! [`Presenter`]. Presenters usually go through [`RenderModel`], which turns
//! a frame into the summary metrics and the charts of the visible views.

mod json_presenter;
mod log_presenter;
mod worker;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    dashboard::ViewSnapshot,
    models::{Reading, ViewId},
    normalize::{SeriesPoint, Window},
};

pub use json_presenter::JsonLinesPresenter;
pub use log_presenter::LogPresenter;
pub use worker::render_loop;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PublishReason {
    /// Nothing published yet.
    Initial,
    Tick,
    Toggle,
}

/// Everything a presenter needs for one draw.
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub reason: PublishReason,
    pub published_at: DateTime<Utc>,
    pub window: Arc<Window>,
    pub views: ViewSnapshot,
}

impl Frame {
    pub fn initial(views: ViewSnapshot) -> Self {
        Self {
            sequence: 0,
            reason: PublishReason::Initial,
            published_at: Utc::now(),
            window: Arc::new(Window::empty()),
            views,
        }
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.window.latest()
    }
}

/// Draws frames. Called from the blocking pool, never from the refresh loop.
pub trait Presenter: Send + Sync + 'static {
    fn publish(&self, frame: &Frame);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetric {
    pub label: &'static str,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub view: ViewId,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderModel {
    pub sequence: u64,
    pub reason: PublishReason,
    pub published_at: DateTime<Utc>,
    pub readings: usize,
    pub latest_at: Option<DateTime<Utc>>,
    pub metrics: Vec<SummaryMetric>,
    pub charts: Vec<Chart>,
}

impl RenderModel {
    /// An empty window renders no metrics and no charts.
    pub fn from_frame(frame: &Frame) -> Self {
        let (metrics, charts) = match frame.latest() {
            Some(latest) => (
                summary_metrics(latest),
                frame
                    .views
                    .visible()
                    .map(|view| Chart {
                        view,
                        title: view.chart_title(),
                        x_label: "Time",
                        y_label: view.axis_label(),
                        points: frame.window.series(view),
                    })
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        Self {
            sequence: frame.sequence,
            reason: frame.reason,
            published_at: frame.published_at,
            readings: frame.window.len(),
            latest_at: frame.latest().map(|reading| reading.timestamp),
            metrics,
            charts,
        }
    }
}

fn summary_metrics(latest: &Reading) -> Vec<SummaryMetric> {
    let number = |value: Option<f64>| value.map(|v| format!("{v}"));
    vec![
        SummaryMetric {
            label: "Respiratory Rate (bpm)",
            value: number(latest.respiration_rate),
        },
        SummaryMetric {
            label: "Body Movement Indicator",
            value: number(latest.body_movement),
        },
        SummaryMetric {
            label: "Heart Rate (bpm)",
            value: number(latest.heart_rate),
        },
        SummaryMetric {
            label: "Movement Magnitude",
            value: number(latest.movement_magnitude),
        },
        SummaryMetric {
            label: "Distance (cm)",
            value: number(latest.distance),
        },
        SummaryMetric {
            label: "Presence",
            value: latest
                .presence
                .map(|present| if present { "Yes" } else { "No" }.to_string()),
        },
    ]
}
