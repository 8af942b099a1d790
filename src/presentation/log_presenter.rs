use log::info;

use super::{Frame, Presenter, RenderModel};

/// Writes each frame as a few log lines. Handy when running headless.
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn publish(&self, frame: &Frame) {
        let model = RenderModel::from_frame(frame);

        let Some(latest_at) = model.latest_at else {
            info!("frame #{} ({:?}): no readings yet", model.sequence, model.reason);
            return;
        };

        let metrics = model
            .metrics
            .iter()
            .map(|metric| format!("{}={}", metric.label, metric.value.as_deref().unwrap_or("-")))
            .collect::<Vec<_>>()
            .join(", ");
        info!(
            "frame #{} ({:?}): {} readings, latest at {}: {}",
            model.sequence,
            model.reason,
            model.readings,
            latest_at.to_rfc3339(),
            metrics
        );

        for chart in &model.charts {
            let plotted = chart.points.iter().filter(|p| p.value.is_some()).count();
            info!("  {}: {} points", chart.title, plotted);
        }
    }
}
