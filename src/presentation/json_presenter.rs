use std::{
    io::{self, Write},
    sync::Mutex,
};

use log::error;

use super::{Frame, Presenter, RenderModel};

/// Emits one JSON document per frame, newline separated, for a front end
/// reading the process output.
pub struct JsonLinesPresenter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesPresenter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn write_frame(&self, frame: &Frame) -> anyhow::Result<()> {
        let line = serde_json::to_string(&RenderModel::from_frame(frame))?;
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

impl Presenter for JsonLinesPresenter {
    fn publish(&self, frame: &Frame) {
        if let Err(err) = self.write_frame(frame) {
            error!("failed to write frame #{}: {err:#}", frame.sequence);
        }
    }
}
