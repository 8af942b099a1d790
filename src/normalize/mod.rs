pub mod algorithm;
pub mod timestamp;
pub mod window;

pub use algorithm::{normalize, NormalizeOptions, NormalizedWindow, RejectedRecord};
pub use window::{SeriesPoint, Window};
