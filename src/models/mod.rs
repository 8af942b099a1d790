pub mod reading;
pub mod view;

pub use reading::{RawRecord, Reading};
pub use view::ViewId;
