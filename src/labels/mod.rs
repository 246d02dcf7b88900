//! Container label notices.

mod notice;
mod overlay;

pub use notice::{Notice, TARGET_IN_USE_MESSAGE};
pub use overlay::{FlushReport, LabelOverlayService, SweepReport};
