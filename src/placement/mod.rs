//! Label placement for detection overlays.
//!
//! Pure geometry: nothing here draws, so results can be checked without a
//! rendering surface and computed in parallel across detections.

mod engine;
mod metrics;

pub use engine::{place, FrameSize, LABEL_GAP, LABEL_PADDING};
pub use metrics::{MonospaceMetrics, TextExtent, TextMetrics};
