pub mod annotation;
pub mod detection;
pub mod frame;
pub mod scan_event;

pub use annotation::AnnotationInstruction;
pub use detection::{DetectedCode, Payload, Rect, Symbology};
pub use frame::Frame;
pub use scan_event::{ScanEvent, ScanRow};
