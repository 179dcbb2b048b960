//! Code recognition boundary.
//!
//! The pipeline only depends on the `Recognizer` trait; `QrRecognizer` is the
//! stock implementation.

mod qr;

pub use qr::QrRecognizer;

use crate::{
    errors::RecognitionError,
    models::{DetectedCode, Frame},
};

/// Turns a raster frame into zero or more detections. Implementations must be
/// pure with respect to the frame: no state carried between calls.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, frame: &Frame) -> Result<Vec<DetectedCode>, RecognitionError>;
}
