use log::debug;

use crate::{
    errors::RecognitionError,
    models::{DetectedCode, Frame, Payload, Rect, Symbology},
};

use super::Recognizer;

/// QR code recognizer backed by `rqrr`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrRecognizer;

impl QrRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl Recognizer for QrRecognizer {
    fn recognize(&self, frame: &Frame) -> Result<Vec<DetectedCode>, RecognitionError> {
        if frame.is_empty() {
            return Err(RecognitionError::Unavailable(format!(
                "empty frame ({}x{})",
                frame.width(),
                frame.height()
            )));
        }

        let mut prepared = rqrr::PreparedImage::prepare(frame.image().to_luma8());
        let grids = prepared.detect_grids();

        let mut detections = Vec::with_capacity(grids.len());
        for grid in grids {
            let content = match grid.decode() {
                Ok((_meta, content)) => content,
                Err(err) => {
                    debug!("QR grid found but not decodable: {err}");
                    continue;
                }
            };

            let bounds = bounding_rect(
                grid.bounds.iter().map(|p| (p.x, p.y)),
                frame.width(),
                frame.height(),
            );
            detections.push(DetectedCode::new(
                Payload::from(content),
                Symbology::qr_code(),
                bounds,
            ));
        }

        Ok(detections)
    }
}

/// Axis-aligned box around the grid corners, clamped to the frame.
fn bounding_rect(corners: impl Iterator<Item = (i32, i32)>, width: u32, height: u32) -> Rect {
    let max_x = i32::try_from(width).unwrap_or(i32::MAX);
    let max_y = i32::try_from(height).unwrap_or(i32::MAX);

    let (mut left, mut top, mut right, mut bottom) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    for (x, y) in corners {
        left = left.min(x);
        top = top.min(y);
        right = right.max(x);
        bottom = bottom.max(y);
    }
    if left > right || top > bottom {
        return Rect::default();
    }

    Rect::from_corners(
        left.clamp(0, max_x),
        top.clamp(0, max_y),
        right.clamp(0, max_x),
        bottom.clamp(0, max_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_is_unavailable() {
        let err = QrRecognizer::new().recognize(&Frame::blank(0, 0)).unwrap_err();
        assert!(matches!(err, RecognitionError::Unavailable(_)));
    }

    #[test]
    fn blank_frame_has_no_detections() {
        let detections = QrRecognizer::new().recognize(&Frame::blank(64, 48)).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn bounding_rect_covers_rotated_corners() {
        let corners = [(10, 20), (50, 15), (55, 60), (5, 58)];
        let rect = bounding_rect(corners.into_iter(), 640, 480);
        assert_eq!(rect, Rect::from_corners(5, 15, 55, 60));
    }

    #[test]
    fn bounding_rect_is_clamped_to_frame() {
        let corners = [(-4, -2), (700, 10), (700, 500), (-4, 500)];
        let rect = bounding_rect(corners.into_iter(), 640, 480);
        assert_eq!(rect, Rect::new(0, 0, 640, 480));
    }
}
