use crate::models::{AnnotationInstruction, Rect};

use super::metrics::TextMetrics;

/// Distance between the detection box and the label baseline, and between the
/// label and the right frame edge after a shift.
pub const LABEL_GAP: i32 = 10;
/// Margin added around the text on every side for the background fill.
pub const LABEL_PADDING: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: i32,
    pub height: i32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: i32::try_from(width).unwrap_or(i32::MAX),
            height: i32::try_from(height).unwrap_or(i32::MAX),
        }
    }
}

/// Computes where the label for `bounds` goes.
///
/// The label sits above the box unless its top would leave the frame, in which
/// case it moves below the box. A label running past the right edge is pulled
/// left so it ends `LABEL_GAP` inside the frame. The bottom and left edges are
/// not corrected: a label below a box near the bottom, or a long label shifted
/// left in a narrow frame, can still extend outside.
pub fn place(
    bounds: Rect,
    frame: FrameSize,
    text: &str,
    metrics: &dyn TextMetrics,
    is_new: bool,
) -> AnnotationInstruction {
    let extent = metrics.measure(text);

    // Bounds come from an arbitrary recognizer; saturate instead of overflowing.
    let mut text_x = bounds.x;
    let mut baseline = bounds.y.saturating_sub(LABEL_GAP);

    if baseline.saturating_sub(extent.height) < 0 {
        baseline = bounds
            .bottom()
            .saturating_add(extent.height)
            .saturating_add(LABEL_GAP);
    }

    if text_x.saturating_add(extent.width) > frame.width {
        text_x = frame
            .width
            .saturating_sub(extent.width)
            .saturating_sub(LABEL_GAP);
    }

    let label_rect = Rect::new(
        text_x,
        baseline.saturating_sub(extent.height),
        extent.width,
        extent.height,
    );
    let background_rect = Rect::from_corners(
        label_rect.x.saturating_sub(LABEL_PADDING),
        label_rect.y.saturating_sub(LABEL_PADDING),
        label_rect.right().saturating_add(LABEL_PADDING),
        baseline.saturating_add(LABEL_PADDING),
    );

    AnnotationInstruction {
        box_rect: bounds,
        label_rect,
        background_rect,
        text_origin: (text_x, baseline),
        text: text.to_string(),
        is_new,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::MonospaceMetrics;

    const VGA: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    fn metrics() -> MonospaceMetrics {
        MonospaceMetrics {
            glyph_advance: 10,
            text_height: 12,
        }
    }

    #[test]
    fn label_sits_above_box_away_from_edges() {
        let bounds = Rect::new(200, 200, 100, 100);
        let out = place(bounds, VGA, "HELLO", &metrics(), true);

        assert_eq!(out.box_rect, bounds);
        assert_eq!(out.text_origin, (200, 190));
        assert_eq!(out.label_rect, Rect::new(200, 178, 50, 12));
        assert!(out.label_rect.bottom() < bounds.y);
        assert_eq!(out.text, "HELLO");
        assert!(out.is_new);
    }

    #[test]
    fn background_pads_text_on_all_sides() {
        let out = place(Rect::new(200, 200, 100, 100), VGA, "HELLO", &metrics(), false);

        assert_eq!(out.background_rect, Rect::from_corners(195, 173, 255, 195));
        assert_eq!(out.background_rect.x, out.label_rect.x - LABEL_PADDING);
        assert_eq!(out.background_rect.y, out.label_rect.y - LABEL_PADDING);
        assert_eq!(out.background_rect.right(), out.label_rect.right() + LABEL_PADDING);
    }

    #[test]
    fn label_moves_below_box_near_top_edge() {
        let bounds = Rect::new(100, 5, 80, 60);
        let out = place(bounds, VGA, "TOP", &metrics(), true);

        assert_eq!(out.text_origin, (100, 65 + 12 + LABEL_GAP));
        assert!(out.label_rect.y >= bounds.bottom());
        assert!(out.label_rect.y >= 0);
    }

    #[test]
    fn label_exactly_touching_top_stays_above() {
        // baseline 12, text height 12: top edge lands on y = 0
        let out = place(Rect::new(100, 22, 40, 40), VGA, "A", &metrics(), true);
        assert_eq!(out.label_rect.y, 0);
        assert_eq!(out.text_origin.1, 12);
    }

    #[test]
    fn label_shifts_left_at_right_edge() {
        let bounds = Rect::new(630, 200, 50, 50);
        let out = place(bounds, VGA, "WIDE LABEL", &metrics(), true);

        assert_eq!(out.label_rect.right(), 630);
        assert_eq!(out.label_rect.x, 640 - 100 - LABEL_GAP);
        assert_eq!(out.text_origin.1, 190);
    }

    #[test]
    fn corner_box_gets_both_corrections() {
        let out = place(Rect::new(600, 0, 40, 40), VGA, "CORNER", &metrics(), true);
        assert_eq!(out.label_rect.right(), 630);
        assert_eq!(out.text_origin.1, 40 + 12 + LABEL_GAP);
    }

    #[test]
    fn bottom_edge_is_not_corrected() {
        let frame = FrameSize::new(640, 100);
        let out = place(Rect::new(10, 0, 50, 95), frame, "LOW", &metrics(), true);
        assert!(out.background_rect.bottom() > frame.height);
    }

    #[test]
    fn extreme_bounds_do_not_overflow() {
        let far_up = place(Rect::new(i32::MIN, i32::MIN, 50, 50), VGA, "LOW", &metrics(), true);
        assert_eq!(far_up.text_origin, (i32::MIN, i32::MIN + 72));

        let tall = place(Rect::new(0, 5, 10, i32::MAX), VGA, "TALL", &metrics(), true);
        assert_eq!(tall.text_origin.1, i32::MAX);
        assert_eq!(tall.background_rect.bottom(), i32::MAX);

        let far_right = place(
            Rect::new(i32::MAX - 5, i32::MAX - 5, i32::MAX, i32::MAX),
            VGA,
            "HIGH",
            &metrics(),
            true,
        );
        assert_eq!(far_right.text_origin, (590, i32::MAX - 15));
        assert_eq!(far_right.label_rect.right(), 630);
    }
}
