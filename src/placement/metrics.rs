use serde::{Deserialize, Serialize};

/// Rendered size of a text run, in frame pixels. `height` is the cap height
/// above the baseline; descenders are not included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextExtent {
    pub width: i32,
    pub height: i32,
}

/// Measures text the way the rendering layer will draw it.
pub trait TextMetrics: Send + Sync {
    fn measure(&self, text: &str) -> TextExtent;
}

/// Fixed advance per character. The defaults approximate a Hershey simplex
/// face at scale 0.6 with a 2px stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonospaceMetrics {
    pub glyph_advance: i32,
    pub text_height: i32,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self {
            glyph_advance: 11,
            text_height: 13,
        }
    }
}

impl TextMetrics for MonospaceMetrics {
    fn measure(&self, text: &str) -> TextExtent {
        let chars = i32::try_from(text.chars().count()).unwrap_or(i32::MAX);
        TextExtent {
            width: chars.saturating_mul(self.glyph_advance),
            height: self.text_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_characters_not_bytes() {
        let metrics = MonospaceMetrics {
            glyph_advance: 10,
            text_height: 12,
        };
        assert_eq!(
            metrics.measure("héllo"),
            TextExtent {
                width: 50,
                height: 12
            }
        );
    }
}
