//! Recognizer output types.
//!
//! A `DetectedCode` lives for one frame only; anything that must outlive the
//! frame is copied into a `ScanEvent`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rectangle from two opposite corners. Edge arithmetic here
    /// saturates at the `i32` limits.
    pub fn from_corners(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }
}

/// Raw payload bytes as produced by the recognizer.
///
/// Equality is byte equality, so the same code read from a file and from the
/// camera compares equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// UTF-8 rendering used for labels and sink rows. Invalid sequences are
    /// replaced, never dropped.
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Symbology tag reported by the recognizer, e.g. `QRCODE` or `EAN13`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbology(String);

impl Symbology {
    pub const QR_CODE: &'static str = "QRCODE";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn qr_code() -> Self {
        Self(Self::QR_CODE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCode {
    pub payload: Payload,
    pub symbology: Symbology,
    pub bounds: Rect,
}

impl DetectedCode {
    pub fn new(payload: impl Into<Payload>, symbology: Symbology, bounds: Rect) -> Self {
        Self {
            payload: payload.into(),
            symbology,
            bounds,
        }
    }

    /// Text drawn next to the detection box: `"<payload> (<symbology>)"`.
    pub fn label_text(&self) -> String {
        format!("{} ({})", self.payload, self.symbology)
    }
}
