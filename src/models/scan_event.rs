//! Scan event data model.
//!
//! One `ScanEvent` exists per distinct payload, created the first time the
//! payload is seen by the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::detection::{DetectedCode, Payload, Symbology};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub payload: Payload,
    pub symbology: Symbology,
    /// Origin of the frame: a camera label or the scanned file path.
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl ScanEvent {
    pub fn new(
        payload: Payload,
        symbology: Symbology,
        source: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            payload,
            symbology,
            source: source.into(),
            timestamp,
        }
    }

    pub fn from_detection(code: &DetectedCode, source: &str, timestamp: DateTime<Utc>) -> Self {
        Self::new(
            code.payload.clone(),
            code.symbology.clone(),
            source,
            timestamp,
        )
    }

    /// Flattened row written by every sink: `(payload, symbology, source, timestamp)`.
    pub fn to_row(&self) -> ScanRow {
        ScanRow {
            payload: self.payload.as_text(),
            symbology: self.symbology.as_str().to_string(),
            source: self.source.clone(),
            timestamp: self.timestamp.to_rfc3339(),
        }
    }
}

/// Sink-level representation of a `ScanEvent`. Every sink stores exactly these
/// four values so records can be compared across sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRow {
    pub payload: String,
    pub symbology: String,
    pub source: String,
    pub timestamp: String,
}
