//! Error types surfaced by the scan pipeline.
//!
//! A repeated payload is not an error and has no variant here; the registry
//! simply answers `false`.

use thiserror::Error;

use crate::models::ScanEvent;

/// The recognizer could not process a frame. The frame is skipped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("recognition unavailable: {0}")]
    Unavailable(String),
}

/// One sink rejected (or could not be asked to accept) a write.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("sink '{sink_id}' write failed: {reason}")]
pub struct SinkError {
    pub sink_id: String,
    pub reason: String,
}

impl SinkError {
    pub fn new(sink_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            sink_id: sink_id.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an internal error chain, keeping every context layer in the reason.
    pub fn from_anyhow(sink_id: &str, err: anyhow::Error) -> Self {
        Self::new(sink_id, format!("{err:#}"))
    }
}

/// Why a `ScanEventRecorder::record` call did not reach every sink.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// All-or-nothing abort: no sink holds the event.
    ///
    /// `compensation_failures` lists sinks that may still hold a copy: a revoke
    /// that failed, or an append that timed out while still in flight. The
    /// latter is revoked in the background once it lands.
    #[error("event not recorded: {}", describe(.failures))]
    SinkWriteFailed {
        failures: Vec<SinkError>,
        compensation_failures: Vec<SinkError>,
    },
    /// Best-effort: the listed sinks failed, the rest hold the event.
    #[error("event recorded to {} sink(s) only: {}", .recorded.len(), describe(.failures))]
    PartiallyRecorded {
        recorded: Vec<String>,
        failures: Vec<SinkError>,
    },
}

impl RecordError {
    pub fn failures(&self) -> &[SinkError] {
        match self {
            RecordError::SinkWriteFailed { failures, .. } => failures,
            RecordError::PartiallyRecorded { failures, .. } => failures,
        }
    }
}

fn describe(failures: &[SinkError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Non-fatal conditions reported to the caller while processing frames.
#[derive(Debug, Clone, Error)]
pub enum ScanWarning {
    #[error("frame from {frame_source} skipped: {reason}")]
    RecognitionUnavailable { frame_source: String, reason: String },
    #[error("scan of '{}' from {} lost: {error}", .event.payload, .event.source)]
    RecordingFailed {
        event: ScanEvent,
        #[source]
        error: RecordError,
    },
}
