use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    dedup::DeduplicationRegistry,
    errors::{RecognitionError, ScanWarning},
    models::{AnnotationInstruction, DetectedCode, Frame, ScanEvent},
    placement::{place, FrameSize, MonospaceMetrics, TextMetrics},
    recognizer::Recognizer,
    recorder::ScanEventRecorder,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Per-frame driver: recognize, deduplicate, place labels, record first sightings.
///
/// Clones share the registry and recorder, so a live feed and on-demand file
/// scans can run the same pipeline concurrently.
#[derive(Clone)]
pub struct ScanPipeline {
    recognizer: Arc<dyn Recognizer>,
    registry: DeduplicationRegistry,
    recorder: Arc<ScanEventRecorder>,
    metrics: Arc<dyn TextMetrics>,
    warnings: Option<UnboundedSender<ScanWarning>>,
}

impl ScanPipeline {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        registry: DeduplicationRegistry,
        recorder: Arc<ScanEventRecorder>,
    ) -> Self {
        Self {
            recognizer,
            registry,
            recorder,
            metrics: Arc::new(MonospaceMetrics::default()),
            warnings: None,
        }
    }

    pub fn with_text_metrics(mut self, metrics: Arc<dyn TextMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Routes recognition and recording failures to `tx` in addition to the log.
    pub fn with_warnings(mut self, tx: UnboundedSender<ScanWarning>) -> Self {
        self.warnings = Some(tx);
        self
    }

    pub fn registry(&self) -> &DeduplicationRegistry {
        &self.registry
    }

    pub fn recorder(&self) -> &ScanEventRecorder {
        &self.recorder
    }

    /// Processes one frame and returns what to draw on it.
    ///
    /// Every detection gets an annotation, new or not. Only the first sighting of
    /// a payload is recorded. Failures never abort the frame: an unreadable frame
    /// yields no annotations, and a failed recording is reported as a warning.
    pub async fn process_frame(&self, frame: &Frame, source: &str) -> Vec<AnnotationInstruction> {
        let detections = match self.recognize(frame).await {
            Ok(detections) => detections,
            Err(RecognitionError::Unavailable(reason)) => {
                log_warn!("skipping frame from {source}: {reason}");
                self.warn(ScanWarning::RecognitionUnavailable {
                    frame_source: source.to_string(),
                    reason,
                });
                return Vec::new();
            }
        };

        let frame_size = FrameSize::new(frame.width(), frame.height());
        let mut annotations = Vec::with_capacity(detections.len());

        for code in &detections {
            let is_new = self.registry.observe(&code.payload);
            annotations.push(place(
                code.bounds,
                frame_size,
                &code.label_text(),
                self.metrics.as_ref(),
                is_new,
            ));

            if is_new {
                self.record_first_sighting(code, source).await;
            }
        }

        log_debug!(
            "frame from {source}: {} detection(s), {} seen payload(s) total",
            annotations.len(),
            self.registry.len()
        );

        annotations
    }

    async fn recognize(&self, frame: &Frame) -> Result<Vec<DetectedCode>, RecognitionError> {
        let recognizer = Arc::clone(&self.recognizer);
        let frame = frame.clone();
        tokio::task::spawn_blocking(move || recognizer.recognize(&frame))
            .await
            .unwrap_or_else(|err| {
                Err(RecognitionError::Unavailable(format!(
                    "recognizer task failed: {err}"
                )))
            })
    }

    async fn record_first_sighting(&self, code: &DetectedCode, source: &str) {
        let event = ScanEvent::from_detection(code, source, Utc::now());
        log_info!(
            "[NEW SCAN] Source: {} | Type: {} | Data: {}",
            event.source,
            event.symbology,
            event.payload
        );

        if let Err(error) = self.recorder.record(&event).await {
            self.warn(ScanWarning::RecordingFailed { event, error });
        }
    }

    fn warn(&self, warning: ScanWarning) {
        if let Some(tx) = &self.warnings {
            if tx.send(warning).is_err() {
                log_debug!("warning receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use crate::{
        errors::{RecordError, SinkError},
        models::{Rect, Symbology},
        recorder::{ConsistencyPolicy, MemorySink, ScanSink, SinkFuture, SinkReceipt},
    };

    struct StubRecognizer {
        result: Result<Vec<DetectedCode>, RecognitionError>,
    }

    impl Recognizer for StubRecognizer {
        fn recognize(&self, _frame: &Frame) -> Result<Vec<DetectedCode>, RecognitionError> {
            self.result.clone()
        }
    }

    fn hello() -> DetectedCode {
        DetectedCode::new("HELLO", Symbology::qr_code(), Rect::new(200, 200, 100, 100))
    }

    fn pipeline_with(
        result: Result<Vec<DetectedCode>, RecognitionError>,
        display: &MemorySink,
    ) -> ScanPipeline {
        let recorder = ScanEventRecorder::new(ConsistencyPolicy::AllOrNothing, Duration::from_secs(1))
            .with_sink(Arc::new(display.clone()));
        ScanPipeline::new(
            Arc::new(StubRecognizer { result }),
            DeduplicationRegistry::new(),
            Arc::new(recorder),
        )
    }

    #[tokio::test]
    async fn repeated_frames_record_once_but_annotate_every_time() {
        let display = MemorySink::default();
        let pipeline = pipeline_with(Ok(vec![hello()]), &display);
        let frame = Frame::blank(640, 480);

        let first = pipeline.process_frame(&frame, "cam0").await;
        let second = pipeline.process_frame(&frame, "cam0").await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(first[0].is_new);
        assert!(!second[0].is_new);
        assert_eq!(first[0].label_rect, second[0].label_rect);
        assert_eq!(second[0].text, "HELLO (QRCODE)");
        assert_eq!(display.len(), 1);
    }

    #[tokio::test]
    async fn same_payload_twice_in_one_frame_records_once() {
        let display = MemorySink::default();
        let mut twin = hello();
        twin.bounds = Rect::new(10, 300, 50, 50);
        let pipeline = pipeline_with(Ok(vec![hello(), twin]), &display);

        let annotations = pipeline.process_frame(&Frame::blank(640, 480), "cam0").await;

        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations.iter().filter(|a| a.is_new).count(), 1);
        assert_eq!(display.len(), 1);
    }

    #[tokio::test]
    async fn unreadable_frame_yields_nothing_and_warns() {
        let display = MemorySink::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let pipeline = pipeline_with(
            Err(RecognitionError::Unavailable("corrupt".into())),
            &display,
        )
        .with_warnings(tx);

        let annotations = pipeline.process_frame(&Frame::blank(640, 480), "file.png").await;

        assert!(annotations.is_empty());
        match rx.try_recv().unwrap() {
            ScanWarning::RecognitionUnavailable { frame_source, reason } => {
                assert_eq!(frame_source, "file.png");
                assert_eq!(reason, "corrupt");
            }
            other => panic!("unexpected warning: {other}"),
        }
    }

    #[tokio::test]
    async fn recording_failure_is_a_warning_not_an_abort() {
        struct Refusing;
        impl ScanSink for Refusing {
            fn id(&self) -> &str {
                "refusing"
            }
            fn check<'a>(&'a self, _event: &'a ScanEvent) -> SinkFuture<'a> {
                Box::pin(async { Err(SinkError::new("refusing", "no")) })
            }
            fn append<'a>(&'a self, _event: &'a ScanEvent) -> SinkFuture<'a, SinkReceipt> {
                Box::pin(async { Err(SinkError::new("refusing", "no")) })
            }
            fn revoke(&self, _receipt: SinkReceipt) -> SinkFuture<'_> {
                Box::pin(async { Ok(()) })
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let recorder = ScanEventRecorder::new(ConsistencyPolicy::AllOrNothing, Duration::from_secs(1))
            .with_sink(Arc::new(Refusing));
        let other = DetectedCode::new("OTHER", Symbology::new("EAN13"), Rect::new(0, 100, 40, 40));
        let pipeline = ScanPipeline::new(
            Arc::new(StubRecognizer {
                result: Ok(vec![hello(), other]),
            }),
            DeduplicationRegistry::new(),
            Arc::new(recorder),
        )
        .with_warnings(tx);

        let annotations = pipeline.process_frame(&Frame::blank(640, 480), "cam0").await;

        assert_eq!(annotations.len(), 2);
        let mut lost = Vec::new();
        while let Ok(warning) = rx.try_recv() {
            if let ScanWarning::RecordingFailed { event, error } = warning {
                assert!(matches!(error, RecordError::SinkWriteFailed { .. }));
                lost.push(event.payload.as_text());
            }
        }
        assert_eq!(lost, vec!["HELLO", "OTHER"]);
    }

    #[tokio::test]
    async fn concurrent_contexts_record_a_payload_once() {
        let display = MemorySink::default();
        let pipeline = pipeline_with(Ok(vec![hello()]), &display);
        let frame = Frame::blank(640, 480);

        let mut tasks = Vec::new();
        for i in 0..8 {
            let pipeline = pipeline.clone();
            let frame = frame.clone();
            tasks.push(tokio::spawn(async move {
                pipeline
                    .process_frame(&frame, &format!("ctx{i}"))
                    .await
                    .iter()
                    .filter(|a| a.is_new)
                    .count()
            }));
        }

        let mut wins = 0;
        for task in tasks {
            wins += task.await.unwrap();
        }
        assert_eq!(wins, 1);
        assert_eq!(display.len(), 1);
    }
}
