//! Scan pipeline for QR codes.
//!
//! Frames go through a [`Recognizer`], first sightings of each payload are
//! recorded to every configured sink, and each detection comes back as an
//! [`AnnotationInstruction`] for the caller to draw. The stock recognizer reads
//! QR codes only; other symbologies plug in through the same trait.

mod config;
mod db;
mod dedup;
mod errors;
mod models;
mod pipeline;
mod placement;
mod recognizer;
mod recorder;
mod utils;

use std::sync::Arc;

use anyhow::Result;

pub use config::ScannerConfig;
pub use db::{Database, StoredScan};
pub use dedup::DeduplicationRegistry;
pub use errors::{RecognitionError, RecordError, ScanWarning, SinkError};
pub use models::{
    AnnotationInstruction, DetectedCode, Frame, Payload, Rect, ScanEvent, ScanRow, Symbology,
};
pub use pipeline::{scan_loop, AnnotatedFrame, FeedController, FrameSequence, FrameSource, ScanPipeline};
pub use placement::{place, FrameSize, MonospaceMetrics, TextExtent, TextMetrics, LABEL_GAP, LABEL_PADDING};
pub use recognizer::{QrRecognizer, Recognizer};
pub use recorder::{
    ConsistencyPolicy, CsvLogSink, MemorySink, RecordSummary, ScanEventRecorder, ScanSink,
    SinkFuture, SinkReceipt, SqliteSink, CSV_HEADER,
};

/// Initializes `env_logger` at info level unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();
}

/// A pipeline wired to the three stock sinks, plus handles to inspect them.
pub struct Scanner {
    pub pipeline: ScanPipeline,
    pub display: MemorySink,
    pub database: Database,
    pub csv_log: CsvLogSink,
}

impl Scanner {
    /// Opens the database and log named in `config` and builds a QR pipeline
    /// writing to display list, SQLite and CSV, in that order.
    pub fn from_config(config: &ScannerConfig) -> Result<Self> {
        let display = MemorySink::default();
        let database = Database::new(config.database_path.clone())?;
        let csv_log = CsvLogSink::new(config.csv_path.clone());

        let recorder = ScanEventRecorder::new(config.consistency, config.sink_timeout())
            .with_sink(Arc::new(display.clone()))
            .with_sink(Arc::new(SqliteSink::new(database.clone())))
            .with_sink(Arc::new(csv_log.clone()));

        let pipeline = ScanPipeline::new(
            Arc::new(QrRecognizer::new()),
            DeduplicationRegistry::new(),
            Arc::new(recorder),
        )
        .with_text_metrics(Arc::new(config.font));

        log::info!(
            "Scanner ready: sinks {:?}, policy {:?}",
            pipeline.recorder().sink_ids(),
            config.consistency
        );

        Ok(Self {
            pipeline,
            display,
            database,
            csv_log,
        })
    }
}
