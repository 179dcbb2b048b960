use std::path::Path;

use anyhow::Result;
use log::{error, info, warn};
use scanlog_lib::{
    AnnotationInstruction, FeedController, Frame, FrameSequence, ScanPipeline, Scanner,
    ScannerConfig,
};
use tokio::sync::mpsc;

const CONFIG_FILE: &str = "scanlog.json";

/// `scanlog <image>...` scans each image once.
/// `scanlog --feed <image>...` replays the images as the live camera feed until
/// they run out or Ctrl-C is pressed.
#[tokio::main]
async fn main() -> Result<()> {
    scanlog_lib::init_logging();

    let config = ScannerConfig::load(Path::new(CONFIG_FILE))?;
    let scanner = Scanner::from_config(&config)?;
    let (warn_tx, mut warn_rx) = mpsc::unbounded_channel();
    let pipeline = scanner.pipeline.clone().with_warnings(warn_tx);

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--feed") {
        args.remove(0);
        run_feed(&config, &pipeline, &args).await?;
    } else {
        scan_files(&pipeline, &args).await;
    }

    pipeline.recorder().settle().await;
    while let Ok(warning) = warn_rx.try_recv() {
        warn!("{warning}");
    }

    info!(
        "{} unique code(s) recorded; log at {}, database at {}",
        scanner.display.len(),
        scanner.csv_log.path().display(),
        scanner.database.path().display()
    );

    Ok(())
}

async fn scan_files(pipeline: &ScanPipeline, paths: &[String]) {
    for file_path in paths {
        let Some(frame) = open_frame(file_path) else {
            continue;
        };

        let annotations = pipeline.process_frame(&frame, file_path).await;
        if annotations.is_empty() {
            info!("{file_path}: no codes found");
        }
        log_annotations(file_path, &annotations);
    }
}

async fn run_feed(config: &ScannerConfig, pipeline: &ScanPipeline, paths: &[String]) -> Result<()> {
    let frames: Vec<Frame> = paths
        .iter()
        .filter_map(|path| open_frame(path))
        .map(|frame| frame.resized(config.frame_width, config.frame_height))
        .collect();

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    let mut controller = FeedController::new();
    controller.start(
        pipeline.clone(),
        Box::new(FrameSequence::new(frames)),
        config.camera_source.clone(),
        config.feed_interval(),
        frame_tx,
    )?;

    loop {
        tokio::select! {
            annotated = frame_rx.recv() => match annotated {
                Some(annotated) => log_annotations(&config.camera_source, &annotated.annotations),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping live feed");
                break;
            }
        }
    }

    let processed = controller.stop().await?;
    info!("Live feed processed {processed} frame(s)");
    Ok(())
}

fn open_frame(file_path: &str) -> Option<Frame> {
    let path = Path::new(file_path);
    if !path.exists() {
        error!("File {file_path} not found!");
        return None;
    }

    match Frame::open(path) {
        Ok(frame) => Some(frame),
        Err(err) => {
            warn!("{err:#}");
            None
        }
    }
}

fn log_annotations(source: &str, annotations: &[AnnotationInstruction]) {
    for annotation in annotations {
        info!(
            "{source}: {} at {:?}, label at {:?}{}",
            annotation.text,
            annotation.box_rect,
            annotation.label_rect,
            if annotation.is_new { " (new)" } else { "" }
        );
    }
}
