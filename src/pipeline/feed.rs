use std::{collections::VecDeque, time::Duration};

use anyhow::{Context, Result};
use tokio::{
    sync::mpsc::UnboundedSender,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::models::{AnnotationInstruction, Frame};

use super::orchestrator::ScanPipeline;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Produces frames for the live feed. `Ok(None)` means the source is exhausted.
/// Called on a blocking thread, so implementations may block on the device.
pub trait FrameSource: Send + 'static {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// A fixed list of frames, replayed once in order.
#[derive(Debug, Default)]
pub struct FrameSequence {
    frames: VecDeque<Frame>,
}

impl FrameSequence {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for FrameSequence {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}

/// A frame together with what should be drawn on it.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub annotations: Vec<AnnotationInstruction>,
}

/// Pulls frames from `source` every `interval` and runs them through the pipeline
/// until cancelled or the source runs dry. Returns the number of frames processed.
pub async fn scan_loop(
    pipeline: ScanPipeline,
    mut source: Box<dyn FrameSource>,
    source_label: String,
    interval: Duration,
    output: UnboundedSender<AnnotatedFrame>,
    cancel_token: CancellationToken,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut processed = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (returned, next) = match pull_frame(source).await {
                    Ok(pair) => pair,
                    Err(err) => {
                        log_warn!("frame source for {source_label} failed: {err:#}");
                        break;
                    }
                };
                source = returned;

                let frame = match next {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        log_info!("frame source for {source_label} exhausted");
                        break;
                    }
                    Err(err) => {
                        log_warn!("frame capture failed for {source_label}: {err:#}");
                        continue;
                    }
                };

                let started = Instant::now();
                let annotations = pipeline.process_frame(&frame, &source_label).await;
                processed += 1;
                log_debug!(
                    "frame {processed} from {source_label}: {} annotation(s) in {}ms",
                    annotations.len(),
                    started.elapsed().as_millis()
                );

                if output.send(AnnotatedFrame { frame, annotations }).is_err() {
                    log_debug!("annotation receiver dropped; continuing to scan");
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("scan loop for {source_label} shutting down");
                break;
            }
        }
    }

    processed
}

/// Runs `next_frame` on a blocking thread and hands the source back.
async fn pull_frame(
    mut source: Box<dyn FrameSource>,
) -> Result<(Box<dyn FrameSource>, Result<Option<Frame>>)> {
    tokio::task::spawn_blocking(move || {
        let next = source.next_frame();
        (source, next)
    })
    .await
    .context("frame source worker join failed")
}
