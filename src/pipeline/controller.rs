use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use super::{
    feed::{scan_loop, AnnotatedFrame, FrameSource},
    orchestrator::ScanPipeline,
};

/// Owns the live-feed task. At most one feed runs at a time.
#[derive(Default)]
pub struct FeedController {
    handle: Option<JoinHandle<u64>>,
    cancel_token: Option<CancellationToken>,
}

impl FeedController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn start(
        &mut self,
        pipeline: ScanPipeline,
        source: Box<dyn FrameSource>,
        source_label: String,
        interval: Duration,
        output: UnboundedSender<AnnotatedFrame>,
    ) -> Result<()> {
        if self.is_running() {
            bail!("live feed already active");
        }

        info!("Starting live feed for {source_label}");
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(scan_loop(
            pipeline,
            source,
            source_label,
            interval,
            output,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancels the feed and waits for it. Returns the frames it processed.
    pub async fn stop(&mut self) -> Result<u64> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => handle.await.context("scan loop task failed to join"),
            None => Ok(0),
        }
    }
}
