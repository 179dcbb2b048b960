mod controller;
mod feed;
mod orchestrator;

pub use controller::FeedController;
pub use feed::{scan_loop, AnnotatedFrame, FrameSequence, FrameSource};
pub use orchestrator::ScanPipeline;
