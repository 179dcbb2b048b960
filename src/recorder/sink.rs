use std::{future::Future, pin::Pin};

use crate::{errors::SinkError, models::ScanEvent};

/// Boxed future returned by sink operations, so sinks can be stored as trait objects.
pub type SinkFuture<'a, T = ()> = Pin<Box<dyn Future<Output = Result<T, SinkError>> + Send + 'a>>;

/// Token identifying one write inside one sink: a row id, a byte offset or a
/// sequence number, depending on the sink. Only meaningful to the sink that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkReceipt(u64);

impl SinkReceipt {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A destination for scan events.
pub trait ScanSink: Send + Sync {
    /// Stable name used in logs and failure reports.
    fn id(&self) -> &str;

    /// Confirms `append` would currently succeed for `event`. Must not write the event.
    fn check<'a>(&'a self, event: &'a ScanEvent) -> SinkFuture<'a>;

    fn append<'a>(&'a self, event: &'a ScanEvent) -> SinkFuture<'a, SinkReceipt>;

    /// Undoes the write identified by `receipt`. Only called by the recorder
    /// to roll back an all-or-nothing attempt that failed on a later sink.
    fn revoke(&self, receipt: SinkReceipt) -> SinkFuture<'_>;
}
