use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    errors::SinkError,
    models::{ScanEvent, ScanRow},
};

use super::sink::{ScanSink, SinkFuture, SinkReceipt};

#[derive(Default)]
struct DisplayRows {
    next_seq: u64,
    rows: Vec<(u64, ScanRow)>,
}

/// The in-memory list a UI table renders from. Clones share the same rows.
#[derive(Clone)]
pub struct MemorySink {
    id: String,
    inner: Arc<RwLock<DisplayRows>>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new("display")
    }
}

impl MemorySink {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inner: Arc::new(RwLock::new(DisplayRows::default())),
        }
    }

    /// Snapshot of the rows in insertion order.
    pub fn rows(&self) -> Vec<ScanRow> {
        self.read().rows.iter().map(|(_, row)| row.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().rows.is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, DisplayRows> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, DisplayRows> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ScanSink for MemorySink {
    fn id(&self) -> &str {
        &self.id
    }

    fn check<'a>(&'a self, _event: &'a ScanEvent) -> SinkFuture<'a> {
        Box::pin(async { Ok(()) })
    }

    fn append<'a>(&'a self, event: &'a ScanEvent) -> SinkFuture<'a, SinkReceipt> {
        Box::pin(async move {
            let mut guard = self.write();
            let seq = guard.next_seq;
            guard.next_seq += 1;
            guard.rows.push((seq, event.to_row()));
            Ok(SinkReceipt::new(seq))
        })
    }

    fn revoke(&self, receipt: SinkReceipt) -> SinkFuture<'_> {
        Box::pin(async move {
            let mut guard = self.write();
            let position = guard
                .rows
                .iter()
                .position(|(seq, _)| *seq == receipt.value())
                .ok_or_else(|| SinkError::new(&self.id, "row to revoke not found"))?;
            guard.rows.remove(position);
            Ok(())
        })
    }
}
