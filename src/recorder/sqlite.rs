use crate::{db::Database, errors::SinkError, models::ScanEvent};

use super::sink::{ScanSink, SinkFuture, SinkReceipt};

/// Durable store: one row per event in the `scans` table, keyed by an
/// auto-incrementing id.
#[derive(Clone)]
pub struct SqliteSink {
    id: String,
    db: Database,
}

impl SqliteSink {
    pub fn new(db: Database) -> Self {
        Self {
            id: "sqlite".to_string(),
            db,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl ScanSink for SqliteSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn check<'a>(&'a self, _event: &'a ScanEvent) -> SinkFuture<'a> {
        Box::pin(async move {
            self.db
                .check_scan_writable()
                .await
                .map_err(|err| SinkError::from_anyhow(&self.id, err))
        })
    }

    fn append<'a>(&'a self, event: &'a ScanEvent) -> SinkFuture<'a, SinkReceipt> {
        Box::pin(async move {
            let row_id = self
                .db
                .insert_scan(&event.to_row())
                .await
                .map_err(|err| SinkError::from_anyhow(&self.id, err))?;
            let row_id = u64::try_from(row_id)
                .map_err(|_| SinkError::new(&self.id, format!("negative row id {row_id}")))?;
            Ok(SinkReceipt::new(row_id))
        })
    }

    fn revoke(&self, receipt: SinkReceipt) -> SinkFuture<'_> {
        Box::pin(async move {
            let row_id = i64::try_from(receipt.value()).map_err(|_| {
                SinkError::new(&self.id, format!("row id {} out of range", receipt.value()))
            })?;
            self.db
                .delete_scan(row_id)
                .await
                .map_err(|err| SinkError::from_anyhow(&self.id, err))
        })
    }
}
