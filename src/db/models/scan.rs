//! Persisted scan rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ScanRow;

/// A row of the `scans` table. `id` is assigned by SQLite on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScan {
    pub id: i64,
    pub payload: String,
    pub symbology: String,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl StoredScan {
    pub fn to_row(&self) -> ScanRow {
        ScanRow {
            payload: self.payload.clone(),
            symbology: self.symbology.clone(),
            source: self.source.clone(),
            timestamp: self.timestamp.to_rfc3339(),
        }
    }
}
