use anyhow::{bail, Context, Result};
use rusqlite::{params, DatabaseName, Row};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::StoredScan,
};
use crate::models::ScanRow;

const INSERT_SCAN: &str = "INSERT INTO scans (payload, symbology, source, timestamp)
     VALUES (?1, ?2, ?3, ?4)";

fn row_to_scan(row: &Row) -> Result<StoredScan> {
    let timestamp: String = row.get("timestamp")?;

    Ok(StoredScan {
        id: row.get("id")?,
        payload: row.get("payload")?,
        symbology: row.get("symbology")?,
        source: row.get("source")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
    })
}

impl Database {
    /// Verifies an insert into `scans` would be accepted, without writing.
    pub async fn check_scan_writable(&self) -> Result<()> {
        self.execute(|conn| {
            if conn.is_readonly(DatabaseName::Main)? {
                bail!("database is read-only");
            }
            conn.prepare_cached(INSERT_SCAN)
                .context("scans table is not writable")?;
            Ok(())
        })
        .await
    }

    /// Inserts one scan and returns its auto-incremented id.
    pub async fn insert_scan(&self, row: &ScanRow) -> Result<i64> {
        let record = row.clone();
        self.execute(move |conn| {
            conn.prepare_cached(INSERT_SCAN)?
                .execute(params![
                    record.payload,
                    record.symbology,
                    record.source,
                    record.timestamp,
                ])
                .with_context(|| "failed to insert scan")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn delete_scan(&self, scan_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM scans WHERE id = ?1", params![scan_id])
                .with_context(|| "failed to delete scan")?;
            if rows_affected == 0 {
                bail!("scan {scan_id} not found");
            }
            Ok(())
        })
        .await
    }

    /// All scans in insertion order.
    pub async fn list_scans(&self) -> Result<Vec<StoredScan>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, payload, symbology, source, timestamp
                 FROM scans
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut scans = Vec::new();
            while let Some(row) = rows.next()? {
                scans.push(row_to_scan(row)?);
            }

            Ok(scans)
        })
        .await
    }

    pub async fn count_scans(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM scans", [], |row| row.get(0))?;
            Ok(u64::try_from(count).unwrap_or_default())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("scans.sqlite3")).unwrap();
        (db, dir)
    }

    fn row(payload: &str) -> ScanRow {
        ScanRow {
            payload: payload.to_string(),
            symbology: "QRCODE".to_string(),
            source: "cam0".to_string(),
            timestamp: "2024-05-01T10:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let (db, _dir) = temp_db();
        let first = db.insert_scan(&row("a")).await.unwrap();
        let second = db.insert_scan(&row("b")).await.unwrap();
        assert!(second > first);

        let scans = db.list_scans().await.unwrap();
        assert_eq!(scans.len(), 2);
        assert_eq!(scans[0].to_row(), row("a"));
        assert_eq!(scans[1].id, second);
    }

    #[tokio::test]
    async fn delete_removes_only_the_given_row() {
        let (db, _dir) = temp_db();
        let keep = db.insert_scan(&row("keep")).await.unwrap();
        let gone = db.insert_scan(&row("drop")).await.unwrap();

        db.delete_scan(gone).await.unwrap();
        assert_eq!(db.count_scans().await.unwrap(), 1);
        assert_eq!(db.list_scans().await.unwrap()[0].id, keep);
        assert!(db.delete_scan(gone).await.is_err());
    }

    #[tokio::test]
    async fn fresh_database_is_writable() {
        let (db, _dir) = temp_db();
        db.check_scan_writable().await.unwrap();
        assert_eq!(db.count_scans().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scans.sqlite3");
        {
            let db = Database::new(path.clone()).unwrap();
            db.insert_scan(&row("persist")).await.unwrap();
        }
        let db = Database::new(path).unwrap();
        assert_eq!(db.list_scans().await.unwrap()[0].payload, "persist");
    }
}
