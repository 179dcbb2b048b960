use std::{
    fs::{self, File, OpenOptions},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::{
    errors::SinkError,
    models::{ScanEvent, ScanRow},
};

use super::sink::{ScanSink, SinkFuture, SinkReceipt};

pub const CSV_HEADER: [&str; 4] = ["payload", "symbology", "source", "timestamp"];

/// Append-only CSV log. The header row is written once, when the file is empty.
#[derive(Clone)]
pub struct CsvLogSink {
    id: String,
    path: Arc<PathBuf>,
    // Serializes appends and truncations on this file.
    file_lock: Arc<Mutex<()>>,
}

impl CsvLogSink {
    pub fn new(path: PathBuf) -> Self {
        Self {
            id: "csv".to_string(),
            path: Arc::new(path),
            file_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Reads back every data row; used for inspection and tests.
    pub fn read_rows(&self) -> Result<Vec<ScanRow>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(self.path.as_path())
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut rows = Vec::new();
        for record in reader.deserialize::<ScanRow>() {
            rows.push(record.context("malformed csv row")?);
        }
        Ok(rows)
    }

    async fn run_blocking<T, F>(&self, task: F) -> Result<T, SinkError>
    where
        F: FnOnce(&Path) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = Arc::clone(&self.path);
        let lock = Arc::clone(&self.file_lock);
        tokio::task::spawn_blocking(move || {
            let _guard = match lock.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            task(path.as_path())
        })
        .await
        .map_err(|err| SinkError::new(&self.id, format!("csv worker join failed: {err}")))?
        .map_err(|err| SinkError::from_anyhow(&self.id, err))
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    Ok(())
}

fn check_appendable(path: &Path) -> Result<()> {
    ensure_parent(path)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {} for append", path.display()))?;
    Ok(())
}

fn append_row(path: &Path, row: &ScanRow) -> Result<u64> {
    append_record(path, row)
}

/// Appends one record and returns the log length before it. A record that
/// fails halfway is cut off again, so the log never keeps a partial line.
fn append_record<R: Serialize>(path: &Path, record: &R) -> Result<u64> {
    ensure_parent(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {} for append", path.display()))?;
    let offset = file.metadata()?.len();

    if let Err(err) = write_record(&mut file, record, offset == 0) {
        if let Err(trunc_err) = file.set_len(offset) {
            return Err(err.context(format!("partial row left in log: {trunc_err}")));
        }
        return Err(err);
    }

    Ok(offset)
}

// The writer is dropped (and its buffer flushed) before the caller can truncate.
fn write_record<R: Serialize>(file: &mut File, record: &R, with_header: bool) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if with_header {
        writer.write_record(CSV_HEADER)?;
    }
    writer.serialize(record).context("failed to write csv row")?;
    writer.flush().context("failed to flush csv log")?;
    Ok(())
}

fn truncate_to(path: &Path, offset: u64) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("cannot open {} for truncation", path.display()))?;
    let len = file.metadata()?.len();
    if len < offset {
        bail!("log is shorter ({len} bytes) than revoke offset {offset}");
    }
    file.set_len(offset).context("failed to truncate csv log")?;
    Ok(())
}

impl ScanSink for CsvLogSink {
    fn id(&self) -> &str {
        &self.id
    }

    fn check<'a>(&'a self, _event: &'a ScanEvent) -> SinkFuture<'a> {
        Box::pin(self.run_blocking(check_appendable))
    }

    fn append<'a>(&'a self, event: &'a ScanEvent) -> SinkFuture<'a, SinkReceipt> {
        let row = event.to_row();
        Box::pin(async move {
            let offset = self.run_blocking(move |path| append_row(path, &row)).await?;
            Ok(SinkReceipt::new(offset))
        })
    }

    fn revoke(&self, receipt: SinkReceipt) -> SinkFuture<'_> {
        Box::pin(self.run_blocking(move |path| truncate_to(path, receipt.value())))
    }
}
