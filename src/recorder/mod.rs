//! Fan-out of first-seen scan events to every configured sink.

mod csv_log;
mod memory;
mod sink;
mod sqlite;

pub use csv_log::{CsvLogSink, CSV_HEADER};
pub use memory::MemorySink;
pub use sink::{ScanSink, SinkFuture, SinkReceipt};
pub use sqlite::SqliteSink;

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    task::JoinHandle,
};

use crate::{
    errors::{RecordError, SinkError},
    models::ScanEvent,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

/// How a record attempt behaves when some sinks fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsistencyPolicy {
    /// Every sink is checked before any is written; if a write still fails,
    /// earlier writes are revoked. The event lands everywhere or nowhere.
    #[default]
    AllOrNothing,
    /// Each sink is written independently and failures are reported per sink.
    BestEffort,
}

/// Sinks that accepted the event, in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSummary {
    pub sinks: Vec<String>,
}

type PendingAppend = JoinHandle<Result<SinkReceipt, SinkError>>;

pub struct ScanEventRecorder {
    sinks: Vec<Arc<dyn ScanSink>>,
    policy: ConsistencyPolicy,
    sink_timeout: Duration,
    // One record attempt at a time, so check/append/revoke never interleave.
    // A rollback of a write that outlived its timeout keeps holding it.
    gate: Arc<Mutex<()>>,
}

impl ScanEventRecorder {
    pub fn new(policy: ConsistencyPolicy, sink_timeout: Duration) -> Self {
        Self {
            sinks: Vec::new(),
            policy,
            sink_timeout,
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Appends a sink. Sinks are written in the order they were added.
    pub fn with_sink(mut self, sink: Arc<dyn ScanSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn policy(&self) -> ConsistencyPolicy {
        self.policy
    }

    pub fn sink_ids(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.id().to_string()).collect()
    }

    /// Writes `event` to every sink under the configured policy. Nothing is
    /// retried; a failed attempt is reported and left to the caller.
    pub async fn record(&self, event: &ScanEvent) -> Result<RecordSummary, RecordError> {
        let gate = Arc::clone(&self.gate).lock_owned().await;
        let result = match self.policy {
            ConsistencyPolicy::AllOrNothing => self.record_all_or_nothing(event, gate).await,
            ConsistencyPolicy::BestEffort => self.record_best_effort(event, gate).await,
        };

        match &result {
            Ok(summary) => log_debug!(
                "recorded '{}' to {} sink(s)",
                event.payload,
                summary.sinks.len()
            ),
            Err(err) => log_warn!("recording '{}' failed: {err}", event.payload),
        }

        result
    }

    /// Waits until no record attempt is running, including the rollback of an
    /// append that timed out but was still in flight.
    pub async fn settle(&self) {
        let _gate = self.gate.lock().await;
    }

    async fn record_all_or_nothing(
        &self,
        event: &ScanEvent,
        gate: OwnedMutexGuard<()>,
    ) -> Result<RecordSummary, RecordError> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(err) = self.bounded(sink.id(), sink.check(event)).await {
                failures.push(err);
            }
        }
        if !failures.is_empty() {
            return Err(RecordError::SinkWriteFailed {
                failures,
                compensation_failures: Vec::new(),
            });
        }

        let mut written: Vec<(&Arc<dyn ScanSink>, SinkReceipt)> = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            // The append runs as its own task so a timeout does not drop a
            // write that the sink has already started.
            let mut pending = spawn_append(Arc::clone(sink), event.clone());
            let err = match tokio::time::timeout(self.sink_timeout, &mut pending).await {
                Ok(joined) => match flatten_join(sink.id(), joined) {
                    Ok(receipt) => {
                        written.push((sink, receipt));
                        continue;
                    }
                    Err(err) => err,
                },
                Err(_) => {
                    let err = self.timed_out(sink.id());
                    let mut compensation_failures = self.revoke_all(written).await;
                    compensation_failures.push(SinkError::new(
                        sink.id(),
                        "append still in flight after timeout; revoked once it lands",
                    ));
                    self.revoke_when_landed(Arc::clone(sink), pending, gate);
                    return Err(RecordError::SinkWriteFailed {
                        failures: vec![err],
                        compensation_failures,
                    });
                }
            };

            let compensation_failures = self.revoke_all(written).await;
            return Err(RecordError::SinkWriteFailed {
                failures: vec![err],
                compensation_failures,
            });
        }

        Ok(RecordSummary {
            sinks: written.iter().map(|(s, _)| s.id().to_string()).collect(),
        })
    }

    async fn record_best_effort(
        &self,
        event: &ScanEvent,
        _gate: OwnedMutexGuard<()>,
    ) -> Result<RecordSummary, RecordError> {
        let mut recorded = Vec::new();
        let mut failures = Vec::new();
        for sink in &self.sinks {
            match self.bounded(sink.id(), sink.append(event)).await {
                Ok(_) => recorded.push(sink.id().to_string()),
                Err(err) => failures.push(err),
            }
        }

        if failures.is_empty() {
            Ok(RecordSummary { sinks: recorded })
        } else {
            Err(RecordError::PartiallyRecorded { recorded, failures })
        }
    }

    /// Revokes in reverse write order and returns the sinks that could not be rolled back.
    async fn revoke_all(&self, written: Vec<(&Arc<dyn ScanSink>, SinkReceipt)>) -> Vec<SinkError> {
        let mut failures = Vec::new();
        for (sink, receipt) in written.into_iter().rev() {
            if let Err(err) = self.bounded(sink.id(), sink.revoke(receipt)).await {
                log_error!("rollback left a record behind: {err}");
                failures.push(err);
            }
        }
        failures
    }

    /// Waits for a timed-out append in the background and revokes it if it
    /// succeeds. The gate stays held until then, so no later attempt can write
    /// behind the late row.
    fn revoke_when_landed(
        &self,
        sink: Arc<dyn ScanSink>,
        pending: PendingAppend,
        gate: OwnedMutexGuard<()>,
    ) {
        let sink_timeout = self.sink_timeout;
        tokio::spawn(async move {
            let _gate = gate;
            match flatten_join(sink.id(), pending.await) {
                Ok(receipt) => match tokio::time::timeout(sink_timeout, sink.revoke(receipt)).await {
                    Ok(Ok(())) => log_warn!("late write to '{}' landed and was revoked", sink.id()),
                    Ok(Err(err)) => log_error!("late write left a record behind: {err}"),
                    Err(_) => log_error!(
                        "revoking late write to '{}' timed out; a record may remain",
                        sink.id()
                    ),
                },
                Err(err) => log_debug!("late append never landed: {err}"),
            }
        });
    }

    async fn bounded<T>(&self, sink_id: &str, fut: SinkFuture<'_, T>) -> Result<T, SinkError> {
        match tokio::time::timeout(self.sink_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(self.timed_out(sink_id)),
        }
    }

    fn timed_out(&self, sink_id: &str) -> SinkError {
        SinkError::new(
            sink_id,
            format!("timed out after {}ms", self.sink_timeout.as_millis()),
        )
    }
}

fn spawn_append(sink: Arc<dyn ScanSink>, event: ScanEvent) -> PendingAppend {
    tokio::spawn(async move { sink.append(&event).await })
}

fn flatten_join(
    sink_id: &str,
    joined: Result<Result<SinkReceipt, SinkError>, tokio::task::JoinError>,
) -> Result<SinkReceipt, SinkError> {
    joined.unwrap_or_else(|err| Err(SinkError::new(sink_id, format!("append task failed: {err}"))))
}
