//! Audit sinks
//!
//! The engine submits exactly one record per invocation through
//! [`AuditSink::submit`], which must never block the request path. The
//! channel sink enqueues onto a bounded queue and drops with a metric when
//! the queue is full; persistence latency never leaks into the SLA.

use crate::persistence::{AuditWriter, AuditWriterConfig};
use modgate_core::AuditRecord;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Default bound on the audit queue
pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1024;

/// Non-blocking exhaust for audit records
pub trait AuditSink: Send + Sync {
    /// Submit one record; must return without waiting on I/O
    fn submit(&self, record: AuditRecord);
}

/// Audit sink backed by a bounded queue and a background writer task
pub struct ChannelAuditSink {
    tx: mpsc::Sender<AuditRecord>,
}

impl ChannelAuditSink {
    /// Spawn the background writer and return the sink plus its task handle
    ///
    /// The writer drains the queue until every sender is dropped, then
    /// flushes; await the handle during shutdown to not lose tail records.
    pub fn spawn(
        config: AuditWriterConfig,
        capacity: usize,
    ) -> std::io::Result<(Self, JoinHandle<()>)> {
        let mut writer = AuditWriter::new(config)?;
        let (tx, mut rx) = mpsc::channel::<AuditRecord>(capacity);

        let handle = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = writer.append(&record) {
                    error!(error = %e, "failed to persist audit record");
                    metrics::counter!("modgate_audit_failures_total").increment(1);
                }
            }
            if let Err(e) = writer.flush() {
                error!(error = %e, "failed to flush audit writer on shutdown");
            }
            debug!("audit writer drained");
        });

        Ok((Self { tx }, handle))
    }
}

impl AuditSink for ChannelAuditSink {
    fn submit(&self, record: AuditRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(record)) => {
                warn!(request_id = %record.request_id, "audit queue full, dropping record");
                metrics::counter!("modgate_audit_dropped_total").increment(1);
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                error!(request_id = %record.request_id, "audit writer gone, dropping record");
                metrics::counter!("modgate_audit_failures_total").increment(1);
            }
        }
    }
}

/// In-memory sink for tests
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records submitted so far
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn submit(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::AuditReader;
    use modgate_core::{AuditTag, ModerationRequest, ModerationResult, Region};
    use tempfile::TempDir;

    fn record(request_id: &str) -> AuditRecord {
        let request = ModerationRequest::new("hi", "hello");
        let result = ModerationResult {
            request_id: request_id.to_string(),
            final_response: "hello".to_string(),
            is_flagged: false,
            is_blocked: false,
            triggered: Vec::new(),
            scores: Default::default(),
            latency_ns: 500,
            region: Region::Global,
            session_id: None,
        };
        AuditRecord::from_result(&request, &result, AuditTag::Decision)
    }

    #[tokio::test]
    async fn test_channel_sink_persists_records() {
        let dir = TempDir::new().unwrap();
        let config = AuditWriterConfig {
            audit_dir: dir.path().to_path_buf(),
            flush_every: 1,
            ..Default::default()
        };
        let (sink, handle) = ChannelAuditSink::spawn(config, 16).unwrap();

        sink.submit(record("req-1"));
        sink.submit(record("req-2"));
        drop(sink);
        handle.await.unwrap();

        let records = AuditReader::new(dir.path()).tail(10).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record.request_id, "req-1");
    }

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let sink = MemoryAuditSink::new();
        sink.submit(record("req-1"));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].request_id, "req-1");
    }
}
