//! Modgate Telemetry
//!
//! The observable exhaust of the moderation pipeline:
//! - Audit sinks (bounded queue, drop-with-metric, in-memory test sink)
//! - JSON-lines audit persistence with hash-chained integrity
//! - Prometheus metrics installation and family descriptions

pub mod metrics;
pub mod persistence;
pub mod sink;

pub use persistence::{AuditReader, AuditWriter, AuditWriterConfig, PersistedAuditRecord};
pub use sink::{AuditSink, ChannelAuditSink, MemoryAuditSink, DEFAULT_AUDIT_QUEUE_CAPACITY};
