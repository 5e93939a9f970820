//! Audit trail persistence
//!
//! JSON-lines files with:
//! - Append-only writes, flushed every few events
//! - Size-based rotation
//! - A sha256 chain hash per line for tamper detection
//! - A small reader for recent-record listings and chain verification

use modgate_core::AuditRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Configuration for audit persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditWriterConfig {
    /// Directory to store audit files
    #[serde(default = "default_audit_dir")]
    pub audit_dir: PathBuf,

    /// Maximum file size before rotation (bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Flush to disk after this many records
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
}

impl Default for AuditWriterConfig {
    fn default() -> Self {
        Self {
            audit_dir: default_audit_dir(),
            max_file_size: default_max_file_size(),
            flush_every: default_flush_every(),
        }
    }
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from("./audit")
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_flush_every() -> usize {
    10
}

/// An audit record as persisted, with its chain hashes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedAuditRecord {
    #[serde(flatten)]
    pub record: AuditRecord,

    /// Hash of the previous line in this file; None for the first line
    pub prev_hash: Option<String>,

    /// sha256 over this record's payload and `prev_hash`
    pub hash: String,
}

fn chain_hash(payload: &str, prev_hash: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    if let Some(prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Append-only audit writer
///
/// Each writer session opens a fresh timestamped file and chains its own
/// lines; rotation starts a new file and a new chain.
pub struct AuditWriter {
    config: AuditWriterConfig,
    file: BufWriter<File>,
    path: PathBuf,
    bytes_written: u64,
    pending: usize,
    last_hash: Option<String>,
}

impl AuditWriter {
    /// Create a writer, opening a new audit file
    pub fn new(config: AuditWriterConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.audit_dir)?;
        let path = next_file_path(&config.audit_dir)?;
        let file = BufWriter::new(OpenOptions::new().create_new(true).append(true).open(&path)?);
        info!(path = %path.display(), "opened audit file");

        Ok(Self {
            config,
            file,
            path,
            bytes_written: 0,
            pending: 0,
            last_hash: None,
        })
    }

    /// Append one record, rotating first if the current file is full
    pub fn append(&mut self, record: &AuditRecord) -> std::io::Result<()> {
        if self.bytes_written >= self.config.max_file_size {
            self.rotate()?;
        }

        let payload = serde_json::to_string(record)?;
        let hash = chain_hash(&payload, self.last_hash.as_deref());
        let persisted = PersistedAuditRecord {
            record: record.clone(),
            prev_hash: self.last_hash.take(),
            hash: hash.clone(),
        };

        let line = serde_json::to_string(&persisted)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.bytes_written += line.len() as u64 + 1;
        self.last_hash = Some(hash);

        self.pending += 1;
        if self.pending >= self.config.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush buffered records to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.pending = 0;
        self.file.flush()
    }

    /// Path of the file currently being written
    pub fn current_path(&self) -> &Path {
        &self.path
    }

    fn rotate(&mut self) -> std::io::Result<()> {
        self.flush()?;
        let path = next_file_path(&self.config.audit_dir)?;
        debug!(path = %path.display(), "rotating audit file");
        self.file = BufWriter::new(OpenOptions::new().create_new(true).append(true).open(&path)?);
        self.path = path;
        self.bytes_written = 0;
        self.last_hash = None;
        Ok(())
    }
}

fn next_file_path(dir: &Path) -> std::io::Result<PathBuf> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| std::io::Error::other(e.to_string()))?
        .as_millis();

    let mut path = dir.join(format!("audit-{millis}.jsonl"));
    let mut counter = 1u32;
    while path.exists() {
        path = dir.join(format!("audit-{millis}-{counter}.jsonl"));
        counter += 1;
    }
    Ok(path)
}

/// Reader over the audit directory
pub struct AuditReader {
    audit_dir: PathBuf,
}

impl AuditReader {
    pub fn new(audit_dir: impl Into<PathBuf>) -> Self {
        Self {
            audit_dir: audit_dir.into(),
        }
    }

    /// The most recent `limit` records, newest last
    pub fn tail(&self, limit: usize) -> std::io::Result<Vec<PersistedAuditRecord>> {
        let mut collected: Vec<PersistedAuditRecord> = Vec::new();

        for path in self.files_newest_first()? {
            let mut file_records = read_records(&path)?;
            file_records.extend(collected);
            collected = file_records;
            if collected.len() >= limit {
                let skip = collected.len() - limit;
                collected.drain(..skip);
                break;
            }
        }

        Ok(collected)
    }

    /// Verify the hash chain of a single audit file
    pub fn verify_file(&self, path: &Path) -> std::io::Result<bool> {
        let mut prev: Option<String> = None;
        for record in read_records(path)? {
            if record.prev_hash != prev {
                return Ok(false);
            }
            let payload = serde_json::to_string(&record.record)?;
            if chain_hash(&payload, prev.as_deref()) != record.hash {
                return Ok(false);
            }
            prev = Some(record.hash);
        }
        Ok(true)
    }

    fn files_newest_first(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.audit_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
            .collect();
        files.sort();
        files.reverse();
        Ok(files)
    }
}

fn read_records(path: &Path) -> std::io::Result<Vec<PersistedAuditRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
