//! Collection Log
//!
//! Append-only log that makes a collection durable.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ CRC (4) │ Len (4) │ bincode payload │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2 ...                            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! CRC and length are little-endian; the CRC covers the payload only.
//! Replay stops at the first short or corrupt record and the file is cut
//! back to the last good record before new records are appended.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::SyncPolicy;
use crate::error::{Result, VaultError};
use crate::DocumentId;

/// Bytes before each payload: crc (4) + len (4)
pub const RECORD_HEADER_SIZE: usize = 8;

/// Upper bound on a single record payload (64 MB)
pub const MAX_RECORD_SIZE: u32 = 64 * 1024 * 1024;

/// One logged mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecord {
    /// Document created with this ID and JSON bytes
    Insert { id: DocumentId, doc: Vec<u8> },

    /// Document replaced
    Update { id: DocumentId, doc: Vec<u8> },

    /// Document removed
    Delete { id: DocumentId },
}

impl LogRecord {
    pub fn id(&self) -> DocumentId {
        match self {
            LogRecord::Insert { id, .. } | LogRecord::Update { id, .. } | LogRecord::Delete { id } => {
                *id
            }
        }
    }

    /// Serialize with header: crc (4) + len (4) + payload
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(self)?;
        if payload.len() > MAX_RECORD_SIZE as usize {
            return Err(VaultError::Serialization(format!(
                "Record too large: {} bytes (max {})",
                payload.len(),
                MAX_RECORD_SIZE
            )));
        }

        let crc = crc32fast::hash(&payload);
        let mut bytes = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode the record at the start of `bytes`
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < RECORD_HEADER_SIZE {
            return Err(VaultError::Corruption(format!(
                "Incomplete record header: {} bytes",
                bytes.len()
            )));
        }

        let crc = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if len > MAX_RECORD_SIZE {
            return Err(VaultError::Corruption(format!("Record length {} too large", len)));
        }

        let end = RECORD_HEADER_SIZE + len as usize;
        if bytes.len() < end {
            return Err(VaultError::Corruption(format!(
                "Incomplete record payload: expected {} bytes, got {}",
                len,
                bytes.len() - RECORD_HEADER_SIZE
            )));
        }

        let payload = &bytes[RECORD_HEADER_SIZE..end];
        if crc32fast::hash(payload) != crc {
            return Err(VaultError::Corruption("CRC mismatch".to_string()));
        }

        let record = bincode::deserialize(payload)?;
        Ok((record, end))
    }
}

/// Result of replaying a log file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Records successfully replayed
    pub records_recovered: u64,

    /// Bytes of valid log
    pub valid_len: u64,

    /// Whether a damaged tail was cut off
    pub was_truncated: bool,
}

/// Read every valid record of `path` without modifying it
pub fn replay(path: &Path) -> Result<(Vec<LogRecord>, RecoveryStats)> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok((Vec::new(), RecoveryStats::default()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        match LogRecord::decode(&bytes[offset..]) {
            Ok((record, used)) => {
                records.push(record);
                offset += used;
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    offset,
                    error = %e,
                    "collection log: stopping replay at damaged record"
                );
                break;
            }
        }
    }

    let stats = RecoveryStats {
        records_recovered: records.len() as u64,
        valid_len: offset as u64,
        was_truncated: offset < bytes.len(),
    };
    Ok((records, stats))
}

/// Appends records to a collection log
pub struct DocLog {
    path: PathBuf,
    writer: BufWriter<File>,
    policy: SyncPolicy,
    unsynced: usize,

    /// Records in the file, live or superseded
    records: u64,
}

impl DocLog {
    /// Open (or create) a log, replaying what is already there
    ///
    /// A damaged tail is truncated so new records follow the last good one.
    pub fn open(path: &Path, policy: SyncPolicy) -> Result<(Self, Vec<LogRecord>, RecoveryStats)> {
        let (records, stats) = replay(path)?;

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if stats.was_truncated {
            file.set_len(stats.valid_len)?;
            file.sync_all()?;
        }

        let log = Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            policy,
            unsynced: 0,
            records: stats.records_recovered,
        };
        Ok((log, records, stats))
    }

    /// Append one record, syncing per policy
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        let bytes = record.encode()?;
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;
        self.unsynced += 1;
        self.records += 1;

        let due = match self.policy {
            SyncPolicy::EveryWrite => true,
            SyncPolicy::EveryNEntries { count } => self.unsynced >= count.max(1),
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Flush buffers and fsync
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Replace the log with `records` (written to a temp file, then renamed)
    pub fn rewrite(&mut self, records: &[LogRecord]) -> Result<()> {
        let tmp_path = self.path.with_extension("log.tmp");
        {
            let mut tmp = BufWriter::new(File::create(&tmp_path)?);
            for record in records {
                tmp.write_all(&record.encode()?)?;
            }
            tmp.flush()?;
            tmp.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.unsynced = 0;
        self.records = records.len() as u64;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records in the file since it was opened or last rewritten
    pub fn record_count(&self) -> u64 {
        self.records
    }
}
