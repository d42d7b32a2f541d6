//! Tests for the collection log
//!
//! These tests verify:
//! - Appended records replay in order
//! - A torn tail is detected and truncated
//! - CRC mismatches stop replay
//! - Rewrite replaces the log contents

use std::fs::OpenOptions;
use std::io::Write;

use shardvault::collection::log::{replay, RECORD_HEADER_SIZE};
use shardvault::collection::{DocLog, LogRecord};
use shardvault::config::SyncPolicy;
use shardvault::VaultError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_records() -> Vec<LogRecord> {
    vec![
        LogRecord::Insert {
            id: 1,
            doc: br#"{"a":1}"#.to_vec(),
        },
        LogRecord::Insert {
            id: 2,
            doc: br#"{"b":2}"#.to_vec(),
        },
        LogRecord::Update {
            id: 1,
            doc: br#"{"a":3}"#.to_vec(),
        },
        LogRecord::Delete { id: 2 },
    ]
}

fn write_log(temp: &TempDir, records: &[LogRecord]) -> std::path::PathBuf {
    let path = temp.path().join("notes.log");
    let (mut log, replayed, _) = DocLog::open(&path, SyncPolicy::EveryWrite).unwrap();
    assert!(replayed.is_empty());
    for record in records {
        log.append(record).unwrap();
    }
    path
}

// =============================================================================
// Record Tests
// =============================================================================

#[test]
fn test_record_header_layout() {
    let record = LogRecord::Delete { id: 7 };
    let bytes = record.encode().unwrap();

    let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    assert_eq!(bytes.len(), RECORD_HEADER_SIZE + len);

    let crc = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    assert_eq!(crc, crc32fast::hash(&bytes[RECORD_HEADER_SIZE..]));

    let (decoded, used) = LogRecord::decode(&bytes).unwrap();
    assert_eq!(decoded, record);
    assert_eq!(used, bytes.len());
}

#[test]
fn test_decode_detects_flipped_bit() {
    let mut bytes = LogRecord::Insert {
        id: 3,
        doc: b"{}".to_vec(),
    }
    .encode()
    .unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;

    let err = LogRecord::decode(&bytes).unwrap_err();
    assert!(matches!(err, VaultError::Corruption(_)));
}

#[test]
fn test_decode_short_input() {
    assert!(matches!(
        LogRecord::decode(&[1, 2, 3]).unwrap_err(),
        VaultError::Corruption(_)
    ));
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_replay_in_append_order() {
    let temp = TempDir::new().unwrap();
    let path = write_log(&temp, &sample_records());

    let (records, stats) = replay(&path).unwrap();

    assert_eq!(records, sample_records());
    assert_eq!(stats.records_recovered, 4);
    assert!(!stats.was_truncated);
    assert_eq!(stats.valid_len, std::fs::metadata(&path).unwrap().len());
}

#[test]
fn test_replay_missing_file_is_empty() {
    let temp = TempDir::new().unwrap();

    let (records, stats) = replay(&temp.path().join("absent.log")).unwrap();

    assert!(records.is_empty());
    assert_eq!(stats.records_recovered, 0);
}

#[test]
fn test_torn_tail_is_truncated_on_open() {
    let temp = TempDir::new().unwrap();
    let path = write_log(&temp, &sample_records());
    let good_len = std::fs::metadata(&path).unwrap().len();

    // half a record
    let partial = LogRecord::Insert {
        id: 9,
        doc: br#"{"torn":true}"#.to_vec(),
    }
    .encode()
    .unwrap();
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&partial[..partial.len() / 2]).unwrap();
    }

    let (mut log, records, stats) = DocLog::open(&path, SyncPolicy::EveryWrite).unwrap();
    assert_eq!(records, sample_records());
    assert!(stats.was_truncated);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);

    // New records land right after the last good one
    log.append(&LogRecord::Delete { id: 1 }).unwrap();
    drop(log);

    let (records, stats) = replay(&path).unwrap();
    assert_eq!(records.len(), 5);
    assert_eq!(records[4], LogRecord::Delete { id: 1 });
    assert!(!stats.was_truncated);
}

#[test]
fn test_corrupt_record_stops_replay() {
    let temp = TempDir::new().unwrap();
    let path = write_log(&temp, &sample_records());

    let first_len = sample_records()[0].encode().unwrap().len();
    let mut bytes = std::fs::read(&path).unwrap();
    // Damage the payload of the second record
    bytes[first_len + RECORD_HEADER_SIZE] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    let (records, stats) = replay(&path).unwrap();

    assert_eq!(records, vec![sample_records()[0].clone()]);
    assert!(stats.was_truncated);
    assert_eq!(stats.valid_len, first_len as u64);
}

// =============================================================================
// Rewrite Tests
// =============================================================================

#[test]
fn test_rewrite_replaces_contents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("notes.log");
    let (mut log, _, _) = DocLog::open(&path, SyncPolicy::EveryWrite).unwrap();
    for record in sample_records() {
        log.append(&record).unwrap();
    }

    let compacted = vec![LogRecord::Insert {
        id: 1,
        doc: br#"{"a":3}"#.to_vec(),
    }];
    log.rewrite(&compacted).unwrap();
    log.append(&LogRecord::Delete { id: 2 }).unwrap();
    drop(log);

    let (records, _) = replay(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], compacted[0]);
    assert_eq!(records[1], LogRecord::Delete { id: 2 });
    assert!(!temp.path().join("notes.log.tmp").exists());
}
