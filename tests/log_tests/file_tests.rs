//! Tests for the Log File
//!
//! These tests verify:
//! - Creation of missing files and directories
//! - Offset bookkeeping on append
//! - Random reads by offset
//! - Sequential scans, including torn tails
//! - Tail truncation
//! - Read-only mode after an append that cannot be undone

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use logkv::config::SyncStrategy;
use logkv::log::{LogFile, Record};
use logkv::KvError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("test.db");
    (temp_dir, log_path)
}

fn open(path: &PathBuf) -> LogFile {
    LogFile::open(path, SyncStrategy::EveryWrite).unwrap()
}

fn frame(key: &str, value: &str) -> Vec<u8> {
    Record::put(key, value).encode().unwrap()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_file() {
    let (_temp, path) = setup_temp_log();

    let log = open(&path);

    assert!(path.exists());
    assert!(log.is_empty());
    assert_eq!(log.len(), 0);
    assert_eq!(log.path(), path.as_path());
}

#[test]
fn test_open_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("deeper").join("data.db");

    let _log = open(&path);

    assert!(path.exists());
}

#[test]
fn test_open_existing_reports_length() {
    let (_temp, path) = setup_temp_log();
    let bytes = frame("k", "v");

    {
        let mut log = open(&path);
        log.append(&bytes).unwrap();
    }

    let log = open(&path);
    assert_eq!(log.len(), bytes.len() as u64);
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_append_returns_start_offsets() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);

    let a = frame("a", "1");
    let b = frame("bb", "22");
    let c = frame("ccc", "333");

    assert_eq!(log.append(&a).unwrap(), 0);
    assert_eq!(log.append(&b).unwrap(), a.len() as u64);
    assert_eq!(log.append(&c).unwrap(), (a.len() + b.len()) as u64);
    assert_eq!(log.len(), (a.len() + b.len() + c.len()) as u64);
}

#[test]
fn test_append_after_reopen_continues_at_end() {
    let (_temp, path) = setup_temp_log();
    let a = frame("a", "1");

    {
        let mut log = open(&path);
        log.append(&a).unwrap();
    }

    let mut log = open(&path);
    let offset = log.append(&frame("b", "2")).unwrap();
    assert_eq!(offset, a.len() as u64);
}

#[test]
fn test_append_never_changes_earlier_bytes() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);

    let a = frame("a", "1");
    log.append(&a).unwrap();
    let before = std::fs::read(&path).unwrap();

    log.append(&frame("a", "2")).unwrap();
    let after = std::fs::read(&path).unwrap();

    assert_eq!(&after[..before.len()], before.as_slice());
}

#[test]
fn test_append_with_batched_sync() {
    let (_temp, path) = setup_temp_log();
    let mut log = LogFile::open(&path, SyncStrategy::EveryNEntries { count: 3 }).unwrap();

    for i in 0..10 {
        log.append(&frame(&format!("k{}", i), "v")).unwrap();
    }
    log.sync().unwrap();

    assert_eq!(std::fs::metadata(&path).unwrap().len(), log.len());
}

// =============================================================================
// Read Tests
// =============================================================================

#[test]
fn test_read_at_returns_exact_frame() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);

    let a = frame("a", "1");
    let b = frame("b", "2");
    log.append(&a).unwrap();
    let offset = log.append(&b).unwrap();

    assert_eq!(log.read_at(offset).unwrap(), b);
    assert_eq!(log.read_at(0).unwrap(), a);
}

#[test]
fn test_read_at_sees_later_appends() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);

    log.append(&frame("a", "1")).unwrap();
    log.read_at(0).unwrap();

    let offset = log.append(&frame("b", "2")).unwrap();
    let (record, _) = Record::decode(&log.read_at(offset).unwrap()).unwrap();
    assert_eq!(record, Record::put("b", "2"));
}

#[test]
fn test_read_at_past_end() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);
    log.append(&frame("a", "1")).unwrap();

    let result = log.read_at(10_000);
    assert!(matches!(result, Err(KvError::TruncatedRecord { offset: 10_000 })));
}

#[test]
fn test_read_at_huge_offset() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);

    let result = log.read_at(u64::MAX);
    assert!(matches!(result, Err(KvError::TruncatedRecord { .. })));
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_empty_log() {
    let (_temp, path) = setup_temp_log();
    let log = open(&path);

    assert_eq!(log.scan_all().unwrap().count(), 0);
}

#[test]
fn test_scan_yields_all_frames_in_order() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);

    let mut expected = Vec::new();
    for i in 0..5 {
        let bytes = frame(&format!("key{}", i), &format!("value{}", i));
        let offset = log.append(&bytes).unwrap();
        expected.push((offset, bytes));
    }

    let scanned: Vec<(u64, Vec<u8>)> = log.scan_all().unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(scanned, expected);
}

#[test]
fn test_scan_is_restartable() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);
    log.append(&frame("a", "1")).unwrap();
    log.append(&frame("b", "2")).unwrap();

    assert_eq!(log.scan_all().unwrap().count(), 2);
    assert_eq!(log.scan_all().unwrap().count(), 2);
}

#[test]
fn test_scan_stops_at_torn_tail() {
    let (_temp, path) = setup_temp_log();
    let complete = frame("a", "1");
    let torn = frame("b", "2");

    {
        let mut log = open(&path);
        log.append(&complete).unwrap();
    }
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&torn[..torn.len() - 2]).unwrap();
    }

    let log = open(&path);
    let mut scanner = log.scan_all().unwrap();

    assert_eq!(scanner.next().unwrap().unwrap(), (0, complete.clone()));
    assert_eq!(scanner.position(), complete.len() as u64);

    let err = scanner.next().unwrap();
    assert!(matches!(err, Err(KvError::TruncatedRecord { offset }) if offset == complete.len() as u64));
    assert!(scanner.next().is_none());
}

#[test]
fn test_scan_partial_header() {
    let (_temp, path) = setup_temp_log();
    std::fs::write(&path, [0u8; 3]).unwrap();

    let log = open(&path);
    let items: Vec<_> = log.scan_all().unwrap().collect();

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(KvError::TruncatedRecord { offset: 0 })));
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncate_to() {
    let (_temp, path) = setup_temp_log();
    let complete = frame("a", "1");

    {
        let mut log = open(&path);
        log.append(&complete).unwrap();
        log.append(&[1, 2, 3]).unwrap();
    }

    let mut log = open(&path);
    let removed = log.truncate_to(complete.len() as u64).unwrap();

    assert_eq!(removed, 3);
    assert_eq!(log.len(), complete.len() as u64);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), complete.len() as u64);

    // Appends continue right after the last complete record
    let offset = log.append(&frame("b", "2")).unwrap();
    assert_eq!(offset, complete.len() as u64);
}

#[test]
fn test_truncate_noop_when_clean() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);
    let bytes = frame("a", "1");
    log.append(&bytes).unwrap();

    assert_eq!(log.truncate_to(bytes.len() as u64).unwrap(), 0);
    assert_eq!(log.len(), bytes.len() as u64);
}

// =============================================================================
// Read-Only Tests
// =============================================================================

#[test]
fn test_read_only_rejects_appends() {
    let (_temp, path) = setup_temp_log();
    let mut log = open(&path);
    let bytes = frame("a", "1");
    log.append(&bytes).unwrap();

    log.set_read_only("maintenance");

    let result = log.append(&frame("b", "2"));
    assert!(matches!(result, Err(KvError::ReadOnly(ref reason)) if reason == "maintenance"));
    assert!(log.is_read_only());
    assert_eq!(log.len(), bytes.len() as u64);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), bytes.len() as u64);

    // Reads are unaffected
    assert_eq!(log.read_at(0).unwrap(), bytes);
}

#[cfg(target_os = "linux")]
#[test]
fn test_failed_append_that_cannot_be_undone_turns_read_only() {
    // Writes to /dev/full fail with ENOSPC and it cannot be truncated
    let path = std::path::Path::new("/dev/full");
    if !path.exists() {
        return;
    }
    let mut log = LogFile::open(path, SyncStrategy::EveryWrite).unwrap();

    let first = log.append(&frame("a", "1"));
    assert!(matches!(first, Err(KvError::Io(_))));
    assert!(log.is_read_only());

    let second = log.append(&frame("b", "2"));
    assert!(matches!(second, Err(KvError::ReadOnly(_))));
}
