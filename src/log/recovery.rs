//! Log Recovery
//!
//! Replays the log at startup and verifies log files offline.

use std::path::Path;

use crate::error::{KvError, Result};

use crate::config::SyncStrategy;

use super::{LogFile, LogScanner, Record};

/// Replays and verifies record logs
pub struct LogRecovery;

/// Result of a replay or verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of valid records replayed (tombstones included)
    pub records_recovered: u64,

    /// How many of those records were tombstones
    pub tombstones: u64,

    /// End offset of the last valid record
    pub valid_len: u64,

    /// The log ends with an incomplete frame (interrupted append)
    pub torn_tail: bool,

    /// Offset of the first complete frame that failed to decode
    pub corrupted_at: Option<u64>,
}

impl RecoveryResult {
    /// No torn tail and no corruption
    pub fn is_clean(&self) -> bool {
        !self.torn_tail && self.corrupted_at.is_none()
    }
}

impl LogRecovery {
    /// Replay every valid record of `log` in file order
    ///
    /// `apply` receives each record with the offset it starts at. The scan
    /// stops at the first torn or corrupt frame; everything before it is
    /// still applied. Only I/O failures abort the replay.
    pub fn replay<F>(log: &LogFile, apply: F) -> Result<RecoveryResult>
    where
        F: FnMut(u64, Record),
    {
        let result = Self::scan(log.scan_all()?, apply)?;

        if let Some(offset) = result.corrupted_at {
            tracing::warn!(
                offset,
                "Log corruption detected; replay stopped after {} records",
                result.records_recovered
            );
        }
        if result.torn_tail {
            tracing::warn!(
                offset = result.valid_len,
                "Log ends with an incomplete record (interrupted append)"
            );
        }

        Ok(result)
    }

    /// Verify the integrity of a log file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(LogScanner::open(path)?, |_, _| {})
    }

    /// Cut the log at `path` back to its last valid record
    ///
    /// Drops a torn tail and, after corruption, the corrupt record with
    /// everything behind it. Returns the scan result and the bytes removed.
    pub fn repair(path: &Path) -> Result<(RecoveryResult, u64)> {
        let result = Self::scan(LogScanner::open(path)?, |_, _| {})?;
        let mut log = LogFile::open(path, SyncStrategy::EveryWrite)?;
        let removed = log.truncate_to(result.valid_len)?;

        if removed > 0 {
            tracing::warn!(
                path = %path.display(),
                offset = result.valid_len,
                "Repair removed {} bytes from the log",
                removed
            );
        }

        Ok((result, removed))
    }

    fn scan<F>(scanner: LogScanner, mut apply: F) -> Result<RecoveryResult>
    where
        F: FnMut(u64, Record),
    {
        let mut result = RecoveryResult::default();

        for item in scanner {
            // Frames are contiguous from offset 0, so a failure always sits at valid_len
            let decoded = item.and_then(|(offset, frame)| {
                let (record, len) = Record::decode(&frame)?;
                Ok((offset, record, len as u64))
            });

            match decoded {
                Ok((offset, record, len)) => {
                    result.records_recovered += 1;
                    if record.is_tombstone() {
                        result.tombstones += 1;
                    }
                    result.valid_len = offset + len;
                    apply(offset, record);
                }
                Err(KvError::TruncatedRecord { .. }) => {
                    result.torn_tail = true;
                    break;
                }
                Err(KvError::CorruptRecord(reason)) => {
                    tracing::debug!(offset = result.valid_len, "Undecodable record: {}", reason);
                    result.corrupted_at = Some(result.valid_len);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(result)
    }
}
