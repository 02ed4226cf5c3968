//! Log File
//!
//! Append-only record storage addressable by byte offset.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{KvError, Result};

use super::record::{frame_len, HEADER_SIZE};
use super::LogScanner;

/// Append-only log file
///
/// Writes go through an append-mode handle; random reads use a second,
/// read-only handle so appends never move the read cursor and vice versa.
pub struct LogFile {
    /// Location on disk
    path: PathBuf,

    /// Append-mode handle (every write lands at end of file)
    writer: File,

    /// Read handle for `read_at`
    reader: BufReader<File>,

    /// Current length in bytes == offset of the next append
    len: u64,

    sync_strategy: SyncStrategy,

    /// Appends since the last fsync
    unsynced: usize,

    /// Set when appending could leave a record replay cannot reach
    read_only: Option<String>,
}

impl LogFile {
    /// Open or create the log at `path`
    ///
    /// Missing parent directories are created. A missing file is an empty
    /// log, not an error.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let writer = OpenOptions::new().create(true).append(true).open(path)?;
        let len = writer.metadata()?.len();
        let reader = BufReader::new(File::open(path)?);

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            reader,
            len,
            sync_strategy,
            unsynced: 0,
            read_only: None,
        })
    }

    /// Append `bytes` and return the offset they start at
    ///
    /// If the write or its fsync fails, the file is cut back to its previous
    /// length and the error returned, so a failed append leaves no trace.
    /// If even that cut fails, the log turns read-only.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        if let Some(reason) = &self.read_only {
            return Err(KvError::ReadOnly(reason.clone()));
        }

        let offset = self.len;
        let unsynced = self.unsynced;

        if let Err(e) = self.write_frame(bytes) {
            self.rollback(offset, unsynced);
            return Err(e);
        }

        Ok(offset)
    }

    /// Read the complete frame starting at `offset`
    pub fn read_at(&mut self, offset: u64) -> Result<Vec<u8>> {
        let header_end = offset.saturating_add(HEADER_SIZE as u64);
        if header_end > self.len {
            return Err(KvError::TruncatedRecord { offset });
        }

        self.reader.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header)?;

        let total_len = frame_len(&header);
        if offset.saturating_add(total_len) > self.len {
            return Err(KvError::TruncatedRecord { offset });
        }

        let mut frame = vec![0u8; total_len as usize];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        self.reader.read_exact(&mut frame[HEADER_SIZE..])?;

        Ok(frame)
    }

    /// Scan every frame from offset 0, on a fresh read handle
    pub fn scan_all(&self) -> Result<LogScanner> {
        LogScanner::open(&self.path)
    }

    /// Force all appended data to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Cut the log back to `valid_len` bytes
    ///
    /// `valid_len` is the end of the last record replay reached. Returns the
    /// number of bytes removed.
    pub fn truncate_to(&mut self, valid_len: u64) -> Result<u64> {
        if valid_len >= self.len {
            return Ok(0);
        }

        let removed = self.len - valid_len;
        self.writer.set_len(valid_len)?;
        self.writer.sync_all()?;
        self.len = valid_len;
        self.unsynced = 0;

        Ok(removed)
    }

    /// Refuse every further append with `reason`
    pub fn set_read_only(&mut self, reason: impl Into<String>) {
        self.read_only = Some(reason.into());
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.is_some()
    }

    /// Current length of the log in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn should_sync(&self) -> bool {
        match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        }
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.len += bytes.len() as u64;
        self.unsynced += 1;

        if self.should_sync() {
            self.sync()?;
        }

        Ok(())
    }

    fn rollback(&mut self, offset: u64, unsynced: usize) {
        match self.writer.set_len(offset) {
            Ok(()) => {
                self.len = offset;
                self.unsynced = unsynced;
                tracing::warn!(offset, "Append failed, written bytes removed");
            }
            Err(e) => {
                tracing::error!(
                    offset,
                    "Append failed and its bytes could not be removed, log is now read-only: {}",
                    e
                );
                self.read_only = Some(format!(
                    "failed append at offset {} could not be rolled back",
                    offset
                ));
            }
        }
    }
}
