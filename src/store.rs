//! Store Module
//!
//! The storage engine that ties the record log to the in-memory index.
//!
//! ## Responsibilities
//! - Append every write to the log before indexing it
//! - Serve reads by index lookup + one seek into the log
//! - Treat tombstones as absence
//! - Rebuild the index from the log on startup

use std::io;
use std::num::NonZeroUsize;
use std::path::Path;

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::index::Index;
use crate::log::{LogFile, LogRecovery, Record, RecordValue};
use crate::protocol::{encode_pairs, Command};

/// The main storage engine
///
/// ## Concurrency Model: Single Critical Section
///
/// - **Log** (`Mutex<LogFile>`): held by every operation that touches the
///   log. Writes need it to append, reads need it to seek the shared read
///   handle. This makes it the write lock as well.
/// - **Index** (`RwLock<Index>`): only written while the log mutex is held.
///   Reads look up the offset while holding the log mutex, so a lookup and
///   the following `read_at` can never straddle a replacement or eviction.
///
/// Lock order is always log → index.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Append-only record log (exclusive access needed)
    log: Mutex<LogFile>,

    /// Key → offset of latest record
    index: RwLock<Index>,
}

impl Store {
    /// Open or create a store with the given config
    ///
    /// On startup:
    /// 1. Validate config
    /// 2. Open/create the log (and its directory)
    /// 3. Replay the log into a fresh index
    /// 4. Cut a torn tail left by an interrupted append, or go read-only
    ///    when a corrupt record hides the rest of the log
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Index capacity must be positive when bounded
        let capacity = match config.max_entries {
            Some(0) => {
                return Err(KvError::Config(
                    "max_entries must be greater than zero".to_string(),
                ))
            }
            Some(n) => NonZeroUsize::new(n),
            None => None,
        };

        // Step 2: Open the log (missing file = empty log)
        let mut log = LogFile::open(&config.path, config.sync_strategy)?;

        // Step 3: Replay. Live records are indexed, tombstones unindexed.
        let mut index = Index::new(capacity);
        let recovery = LogRecovery::replay(&log, |offset, record| match record.value {
            RecordValue::Value(_) => {
                index.put(record.key, offset);
            }
            RecordValue::Tombstone => {
                index.remove(&record.key);
            }
        })?;

        // Step 4: New appends must land where the next replay can reach them.
        // A torn tail is cut; a corrupt record leaves the log read-only.
        if let Some(offset) = recovery.corrupted_at {
            tracing::warn!(
                offset,
                "Corrupt record stops replay; store opened read-only (run `logkv-cli repair`)"
            );
            log.set_read_only(format!(
                "corrupt record at offset {} stops replay; repair the log to accept writes",
                offset
            ));
        } else if recovery.torn_tail {
            let removed = log.truncate_to(recovery.valid_len)?;
            tracing::warn!(
                offset = recovery.valid_len,
                "Removed {} bytes of incomplete record from log tail",
                removed
            );
        }

        tracing::info!(
            path = %config.path.display(),
            records = recovery.records_recovered,
            tombstones = recovery.tombstones,
            indexed = index.len(),
            "Store opened"
        );

        Ok(Self {
            config,
            log: Mutex::new(log),
            index: RwLock::new(index),
        })
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::Get { key } => Ok(Some(self.read(&key)?.into_bytes())),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some(b"PONG".to_vec())),
            Command::BatchPut { keys, values } => {
                self.batch_put(&keys, &values)?;
                Ok(None)
            }
            Command::Range { start, end } => {
                let pairs = self.read_key_range(&start, &end)?;
                Ok(Some(encode_pairs(&pairs)))
            }
        }
    }

    /// Put a key-value pair
    ///
    /// Steps:
    /// 1. Encode the record (outside the lock)
    /// 2. Append to the log
    /// 3. Point the index at the new record
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let frame = Record::put(key, value).encode()?;

        let mut log = self.log.lock();
        let offset = log.append(&frame)?;
        self.index_record(key, offset);

        tracing::trace!(key, offset, "put");
        Ok(())
    }

    /// Get the value stored under `key`
    ///
    /// Missing, deleted and evicted keys are all `KeyNotFound`.
    pub fn read(&self, key: &str) -> Result<String> {
        let mut log = self.log.lock();
        let offset = self.index.read().get(key).ok_or(KvError::KeyNotFound)?;

        match Self::load(&mut log, key, offset)? {
            RecordValue::Value(value) => Ok(value),
            RecordValue::Tombstone => Err(KvError::KeyNotFound),
        }
    }

    /// Delete a key
    ///
    /// Steps:
    /// 1. Check the key is live (indexed and not already a tombstone)
    /// 2. Append a tombstone
    /// 3. Index the tombstone exactly like a put
    pub fn delete(&self, key: &str) -> Result<()> {
        let frame = Record::tombstone(key).encode()?;

        let mut log = self.log.lock();
        let offset = self.index.read().get(key).ok_or(KvError::KeyNotFound)?;

        if let RecordValue::Tombstone = Self::load(&mut log, key, offset)? {
            return Err(KvError::KeyNotFound);
        }

        let offset = log.append(&frame)?;
        self.index_record(key, offset);

        tracing::trace!(key, offset, "delete");
        Ok(())
    }

    /// Put many key-value pairs
    ///
    /// All-or-nothing: lengths are checked and every record is encoded
    /// before anything is written, and the batch goes to the log in a
    /// single append. Later duplicates of a key win.
    pub fn batch_put<K, V>(&self, keys: &[K], values: &[V]) -> Result<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if keys.len() != values.len() {
            return Err(KvError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        if keys.is_empty() {
            return Ok(());
        }

        // Encode everything up front; remember where each frame starts
        let mut batch = Vec::new();
        let mut relative_offsets = Vec::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(values) {
            relative_offsets.push(batch.len() as u64);
            batch.extend_from_slice(&Record::put(key.as_ref(), value.as_ref()).encode()?);
        }

        let mut log = self.log.lock();
        let base = log.append(&batch)?;

        for (key, relative) in keys.iter().zip(relative_offsets) {
            self.index_record(key.as_ref(), base + relative);
        }

        tracing::trace!(count = keys.len(), offset = base, "batch put");
        Ok(())
    }

    /// Read every live pair with `start <= key <= end`, ascending by key
    ///
    /// Tombstoned keys are skipped. Keys evicted from the index are absent
    /// even though their records remain in the log.
    pub fn read_key_range(&self, start: &str, end: &str) -> Result<Vec<(String, String)>> {
        if start > end {
            return Err(KvError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let mut log = self.log.lock();
        let index = self.index.read();

        let mut pairs = Vec::new();
        for key in index.keys_in_range(start, end) {
            let Some(offset) = index.get(&key) else {
                continue;
            };
            if let RecordValue::Value(value) = Self::load(&mut log, &key, offset)? {
                pairs.push((key, value));
            }
        }

        Ok(pairs)
    }

    /// Force all appended records to disk
    pub fn sync(&self) -> Result<()> {
        self.log.lock().sync()
    }

    /// Close the store gracefully
    ///
    /// Syncs the log so every acknowledged write is on disk
    pub fn close(self) -> Result<()> {
        let mut log = self.log.into_inner();
        log.sync()?;

        tracing::debug!(path = %log.path().display(), "Store closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of keys currently indexed (tombstones included)
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Whether `key` currently has an index entry
    pub fn is_indexed(&self, key: &str) -> bool {
        self.index.read().contains_key(key)
    }

    /// Whether the log refuses writes (see `LogFile::set_read_only`)
    pub fn is_read_only(&self) -> bool {
        self.log.lock().is_read_only()
    }

    /// Current log size in bytes
    pub fn log_size(&self) -> u64 {
        self.log.lock().len()
    }

    /// Get the log file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Point `key` at `offset`, logging any eviction (log mutex must be held)
    fn index_record(&self, key: &str, offset: u64) {
        if let Some(evicted) = self.index.write().put(key.to_string(), offset) {
            tracing::debug!(key = %evicted, "Evicted key from index");
        }
    }

    /// Decode the record an index entry points at
    ///
    /// A bad frame or a key mismatch means the index points at garbage,
    /// which is reported as an I/O failure of this operation.
    fn load(log: &mut LogFile, key: &str, offset: u64) -> Result<RecordValue> {
        let frame = log.read_at(offset).map_err(|e| match e {
            KvError::TruncatedRecord { .. } => index_corruption(key, offset, e),
            other => other,
        })?;
        let (record, _) = Record::decode(&frame).map_err(|e| index_corruption(key, offset, e))?;

        if record.key != key {
            return Err(index_corruption(
                key,
                offset,
                format!("record belongs to key {:?}", record.key),
            ));
        }

        Ok(record.value)
    }
}

fn index_corruption(key: &str, offset: u64, reason: impl std::fmt::Display) -> KvError {
    tracing::warn!(key, offset, "Index points at an unreadable record: {}", reason);
    KvError::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("record for key {:?} at offset {}: {}", key, offset, reason),
    ))
}
