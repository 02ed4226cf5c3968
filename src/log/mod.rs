//! Record Log Module
//!
//! The append-only log is the single source of truth for every write ever
//! made. The in-memory index is derived from it and can always be rebuilt.
//!
//! ## Responsibilities
//! - Encode/decode self-delimited, checksummed records
//! - Append records and report the offset each one starts at
//! - Random access reads by offset
//! - Sequential scan for index rebuild, tolerating a torn tail
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Record @ offset 0                       │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ CRC (4) │ Len (4) │ Body (bincode)  │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record @ offset 8 + len₀                │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ CRC (4) │ Len (4) │ Body (bincode)  │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Body is `bincode(Record { key, value })` where value is either a live
//! string or a tombstone.

mod record;
mod file;
mod scanner;
mod recovery;

pub use record::{frame_len, Record, RecordValue, HEADER_SIZE};
pub use file::LogFile;
pub use scanner::LogScanner;
pub use recovery::{LogRecovery, RecoveryResult};
