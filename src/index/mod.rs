//! Index Module
//!
//! In-memory map from key to the log offset of that key's latest record.
//!
//! ## Responsibilities
//! - O(1) point lookups of record offsets
//! - Bounded size with insertion-order eviction
//! - Sorted key ranges computed on demand
//!
//! ## Data Structure Choice
//! HashMap for lookups plus a BTreeMap keyed by insertion sequence:
//! - Replacing a key moves it to the newest position in O(log n)
//! - The oldest-inserted key is always the first sequence entry
//! - Key order is not maintained; range reads filter and sort, which is
//!   cheap because the index is bounded
//!
//! The index knows nothing about tombstones. It only stores offsets; the
//! store decides what a record at an offset means.

mod table;

pub use table::Index;
