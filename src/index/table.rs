//! Index implementation
//!
//! Bounded key → offset map with insertion-order eviction.

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;

/// Location of a key's latest record plus its insertion position
#[derive(Debug, Clone, Copy)]
struct Slot {
    offset: u64,
    seq: u64,
}

/// Key → offset index
pub struct Index {
    /// Max keys held (`None` = unbounded)
    capacity: Option<NonZeroUsize>,

    /// key → (offset, insertion sequence)
    entries: HashMap<String, Slot>,

    /// insertion sequence → key, oldest first
    order: BTreeMap<u64, String>,

    /// Sequence number handed to the next insert
    next_seq: u64,
}

impl Index {
    /// Create an empty index holding at most `capacity` keys
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Create an empty index that never evicts
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Map `key` to `offset`
    ///
    /// An existing key is replaced and becomes the most recently inserted;
    /// nothing is evicted. A new key inserted at capacity first evicts the
    /// oldest-inserted key, which is returned.
    pub fn put(&mut self, key: String, offset: u64) -> Option<String> {
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some(slot) = self.entries.get_mut(&key) {
            self.order.remove(&slot.seq);
            *slot = Slot { offset, seq };
            self.order.insert(seq, key);
            return None;
        }

        let evicted = if self.is_full() {
            self.evict_oldest()
        } else {
            None
        };

        self.order.insert(seq, key.clone());
        self.entries.insert(key, Slot { offset, seq });

        evicted
    }

    /// Offset of the latest record for `key`
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|slot| slot.offset)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop the mapping for `key`, returning its offset
    pub fn remove(&mut self, key: &str) -> Option<u64> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.seq);
        Some(slot.offset)
    }

    /// Keys with `start <= key <= end`, ascending
    pub fn keys_in_range(&self, start: &str, end: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| key.as_str() >= start && key.as_str() <= end)
            .cloned()
            .collect();
        keys.sort_unstable();
        keys
    }

    /// All keys in insertion order, oldest first
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity.map(NonZeroUsize::get)
    }

    fn is_full(&self) -> bool {
        match self.capacity {
            Some(capacity) => self.entries.len() >= capacity.get(),
            None => false,
        }
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::unbounded()
    }
}
