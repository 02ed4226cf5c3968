//! Index Tests
//!
//! Tests verify:
//! - Basic put/get/remove
//! - Key uniqueness on replacement
//! - Capacity bound and insertion-order eviction
//! - Replacement resets a key's eviction position
//! - Sorted, inclusive range queries

use std::num::NonZeroUsize;

use logkv::index::Index;

fn bounded(capacity: usize) -> Index {
    Index::new(NonZeroUsize::new(capacity))
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_index_is_empty() {
    let index = bounded(10);
    assert_eq!(index.len(), 0);
    assert!(index.is_empty());
    assert_eq!(index.capacity(), Some(10));
}

#[test]
fn test_put_and_get() {
    let mut index = bounded(10);

    assert_eq!(index.put("key1".to_string(), 42), None);

    assert_eq!(index.get("key1"), Some(42));
    assert!(index.contains_key("key1"));
}

#[test]
fn test_get_nonexistent_key() {
    let index = bounded(10);
    assert_eq!(index.get("nonexistent"), None);
}

#[test]
fn test_put_replaces_existing() {
    let mut index = bounded(10);

    index.put("key".to_string(), 1);
    index.put("key".to_string(), 2);

    assert_eq!(index.get("key"), Some(2));
    assert_eq!(index.len(), 1);
}

#[test]
fn test_remove() {
    let mut index = bounded(10);
    index.put("key".to_string(), 7);

    assert_eq!(index.remove("key"), Some(7));
    assert_eq!(index.get("key"), None);
    assert!(index.is_empty());
}

#[test]
fn test_remove_nonexistent_key() {
    let mut index = bounded(10);
    assert_eq!(index.remove("missing"), None);
}

// =============================================================================
// Eviction Tests
// =============================================================================

#[test]
fn test_capacity_never_exceeded() {
    let mut index = bounded(10);

    for i in 0..100u64 {
        index.put(format!("key{}", i), i);
        assert!(index.len() <= 10);
    }

    assert_eq!(index.len(), 10);
}

#[test]
fn test_evicts_oldest_inserted() {
    let mut index = bounded(3);

    index.put("a".to_string(), 0);
    index.put("b".to_string(), 1);
    index.put("c".to_string(), 2);
    let evicted = index.put("d".to_string(), 3);

    assert_eq!(evicted, Some("a".to_string()));
    assert_eq!(index.get("a"), None);
    assert_eq!(index.keys().collect::<Vec<_>>(), vec!["b", "c", "d"]);
}

#[test]
fn test_last_n_of_many_survive() {
    let mut index = bounded(10);

    for i in 0..15u64 {
        index.put(format!("key{}", i), i);
    }

    for i in 0..5 {
        assert_eq!(index.get(&format!("key{}", i)), None);
    }
    for i in 5..15u64 {
        assert_eq!(index.get(&format!("key{}", i)), Some(i));
    }
}

#[test]
fn test_replacement_does_not_evict() {
    let mut index = bounded(2);

    index.put("a".to_string(), 0);
    index.put("b".to_string(), 1);

    assert_eq!(index.put("a".to_string(), 2), None);
    assert_eq!(index.len(), 2);
    assert_eq!(index.get("b"), Some(1));
}

#[test]
fn test_replacement_moves_key_to_newest() {
    let mut index = bounded(3);

    index.put("a".to_string(), 0);
    index.put("b".to_string(), 1);
    index.put("c".to_string(), 2);

    // "a" becomes most recent, so "b" is now oldest
    index.put("a".to_string(), 3);
    let evicted = index.put("d".to_string(), 4);

    assert_eq!(evicted, Some("b".to_string()));
    assert_eq!(index.get("a"), Some(3));
    assert_eq!(index.keys().collect::<Vec<_>>(), vec!["c", "a", "d"]);
}

#[test]
fn test_reads_do_not_affect_eviction() {
    let mut index = bounded(2);

    index.put("a".to_string(), 0);
    index.put("b".to_string(), 1);
    index.get("a");
    index.get("a");
    index.put("c".to_string(), 2);

    assert_eq!(index.get("a"), None);
    assert_eq!(index.get("b"), Some(1));
}

#[test]
fn test_remove_frees_a_slot() {
    let mut index = bounded(2);

    index.put("a".to_string(), 0);
    index.put("b".to_string(), 1);
    index.remove("a");

    assert_eq!(index.put("c".to_string(), 2), None);
    assert_eq!(index.get("b"), Some(1));
    assert_eq!(index.get("c"), Some(2));
}

#[test]
fn test_unbounded_never_evicts() {
    let mut index = Index::unbounded();

    for i in 0..1000u64 {
        assert_eq!(index.put(format!("key{}", i), i), None);
    }

    assert_eq!(index.len(), 1000);
    assert_eq!(index.capacity(), None);
    assert_eq!(index.get("key0"), Some(0));
}

// =============================================================================
// Range Tests
// =============================================================================

#[test]
fn test_keys_in_range_sorted_and_inclusive() {
    let mut index = bounded(10);
    for (i, key) in ["d", "a", "c", "b", "e"].iter().enumerate() {
        index.put(key.to_string(), i as u64);
    }

    assert_eq!(index.keys_in_range("b", "d"), vec!["b", "c", "d"]);
}

#[test]
fn test_keys_in_range_empty() {
    let mut index = bounded(10);
    index.put("a".to_string(), 0);

    assert!(index.keys_in_range("x", "z").is_empty());
}

#[test]
fn test_keys_in_range_lexicographic() {
    let mut index = bounded(10);
    for (i, key) in ["key10", "key2", "key1", "key9"].iter().enumerate() {
        index.put(key.to_string(), i as u64);
    }

    // Byte order, not numeric order
    assert_eq!(
        index.keys_in_range("key1", "key9"),
        vec!["key1", "key10", "key2", "key9"]
    );
}

#[test]
fn test_keys_in_range_single_key() {
    let mut index = bounded(10);
    index.put("a".to_string(), 0);
    index.put("b".to_string(), 1);

    assert_eq!(index.keys_in_range("b", "b"), vec!["b"]);
}

#[test]
fn test_keys_in_range_excludes_evicted() {
    let mut index = bounded(2);
    index.put("a".to_string(), 0);
    index.put("b".to_string(), 1);
    index.put("c".to_string(), 2);

    assert_eq!(index.keys_in_range("a", "z"), vec!["b", "c"]);
}
