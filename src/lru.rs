//! Capacity-bounded, recency-ordered key -> value cache.
//!
//! Grounded on `lru.h`'s `HashMap` + intrusive list and on this crate's
//! own `RangeCache` (`http.rs`), generalized into a standalone type. It is
//! not wired into the read path: the remote reader consumes the HTTP
//! range client and the ring buffer directly, chunk by chunk, and has no
//! use for a recency cache of its own. This type is exported as a utility
//! for callers who want one (e.g. layering a cross-open response cache on
//! top of `HttpFileSystem`), matching the unused-but-present LRU in the
//! original source.

use ahash::AHashMap as HashMap;
use std::collections::VecDeque;
use std::hash::Hash;

pub struct LruCache<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn has(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Insert or replace `key`, moving it to the front. Evicts from the
    /// back until the map is within capacity again.
    pub fn insert(&mut self, key: K, value: V) {
        if self.map.remove(&key).is_some() {
            self.remove_from_order(&key);
        }

        self.map.insert(key.clone(), value);
        self.order.push_front(key);
        self.evict();
    }

    /// Move `key` to the front and return its value.
    ///
    /// # Panics
    /// Panics if `key` is not present — calling `get` without first
    /// checking `has` is a programming error, matching `lru.h`'s
    /// `CRASH_COND`. Use [`Self::get_ptr`] when absence is a normal case.
    pub fn get(&mut self, key: &K) -> &V {
        assert!(
            self.map.contains_key(key),
            "LruCache::get called with an absent key"
        );
        self.touch(key);
        self.map.get(key).expect("checked above")
    }

    /// Same as [`Self::get`], but returns `None` instead of panicking
    /// when `key` is absent.
    pub fn get_ptr(&mut self, key: &K) -> Option<&V> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.map.get(key)
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    /// Shrink or grow the capacity, evicting from the back if needed.
    ///
    /// Quirk carried over from the original: if the capacity was already
    /// `0`, this is a no-op. A capacity of `0` is treated as "uninitialized,
    /// leave alone" rather than "cache nothing".
    pub fn set_capacity(&mut self, capacity: usize) {
        if self.capacity == 0 {
            return;
        }
        self.capacity = capacity;
        self.evict();
    }

    fn touch(&mut self, key: &K) {
        self.remove_from_order(key);
        self.order.push_front(key.clone());
    }

    fn remove_from_order(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
    }

    fn evict(&mut self) {
        while self.map.len() > self.capacity {
            match self.order.pop_back() {
                Some(key) => {
                    self.map.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_round_trip() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(*cache.get(&"a"), 1);
        assert_eq!(*cache.get(&"b"), 2);
    }

    #[test]
    fn evicts_least_recently_used_on_overflow() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        assert!(!cache.has(&"a"));
        assert!(cache.has(&"b"));
        assert!(cache.has(&"c"));
    }

    #[test]
    fn get_moves_key_to_front_protecting_it_from_eviction() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        let _ = cache.get(&"a");
        cache.insert("c", 3);
        assert!(cache.has(&"a"));
        assert!(!cache.has(&"b"));
    }

    #[test]
    fn get_ptr_returns_none_for_absent_key() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        assert_eq!(cache.get_ptr(&"missing"), None);
    }

    #[test]
    #[should_panic]
    fn get_panics_on_absent_key() {
        let mut cache: LruCache<&str, i32> = LruCache::new(2);
        cache.get(&"missing");
    }

    #[test]
    fn set_capacity_shrinks_and_evicts() {
        let mut cache = LruCache::new(4);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("c", 3);
        cache.set_capacity(1);
        assert_eq!(cache.len(), 1);
        assert!(cache.has(&"c"));
    }

    #[test]
    fn set_capacity_is_a_noop_when_starting_at_zero() {
        let mut cache: LruCache<&str, i32> = LruCache::new(0);
        cache.set_capacity(10);
        cache.insert("a", 1);
        // capacity stayed 0: every insert evicts itself immediately.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn reinserting_an_existing_key_does_not_duplicate_order_entries() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("a", 2);
        cache.insert("b", 3);
        cache.insert("c", 4);
        // "a" was re-inserted (not re-touched via get), so it is the
        // least-recently-used key and is the one evicted.
        assert!(!cache.has(&"a"));
    }
}
