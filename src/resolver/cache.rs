use indexmap::IndexMap;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// Size-bounded LRU map with optional time-to-live.
///
/// Entries are kept in recency order: a hit moves the entry to the back and
/// inserting past `capacity` evicts from the front.
pub struct BoundedCache<V> {
    capacity: usize,
    ttl: Option<Duration>,
    entries: IndexMap<String, Entry<V>>,
}

impl<V: Clone> BoundedCache<V> {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: IndexMap::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match (self.entries.get(key), self.ttl) {
            (None, _) => return None,
            (Some(entry), Some(ttl)) => entry.stored_at.elapsed() >= ttl,
            (Some(_), None) => false,
        };

        let entry = self.entries.shift_remove(key)?;
        if expired {
            return None;
        }
        let value = entry.value.clone();
        self.entries.insert(key.to_string(), entry);
        Some(value)
    }

    pub fn insert(&mut self, key: String, value: V) {
        self.entries.shift_remove(&key);
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
        while self.entries.len() > self.capacity {
            self.entries.shift_remove_index(0);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
