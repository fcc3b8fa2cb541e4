use std::collections::{HashMap, VecDeque};

/// Bounded insertion-order (FIFO) cache keyed by normalized title.
///
/// Inserting a new key beyond capacity evicts the oldest entry. Overwriting
/// an existing key updates the value but keeps its queue position, so a hot
/// entry still ages out on schedule.
///
/// Not internally synchronized: each owner wraps it in its own lock. Writes
/// are serialized by the session's single-flight discipline, but independent
/// engines sharing a cache must treat entries as advisory.
#[derive(Debug)]
pub struct FifoCache<V> {
    map: HashMap<String, V>,
    order: VecDeque<String>,
    capacity: usize,
}

impl<V> FifoCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.map.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn insert(&mut self, key: String, value: V) {
        if self.map.insert(key.clone(), value).is_some() {
            // Existing key: value replaced, queue position unchanged
            return;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.map.remove(&evicted);
                tracing::debug!(key = %evicted, capacity = self.capacity, "Evicted oldest cache entry");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
