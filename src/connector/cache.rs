// src/connector/cache.rs
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// Replies remembered for a fixed time after insertion.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, (V, Instant)>,
    expiration: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(expiration: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            expiration,
        }
    }

    fn is_fresh(&self, inserted: Instant, now: Instant) -> bool {
        now.duration_since(inserted) < self.expiration
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|(_, inserted)| self.is_fresh(*inserted, now))
            .map(|(value, _)| value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (value, Instant::now()));
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let expiration = self.expiration;
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, inserted)| now.duration_since(*inserted) < expiration);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("status", "text".to_string());
        assert_eq!(cache.get(&"status"), Some("text".to_string()));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(cache.get(&"status"), Some("text".to_string()));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get(&"status"), None);
        // expired but not yet swept
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_only_removes_expired() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.insert(1, 'a');
        tokio::time::advance(Duration::from_secs(6)).await;
        cache.insert(2, 'b');
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&2), Some('b'));
    }

    #[tokio::test(start_paused = true)]
    async fn insert_refreshes_entry() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.insert(1, 'a');
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert(1, 'b');
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get(&1), Some('b'));
    }
}
