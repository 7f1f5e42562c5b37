use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core::ProjectionResult;

struct CacheEntry {
    key: String,
    stored_at: Instant,
    result: Arc<ProjectionResult>,
}

/// Short-lived memo of projection results.
///
/// Keys are the canonical JSON of a normalized request. Entries are bucketed
/// by hash, but a hit also requires the stored key to match in full.
pub struct ResultCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<u64, CacheEntry>>,
}

// Colliding keys share a slot, so an insert may replace a live entry.
fn bucket(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

impl ResultCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero() && self.capacity > 0
    }

    pub fn get(&self, key: &str) -> Option<Arc<ProjectionResult>> {
        if !self.is_enabled() {
            return None;
        }
        let mut entries = self.entries.lock().ok()?;
        let slot = bucket(key);
        let entry = entries.get(&slot)?;
        if entry.key != key {
            return None;
        }
        if entry.stored_at.elapsed() >= self.ttl {
            entries.remove(&slot);
            return None;
        }
        Some(Arc::clone(&entry.result))
    }

    pub fn insert(&self, key: String, result: Arc<ProjectionResult>) {
        if !self.is_enabled() {
            return;
        }
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);

        let slot = bucket(&key);
        while entries.len() >= self.capacity && !entries.contains_key(&slot) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(slot, _)| *slot);
            match oldest {
                Some(oldest) => entries.remove(&oldest),
                None => break,
            };
        }
        entries.insert(
            slot,
            CacheEntry {
                key,
                stored_at: Instant::now(),
                result,
            },
        );
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(tag: &str) -> Arc<ProjectionResult> {
        Arc::new(ProjectionResult {
            tax_policy: tag.to_string(),
            ..ProjectionResult::default()
        })
    }

    #[test]
    fn hit_returns_stored_result() {
        let cache = ResultCache::new(Duration::from_secs(60), 4);
        cache.insert("a".to_string(), result("a"));
        assert_eq!(cache.get("a").expect("hit").tax_policy, "a");
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn colliding_bucket_with_different_key_misses() {
        let cache = ResultCache::new(Duration::from_secs(60), 4);
        cache.insert("a".to_string(), result("a"));
        // Force a foreign key into the same bucket.
        {
            let mut entries = cache.entries.lock().expect("lock");
            let entry = entries.get_mut(&bucket("a")).expect("entry");
            entry.key = "not-a".to_string();
        }
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn insert_into_occupied_bucket_replaces_entry() {
        let cache = ResultCache::new(Duration::from_secs(60), 4);
        cache.insert("a".to_string(), result("old"));
        {
            let mut entries = cache.entries.lock().expect("lock");
            let entry = entries.get_mut(&bucket("a")).expect("entry");
            entry.key = "not-a".to_string();
        }
        cache.insert("a".to_string(), result("new"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").expect("hit").tax_policy, "new");
        assert!(cache.get("not-a").is_none());
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let cache = ResultCache::new(Duration::ZERO, 4);
        cache.insert("a".to_string(), result("a"));
        assert!(cache.get("a").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = ResultCache::new(Duration::from_millis(1), 4);
        cache.insert("a".to_string(), result("a"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = ResultCache::new(Duration::from_secs(60), 2);
        cache.insert("a".to_string(), result("a"));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b".to_string(), result("b"));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c".to_string(), result("c"));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }
}
