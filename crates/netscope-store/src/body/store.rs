//! Byte-budgeted LRU store for request/response bodies.

use super::codec;
use super::types::{BodyCacheStats, BodyRole, CompressedBody};
use crate::config::SettingsProvider;
use crate::metrics;
use lru::LruCache;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace};

/// Cache entries and their byte total, guarded by one lock
struct BodyCacheState {
    /// Most recently read or written entries are at the front
    entries: LruCache<String, CompressedBody>,
    total_bytes: usize,
}

impl BodyCacheState {
    fn upsert(&mut self, key: String, body: CompressedBody) {
        self.total_bytes += body.stored_size();
        if let Some(previous) = self.entries.put(key, body) {
            self.total_bytes -= previous.stored_size();
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.pop(key) {
            Some(body) => {
                self.total_bytes -= body.stored_size();
                true
            }
            None => false,
        }
    }

    /// Drop least recently used entries until `total_bytes <= max_bytes`.
    fn evict_to(&mut self, max_bytes: usize) -> usize {
        let mut evicted = 0;
        while self.total_bytes > max_bytes {
            match self.entries.pop_lru() {
                Some((key, body)) => {
                    trace!("Evicting body {} ({} bytes)", key, body.stored_size());
                    self.total_bytes -= body.stored_size();
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }

    fn publish_usage(&self) {
        metrics::set_body_cache_usage(self.entries.len(), self.total_bytes);
    }
}

/// Compressed body cache keyed by (call id, body role)
///
/// Bodies live here independently of their call records. The total stored
/// size is bounded by `max_body_cache_size_bytes`; writes never fail, they
/// evict the least recently used bodies instead. A single write larger than
/// the whole budget evicts everything, itself included.
pub struct BodyStore {
    state: Mutex<BodyCacheState>,
    settings: Arc<dyn SettingsProvider>,
}

impl BodyStore {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            state: Mutex::new(BodyCacheState {
                entries: LruCache::unbounded(),
                total_bytes: 0,
            }),
            settings,
        }
    }

    /// Store a body and return its key, or `None` for an absent or empty body.
    ///
    /// Replaces any body previously stored for the same call and role. The key
    /// is returned even if the body was evicted again by its own write.
    pub fn store(&self, call_id: &str, role: BodyRole, body: Option<&str>) -> Option<String> {
        let body = body.filter(|b| !b.is_empty())?;
        let settings = self.settings.settings();

        let (text, truncated) = codec::truncate(body, settings.max_body_size_bytes);
        if truncated {
            debug!(
                "Truncated {} body of call {} from {} to {} bytes",
                role,
                call_id,
                body.len(),
                settings.max_body_size_bytes
            );
            metrics::record_body_truncated();
        }

        let encoded = codec::encode(&text, settings.compression_enabled);
        let key = role.key_for(call_id);

        let mut state = self.state.lock();
        state.upsert(key.clone(), encoded);
        let evicted = state.evict_to(settings.max_body_cache_size_bytes);
        state.publish_usage();
        drop(state);

        if evicted > 0 {
            debug!(
                "Body cache over budget ({} bytes), evicted {} bodies",
                settings.max_body_cache_size_bytes, evicted
            );
            metrics::record_body_evictions(evicted);
        }

        Some(key)
    }

    /// Fetch a body by key, marking it as recently used
    pub fn retrieve(&self, key: Option<&str>) -> Option<String> {
        let key = key?;
        let body = {
            let mut state = self.state.lock();
            state.entries.get(key)?.clone()
        };
        codec::decode(&body)
    }

    /// Remove one body of a call
    pub fn remove(&self, call_id: &str, role: BodyRole) {
        let mut state = self.state.lock();
        if state.remove(&role.key_for(call_id)) {
            state.publish_usage();
        }
    }

    /// Remove every body of a call
    pub fn remove_all(&self, call_id: &str) {
        let mut state = self.state.lock();
        let mut removed = false;
        for role in BodyRole::ALL {
            removed |= state.remove(&role.key_for(call_id));
        }
        if removed {
            state.publish_usage();
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.total_bytes = 0;
        state.publish_usage();
    }

    pub fn stats(&self) -> BodyCacheStats {
        let max_size_bytes = self.settings.settings().max_body_cache_size_bytes;
        let state = self.state.lock();
        BodyCacheStats::new(state.entries.len(), state.total_bytes, max_size_bytes)
    }

    /// Whether a body is currently cached, without touching its recency
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::TRUNCATION_MARKER;
    use crate::config::{SharedSettings, StaticSettings, StoreSettings};
    use tracing_test::traced_test;

    fn store_with(settings: StoreSettings) -> BodyStore {
        BodyStore::new(Arc::new(StaticSettings(settings)))
    }

    fn raw_store(max_cache: usize) -> BodyStore {
        store_with(StoreSettings {
            max_body_cache_size_bytes: max_cache,
            max_body_size_bytes: 0,
            compression_enabled: false,
            ..StoreSettings::default()
        })
    }

    #[test]
    fn test_store_and_retrieve() {
        let store = store_with(StoreSettings::default());

        let key = store.store("c1", BodyRole::Request, Some("{\"a\":1}"));
        assert_eq!(key.as_deref(), Some("c1:REQUEST"));
        assert_eq!(
            store.retrieve(key.as_deref()).as_deref(),
            Some("{\"a\":1}")
        );
    }

    #[test]
    fn test_absent_and_empty_bodies_are_not_stored() {
        let store = store_with(StoreSettings::default());

        assert_eq!(store.store("c1", BodyRole::Request, None), None);
        assert_eq!(store.store("c1", BodyRole::Response, Some("")), None);
        assert_eq!(store.stats().entry_count, 0);
    }

    #[test]
    fn test_retrieve_missing() {
        let store = store_with(StoreSettings::default());
        assert_eq!(store.retrieve(None), None);
        assert_eq!(store.retrieve(Some("nope:REQUEST")), None);
    }

    #[test]
    fn test_restore_replaces_and_adjusts_total() {
        let store = raw_store(1000);

        store.store("c1", BodyRole::Response, Some("0123456789"));
        assert_eq!(store.stats().total_size_bytes, 10);

        store.store("c1", BodyRole::Response, Some("abc"));
        let stats = store.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.total_size_bytes, 3);
        assert_eq!(store.retrieve(Some("c1:RESPONSE")).as_deref(), Some("abc"));
    }

    #[test]
    fn test_lru_eviction_prefers_unread_entries() {
        let store = raw_store(20);

        store.store("a", BodyRole::Request, Some("aaaaaaaaaa"));
        store.store("b", BodyRole::Request, Some("bbbbbbbbbb"));
        // Reading A makes B the least recently used
        assert!(store.retrieve(Some("a:REQUEST")).is_some());
        store.store("c", BodyRole::Request, Some("cccccccccc"));

        assert!(store.contains("a:REQUEST"));
        assert!(!store.contains("b:REQUEST"));
        assert!(store.contains("c:REQUEST"));
        assert_eq!(store.stats().total_size_bytes, 20);
    }

    #[test]
    fn test_eviction_ties_follow_insertion_order() {
        let store = raw_store(20);

        store.store("a", BodyRole::Request, Some("aaaaaaaaaa"));
        store.store("b", BodyRole::Request, Some("bbbbbbbbbb"));
        store.store("c", BodyRole::Request, Some("cccccccccc"));

        assert!(!store.contains("a:REQUEST"));
        assert!(store.contains("b:REQUEST"));
        assert!(store.contains("c:REQUEST"));
    }

    #[test]
    fn test_oversized_write_evicts_everything_including_itself() {
        let store = raw_store(10);

        store.store("a", BodyRole::Request, Some("aaaaa"));
        let key = store.store("big", BodyRole::Response, Some(&"x".repeat(11)));

        // The key is still handed out, but nothing survives
        assert_eq!(key.as_deref(), Some("big:RESPONSE"));
        assert_eq!(store.retrieve(key.as_deref()), None);
        let stats = store.stats();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.total_size_bytes, 0);
    }

    #[test]
    fn test_truncation_marker() {
        let store = store_with(StoreSettings {
            max_body_size_bytes: 16,
            ..StoreSettings::default()
        });

        let body = "y".repeat(100);
        let key = store.store("c1", BodyRole::Response, Some(&body));
        let stored = store.retrieve(key.as_deref()).unwrap();

        assert!(stored.ends_with(TRUNCATION_MARKER));
        let payload = stored.strip_suffix(TRUNCATION_MARKER).unwrap();
        assert_eq!(payload, "y".repeat(16));
    }

    #[test]
    #[traced_test]
    fn test_truncation_is_logged() {
        let store = store_with(StoreSettings {
            max_body_size_bytes: 4,
            ..StoreSettings::default()
        });
        store.store("c1", BodyRole::Response, Some("0123456789"));
        assert!(logs_contain("Truncated RESPONSE body of call c1 from 10 to 4 bytes"));
    }

    #[test]
    fn test_compression_never_grows_stored_size() {
        let store = store_with(StoreSettings::default());

        let long = "abc".repeat(500);
        for body in ["x", "short body", long.as_str()] {
            store.store(body, BodyRole::Request, Some(body));
        }
        let stats = store.stats();
        assert_eq!(stats.entry_count, 3);
        assert!(stats.total_size_bytes <= 1 + 10 + 1500);
        assert!(stats.total_size_bytes < 1 + 10 + 1500 / 2);
    }

    #[test]
    fn test_remove_and_remove_all() {
        let store = raw_store(1000);

        store.store("c1", BodyRole::Request, Some("req"));
        store.store("c1", BodyRole::Response, Some("resp"));
        store.store("c2", BodyRole::Request, Some("other"));

        store.remove("c1", BodyRole::Request);
        assert!(!store.contains("c1:REQUEST"));
        assert!(store.contains("c1:RESPONSE"));

        store.remove_all("c1");
        store.remove_all("missing");
        store.remove("missing", BodyRole::Response);

        let stats = store.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.total_size_bytes, 5);
    }

    #[test]
    fn test_clear_resets_total() {
        let store = raw_store(1000);
        store.store("c1", BodyRole::Request, Some("req"));
        store.clear();

        let stats = store.stats();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.total_size_bytes, 0);
        assert_eq!(stats.usage_percent, 0.0);
    }

    #[test]
    fn test_stats_usage_percent() {
        let store = raw_store(200);
        store.store("c1", BodyRole::Request, Some(&"q".repeat(50)));

        let stats = store.stats();
        assert_eq!(stats.max_size_bytes, 200);
        assert_eq!(stats.usage_percent, 25.0);
    }

    #[test]
    fn test_settings_are_read_live() {
        let settings = SharedSettings::new(StoreSettings {
            max_body_cache_size_bytes: 1000,
            max_body_size_bytes: 0,
            compression_enabled: false,
            ..StoreSettings::default()
        });
        let store = BodyStore::new(Arc::new(settings.clone()));

        store.store("a", BodyRole::Request, Some(&"a".repeat(100)));
        store.store("b", BodyRole::Request, Some(&"b".repeat(100)));

        // Shrinking the budget takes effect on the next write
        settings.update(|s| s.max_body_cache_size_bytes = 150);
        store.store("c", BodyRole::Request, Some("c"));

        assert!(!store.contains("a:REQUEST"));
        assert!(store.contains("b:REQUEST"));
        assert!(store.contains("c:REQUEST"));
        assert_eq!(store.stats().max_size_bytes, 150);
    }
}
