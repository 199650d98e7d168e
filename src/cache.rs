use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

/// In-memory key-value cache with per-entry TTL.
///
/// Values are stored as JSON so callers cache whatever serializes. Expired
/// entries are dropped lazily on read. No persistence across runs.
pub struct TtlCache {
    entries: Mutex<HashMap<String, (Instant, Value)>>,
}

impl TtlCache {
    pub fn new() -> Self {
        TtlCache {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Build a `prefix:part:part` key.
    pub fn key(prefix: &str, parts: &[&str]) -> String {
        let mut key = String::from(prefix);
        for part in parts {
            key.push(':');
            key.push_str(part);
        }
        key
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((expires, value)) if *expires > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), (Instant::now() + ttl, value));
    }

    pub fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get() {
        let cache = TtlCache::new();
        cache.set("k", json!({"a": 1}), Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(json!({"a": 1})));
    }

    #[test]
    fn expired_entry_is_dropped() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
        // second read sees the purged slot, not a stale value
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn delete_removes_entry() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::from_secs(60));
        cache.delete("k");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn key_joins_parts_with_colons() {
        assert_eq!(
            TtlCache::key("space_content", &["DOCS", "100"]),
            "space_content:DOCS:100"
        );
        assert_eq!(TtlCache::key("single_page", &[]), "single_page");
    }
}
