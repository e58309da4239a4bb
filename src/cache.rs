//! Key/value cache consumed by `Connection::exec_sql`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

/// Storage used to memoize query results.
pub trait QueryCache {
    fn exists(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` for `ttl`; a zero `ttl` never expires. Returns `false` if the value
    /// was not stored.
    fn set(&mut self, key: &str, value: Value, ttl: Duration) -> bool;
}

/// Process-local `QueryCache` with per-entry expiry.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, (Value, Option<Instant>)>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .values()
            .filter(|(_, expires)| expires.is_none_or(|at| at > now))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn live(&self, key: &str) -> Option<&Value> {
        let (value, expires) = self.entries.get(key)?;
        match expires {
            Some(at) if *at <= Instant::now() => None,
            _ => Some(value),
        }
    }
}

impl QueryCache for MemoryCache {
    fn exists(&self, key: &str) -> bool {
        self.live(key).is_some()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.live(key).cloned()
    }

    /// Expired entries are dropped on every write.
    fn set(&mut self, key: &str, value: Value, ttl: Duration) -> bool {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, expires)| expires.is_none_or(|at| at > now));
        let expires = if ttl.is_zero() {
            None
        } else {
            now.checked_add(ttl)
        };
        self.entries.insert(key.to_string(), (value, expires));
        true
    }
}

/// Cache key for a statement: `sql-` plus a content hash of the SQL text.
#[must_use]
pub fn sql_cache_key(sql: &str) -> String {
    let digest = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, sql.as_bytes());
    format!("sql-{}", digest.simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_ttl_never_expires() {
        let mut cache = MemoryCache::new();
        assert!(cache.set("a", json!([1, 2]), Duration::ZERO));
        assert!(cache.exists("a"));
        assert_eq!(cache.get("a"), Some(json!([1, 2])));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entries_are_invisible() {
        let mut cache = MemoryCache::new();
        cache.set("a", json!(1), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!cache.exists("a"));
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn writes_evict_expired_entries() {
        let mut cache = MemoryCache::new();
        cache.set("old", json!(1), Duration::from_millis(1));
        cache.set("kept", json!(2), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        cache.set("new", json!(3), Duration::from_secs(60));

        assert_eq!(cache.entries.len(), 2);
        assert!(!cache.entries.contains_key("old"));
        assert_eq!(cache.get("kept"), Some(json!(2)));
    }

    #[test]
    fn keys_are_stable_per_statement() {
        let a = sql_cache_key("SELECT 1");
        assert_eq!(a, sql_cache_key("SELECT 1"));
        assert_ne!(a, sql_cache_key("SELECT 2"));
        assert!(a.starts_with("sql-"));
        assert_eq!(a.len(), 4 + 32);
    }
}
