//! In-process response cache with TTL expiry and tag invalidation.
//!
//! List endpoints (products, categories) store their serialized payload under
//! a key like `products:eur:all`; admin writes invalidate whole tags
//! (`products`, `categories`) instead of tracking individual keys.

use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

struct Entry {
    value: JsonValue,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    tags: HashMap<String, HashSet<String>>,
}

pub struct ResponseCache {
    ttl: Duration,
    inner: RwLock<Inner>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        ResponseCache {
            ttl,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Returns the cached value if present and not expired.
    pub async fn get(&self, key: &str) -> Option<JsonValue> {
        let inner = self.inner.read().await;
        let entry = inner.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Stores `value` under `key`, registering it with each tag.
    pub async fn put(&self, key: &str, value: JsonValue, tags: &[&str]) {
        let mut inner = self.inner.write().await;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
        for tag in tags {
            inner
                .tags
                .entry((*tag).to_string())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Drops every entry registered under `tag`.
    pub async fn invalidate_tag(&self, tag: &str) {
        let mut inner = self.inner.write().await;
        if let Some(keys) = inner.tags.remove(tag) {
            debug!("cache: invalidating {} entries for tag '{}'", keys.len(), tag);
            for key in keys {
                inner.entries.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn get_returns_cached_value_until_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.put("products:eur", json!([1, 2]), &["products"]).await;
        assert_eq!(cache.get("products:eur").await, Some(json!([1, 2])));
        assert_eq!(cache.get("missing").await, None);
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.put("k", json!(1), &[]).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn invalidate_tag_drops_all_tagged_keys() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.put("products:eur", json!(1), &["products"]).await;
        cache.put("products:km", json!(2), &["products"]).await;
        cache.put("categories:all", json!(3), &["categories"]).await;

        cache.invalidate_tag("products").await;
        assert_eq!(cache.get("products:eur").await, None);
        assert_eq!(cache.get("products:km").await, None);
        assert_eq!(cache.get("categories:all").await, Some(json!(3)));
    }
}
