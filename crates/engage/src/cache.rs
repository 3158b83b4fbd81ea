//! Best-effort cache for target listings.
//!
//! Nothing correct depends on the cache: a miss, an error or a stale entry
//! only costs a store read.

use crate::page::PageRequest;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`. Returns how many went.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}

/// Key for one page of a listing under `scope`.
pub fn listing_key(scope: &str, page: PageRequest) -> String {
    format!("{scope}:page:{}:{}", page.page, page.size)
}

/// Prefix matching every cached page under `scope`.
pub fn scope_prefix(scope: &str) -> String {
    format!("{scope}:")
}

/// Always misses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

#[async_trait]
impl Cache for NoOpCache {
    async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: serde_json::Value, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64> {
        Ok(0)
    }
}

/// Process-local cache. Expiry is checked on read.
///
/// A TTL too large to represent as an [`Instant`] never expires.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, (serde_json::Value, Option<Instant>)>>,
}

fn live(expires: Option<Instant>) -> bool {
    expires.map_or(true, |at| at > Instant::now())
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let hit = match self.entries.get(key) {
            Some(entry) if live(entry.1) => return Ok(Some(entry.0.clone())),
            Some(_) => true,
            None => false,
        };
        if hit {
            self.entries.remove_if(key, |_, (_, expires)| !live(*expires));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
        let expires = Instant::now().checked_add(ttl);
        self.entries.insert(key.to_string(), (value, expires));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            let keep = !key.starts_with(prefix);
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_keys_nest_under_scope_prefix() {
        let key = listing_key("comments:chapter:7", PageRequest::new(2, 20));
        assert_eq!(key, "comments:chapter:7:page:2:20");
        assert!(key.starts_with(&scope_prefix("comments:chapter:7")));
        assert!(!listing_key("comments:chapter:70", PageRequest::new(1, 20))
            .starts_with(&scope_prefix("comments:chapter:7")));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache
            .set("k", json!([1, 2]), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!([1, 2])));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(!cache.contains_key("k"));
    }

    #[tokio::test]
    async fn unrepresentable_ttl_never_expires() {
        let cache = MemoryCache::new();
        cache
            .set("k", json!("v"), Duration::from_secs(u64::MAX))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn delete_prefix_only_touches_scope() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("comments:chapter:7:page:1:20", json!(1), ttl).await.unwrap();
        cache.set("comments:chapter:7:page:2:20", json!(2), ttl).await.unwrap();
        cache.set("comments:chapter:70:page:1:20", json!(3), ttl).await.unwrap();

        let removed = cache.delete_prefix("comments:chapter:7:").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.keys(), vec!["comments:chapter:70:page:1:20".to_string()]);
    }
}
