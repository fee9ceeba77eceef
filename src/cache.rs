//! Explicit cache port. Keys are built by the component that owns the data,
//! and invalidation always names concrete keys.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Duration);
    async fn invalidate(&self, key: &str);
}

#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (Instant, Value)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((expires_at, value)) if *expires_at > Instant::now() => {
                    return Some(value.clone());
                }
                None => return None,
                Some(_) => {}
            }
        }
        // expired
        self.entries.write().await.remove(key);
        None
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.entries
            .write()
            .await
            .insert(key.to_string(), (Instant::now() + ttl, value));
    }

    async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}

pub fn occupancy_key(branch_id: Uuid) -> String {
    format!("occupancy:branch:{}", branch_id)
}

/// Seat flags are shared by every match at a branch, so the seat map is
/// cached per branch rather than per match.
pub fn seat_map_key(branch_id: Uuid) -> String {
    format!("seats:branch:{}", branch_id)
}

/// Every key whose value depends on the bookings or seating of `branch_id`.
pub fn branch_cache_keys(branch_id: Uuid) -> Vec<String> {
    vec![occupancy_key(branch_id), seat_map_key(branch_id)]
}

pub async fn invalidate_all(cache: &dyn Cache, keys: &[String]) {
    for key in keys {
        cache.invalidate(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn entries_expire() {
        let cache = InMemoryCache::new();
        cache.set("k", json!(1), Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await, Some(json!(1)));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn invalidation_busts_named_keys_only() {
        let cache = InMemoryCache::new();
        let branch = Uuid::new_v4();
        let other = Uuid::new_v4();
        let ttl = Duration::from_secs(60);

        cache.set(&occupancy_key(branch), json!("x"), ttl).await;
        cache.set(&seat_map_key(branch), json!("y"), ttl).await;
        cache.set(&seat_map_key(other), json!("w"), ttl).await;
        cache.set("unrelated", json!("z"), ttl).await;

        invalidate_all(&cache, &branch_cache_keys(branch)).await;

        assert_eq!(cache.get(&occupancy_key(branch)).await, None);
        assert_eq!(cache.get(&seat_map_key(branch)).await, None);
        assert_eq!(cache.get(&seat_map_key(other)).await, Some(json!("w")));
        assert_eq!(cache.get("unrelated").await, Some(json!("z")));
    }

    #[test]
    fn branch_keys_cover_every_cached_view() {
        let branch = Uuid::new_v4();
        let keys = branch_cache_keys(branch);
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&occupancy_key(branch)));
        assert!(keys.contains(&seat_map_key(branch)));
        assert_ne!(occupancy_key(branch), seat_map_key(branch));
    }
}
