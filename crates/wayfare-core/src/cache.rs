//! Keyed cache for query results.
//!
//! Entries are stored as JSON and expire after their own stale time.
//! Mutations invalidate by key prefix.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

/// Stale time for hotel/flight data.
pub const DATA_STALE_TIME: Duration = Duration::from_secs(30);

/// Hierarchical cache key, e.g. `["hotel", "42", "detail"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Whether `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn hotel_detail(id: &str) -> Self {
        Self::new(["hotel", id, "detail"])
    }

    /// One search page: criteria, page number and page size.
    pub fn hotel_list(filter_key: &str, page: u32, limit: u32) -> Self {
        Self::new([
            "hotel".to_string(),
            "list".to_string(),
            filter_key.to_string(),
            page.to_string(),
            limit.to_string(),
        ])
    }

    pub fn hotel_popular(limit: u32) -> Self {
        Self::new(["hotel".to_string(), "popular".to_string(), limit.to_string()])
    }

    pub fn hotel_bookings() -> Self {
        Self::new(["booking-list"])
    }

    pub fn flight_detail(id: &str) -> Self {
        Self::new(["flight", id, "detail"])
    }

    /// Prefix of every flight list entry.
    pub fn flight_lists() -> Self {
        Self::new(["flight", "list"])
    }

    /// One search page: criteria, page number and page size.
    pub fn flight_list(filter_key: &str, page: u32, limit: u32) -> Self {
        Self::new([
            "flight".to_string(),
            "list".to_string(),
            filter_key.to_string(),
            page.to_string(),
            limit.to_string(),
        ])
    }

    pub fn flight_popular(limit: u32) -> Self {
        Self::new(["flight".to_string(), "popular".to_string(), limit.to_string()])
    }

    pub fn flight_bookings() -> Self {
        Self::new(["flight-booking-list"])
    }

    pub fn user_permissions() -> Self {
        Self::new(["user-permission"])
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    fetched_at: Instant,
    stale_after: Duration,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < self.stale_after
    }
}

/// Shared query cache. Cloning shares the entries.
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh value for `key`, if any.
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let value = {
            let entries = self.lock();
            let entry = entries.get(key)?;
            if !entry.is_fresh(Instant::now()) {
                return None;
            }
            entry.value.clone()
        };
        serde_json::from_value(value).ok()
    }

    pub fn insert<T: Serialize>(&self, key: QueryKey, value: &T, stale_after: Duration) {
        let Ok(value) = serde_json::to_value(value) else {
            tracing::debug!(%key, "value not cacheable");
            return;
        };
        self.lock().insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
                stale_after,
            },
        );
    }

    /// Removes every entry at or beneath `prefix`. Returns how many went.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(%prefix, removed, "cache invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the cached value, or runs `fetch` and caches its success.
    ///
    /// # Errors
    /// Propagates the error from `fetch`; nothing is cached in that case.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: QueryKey,
        stale_after: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(&key) {
            tracing::debug!(%key, "cache hit");
            return Ok(hit);
        }
        let value = fetch().await?;
        self.insert(key, &value, stale_after);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_go_stale() {
        let cache = QueryCache::new();
        let key = QueryKey::hotel_detail("7");
        cache.insert(key.clone(), &"Casa Azul", Duration::from_secs(60));

        assert_eq!(cache.get::<String>(&key).as_deref(), Some("Casa Azul"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get::<String>(&key).is_none());
    }

    #[test]
    fn test_invalidate_by_prefix() {
        let cache = QueryCache::new();
        let ttl = Duration::from_secs(60);
        cache.insert(QueryKey::flight_list("from=LIS", 1, 10), &1, ttl);
        cache.insert(QueryKey::flight_list("from=LIS", 2, 10), &2, ttl);
        cache.insert(QueryKey::flight_detail("9"), &3, ttl);
        cache.insert(QueryKey::hotel_bookings(), &4, ttl);

        assert_eq!(cache.invalidate(&QueryKey::flight_lists()), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get::<i32>(&QueryKey::flight_detail("9")), Some(3));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_shapes() {
        assert_eq!(QueryKey::hotel_popular(6).to_string(), "[hotel, popular, 6]");
        assert_eq!(
            QueryKey::hotel_list("city=Lisbon", 2, 10).to_string(),
            "[hotel, list, city=Lisbon, 2, 10]"
        );
        let lists = QueryKey::new(["hotel", "list"]);
        assert!(QueryKey::hotel_list("", 1, 10).starts_with(&lists));
        assert!(!QueryKey::hotel_detail("1").starts_with(&lists));
        assert!(!QueryKey::hotel_bookings().starts_with(&lists));
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success_only() {
        let cache = QueryCache::new();
        let key = QueryKey::user_permissions();
        let ttl = Duration::from_secs(600);

        let err: Result<u32, String> = cache
            .get_or_fetch(key.clone(), ttl, || async { Err("boom".to_string()) })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty());

        let first: Result<u32, String> = cache.get_or_fetch(key.clone(), ttl, || async { Ok(1) }).await;
        let second: Result<u32, String> = cache.get_or_fetch(key, ttl, || async { Ok(2) }).await;
        assert_eq!(first, Ok(1));
        assert_eq!(second, Ok(1));
    }
}
