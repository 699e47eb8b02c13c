// Key Cache Port

use super::time_provider::{SystemTimeProvider, TimeProvider};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Narrow key-value store with per-entry expiry.
///
/// Implementations may be shared between processes; callers must tolerate
/// entries being overwritten concurrently (last write wins).
#[cfg_attr(test, mockall::automock)]
pub trait KeyCache: Send + Sync {
    /// Get a live (non-expired) entry
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key` for `ttl`
    fn set(&self, key: &str, value: &str, ttl: Duration);
}

struct CacheEntry {
    value: String,
    expires_at_millis: i64,
}

/// In-process cache (production default when no shared cache is supplied)
pub struct MemoryKeyCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    time_provider: Arc<dyn TimeProvider>,
}

impl MemoryKeyCache {
    pub fn new() -> Self {
        Self::with_time_provider(Arc::new(SystemTimeProvider))
    }

    pub fn with_time_provider(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            time_provider,
        }
    }
}

impl Default for MemoryKeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyCache for MemoryKeyCache {
    fn get(&self, key: &str) -> Option<String> {
        let now = self.time_provider.now_millis();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| entry.expires_at_millis > now)
            .map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_millis = self.time_provider.now_millis().saturating_add(ttl_millis);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at_millis,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::time_provider::mocks::FixedTimeProvider;

    #[test]
    fn test_entry_expires_after_ttl() {
        let clock = Arc::new(FixedTimeProvider::at_secs(1_000));
        let cache = MemoryKeyCache::with_time_provider(clock.clone());

        cache.set("k", "v", Duration::from_secs(3600));
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        clock.advance_secs(3599);
        assert_eq!(cache.get("k").as_deref(), Some("v"));

        clock.advance_secs(1);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = MemoryKeyCache::new();
        cache.set("k", "first", Duration::from_secs(60));
        cache.set("k", "second", Duration::from_secs(60));
        assert_eq!(cache.get("k").as_deref(), Some("second"));
        assert_eq!(cache.get("other"), None);
    }
}
