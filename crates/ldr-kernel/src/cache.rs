//! Per-session cache of user-asserted types.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use tracing::debug;

use ldr_types::TransactionError;

use crate::error::{KernelError, KernelResult};

/// Cache key: the description whose triples hold the types, scoped to the
/// session that read them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserTypesKey {
    pub description_id: String,
    pub session: String,
}

impl UserTypesKey {
    pub fn new(description_id: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            description_id: description_id.into(),
            session: session.into(),
        }
    }
}

/// Lookup boundary for user types. Implementations must tolerate
/// concurrent callers; when two callers miss on the same key the last
/// insert wins.
pub trait UserTypesCache: Send + Sync {
    /// Return the cached set for `key`, or run `loader` and cache its
    /// result. Loader failures are returned and nothing is cached.
    fn get_or_load(
        &self,
        key: &UserTypesKey,
        loader: &dyn Fn() -> KernelResult<Vec<String>>,
    ) -> KernelResult<Vec<String>>;

    /// Drop one entry.
    fn invalidate(&self, key: &UserTypesKey) -> KernelResult<()>;

    /// Drop every entry belonging to `session`.
    fn invalidate_session(&self, session: &str) -> KernelResult<()>;
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<UserTypesKey, Vec<String>>,
    order: VecDeque<UserTypesKey>,
}

/// Bounded in-memory cache with first-in first-out eviction.
pub struct InMemoryUserTypesCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

impl InMemoryUserTypesCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryUserTypesCache {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn poisoned<T>(_: T) -> KernelError {
    TransactionError::LockPoisoned("user types cache".into()).into()
}

impl UserTypesCache for InMemoryUserTypesCache {
    fn get_or_load(
        &self,
        key: &UserTypesKey,
        loader: &dyn Fn() -> KernelResult<Vec<String>>,
    ) -> KernelResult<Vec<String>> {
        if let Some(hit) = self.inner.read().map_err(poisoned)?.entries.get(key) {
            return Ok(hit.clone());
        }
        let loaded = loader()?;
        if self.capacity == 0 {
            return Ok(loaded);
        }

        let mut inner = self.inner.write().map_err(poisoned)?;
        if inner.entries.insert(key.clone(), loaded.clone()).is_none() {
            inner.order.push_back(key.clone());
        }
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
        debug!(description = %key.description_id, types = loaded.len(), "cached user types");
        Ok(loaded)
    }

    fn invalidate(&self, key: &UserTypesKey) -> KernelResult<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
        Ok(())
    }

    fn invalidate_session(&self, session: &str) -> KernelResult<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.entries.retain(|k, _| k.session != session);
        inner.order.retain(|k| k.session != session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn key(desc: &str, session: &str) -> UserTypesKey {
        UserTypesKey::new(desc, session)
    }

    // ---- Test 1: loader runs once per key ----

    #[test]
    fn loader_runs_only_on_miss() {
        let cache = InMemoryUserTypesCache::new(4);
        let calls = Cell::new(0);
        let loader = || {
            calls.set(calls.get() + 1);
            Ok(vec!["http://example.org/Book".to_string()])
        };
        let first = cache.get_or_load(&key("/a", "s1"), &loader).unwrap();
        let second = cache.get_or_load(&key("/a", "s1"), &loader).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);

        cache.get_or_load(&key("/a", "s2"), &loader).unwrap();
        assert_eq!(calls.get(), 2);
    }

    // ---- Test 2: failures are not cached ----

    #[test]
    fn loader_errors_propagate_and_are_not_cached() {
        let cache = InMemoryUserTypesCache::new(4);
        let err = cache
            .get_or_load(&key("/a", "s1"), &|| Err(KernelError::PathNotFound("/a".into())))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.is_empty());
    }

    // ---- Test 3: eviction and invalidation ----

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let cache = InMemoryUserTypesCache::new(2);
        for desc in ["/a", "/b", "/c"] {
            cache.get_or_load(&key(desc, "s"), &|| Ok(vec![])).unwrap();
        }
        assert_eq!(cache.len(), 2);

        let calls = Cell::new(0);
        let loader = || {
            calls.set(calls.get() + 1);
            Ok(vec![])
        };
        cache.get_or_load(&key("/c", "s"), &loader).unwrap();
        assert_eq!(calls.get(), 0);
        cache.get_or_load(&key("/a", "s"), &loader).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn session_invalidation_leaves_other_sessions() {
        let cache = InMemoryUserTypesCache::new(8);
        cache.get_or_load(&key("/a", "s1"), &|| Ok(vec![])).unwrap();
        cache.get_or_load(&key("/b", "s1"), &|| Ok(vec![])).unwrap();
        cache.get_or_load(&key("/a", "s2"), &|| Ok(vec![])).unwrap();

        cache.invalidate_session("s1").unwrap();
        assert_eq!(cache.len(), 1);
        cache.invalidate(&key("/a", "s2")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let cache = InMemoryUserTypesCache::new(0);
        let calls = Cell::new(0);
        let loader = || {
            calls.set(calls.get() + 1);
            Ok(vec![])
        };
        cache.get_or_load(&key("/a", "s"), &loader).unwrap();
        cache.get_or_load(&key("/a", "s"), &loader).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(cache.is_empty());
    }
}
