//! Process-wide read cache with a fixed TTL.
//!
//! Entries expire on their own, but whichever code path mutates the
//! underlying data must call [`TtlCache::invalidate`] so readers never wait a
//! full TTL to see the change.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;
use uuid::Uuid;

#[derive(Debug)]
struct Entry<V> {
    value: Arc<V>,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash,
{
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
}

/// Rendered public web views, keyed by newsletter id
pub type WebViewCache = TtlCache<Uuid, String>;

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(
        &self,
        key: &K,
    ) -> Option<Arc<V>> {
        let now = Instant::now();
        // the shard guard must be released before `remove_if`
        let hit = self
            .entries
            .get(key)
            .map(|e| (e.expires_at > now).then(|| Arc::clone(&e.value)));
        match hit {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove_if(key, |_, e| e.expires_at <= now);
                None
            }
            None => None,
        }
    }

    pub fn insert(
        &self,
        key: K,
        value: V,
    ) -> Arc<V> {
        let value = Arc::new(value);
        self.entries.insert(
            key,
            Entry {
                value: Arc::clone(&value),
                expires_at: Instant::now() + self.ttl,
            },
        );
        value
    }

    pub fn invalidate(
        &self,
        key: &K,
    ) {
        if self.entries.remove(key).is_some() {
            tracing::debug!("cache entry invalidated");
        }
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
