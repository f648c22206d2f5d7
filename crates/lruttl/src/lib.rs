/*
 * The expiry/eviction scheme here is derived from code which is:
 * Copyright (c) 2020-2023, Stalwart Labs Ltd.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use lru_cache::LruCache;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Item<V> {
    item: V,
    expiration: Instant,
}

/// A bounded LRU cache whose entries additionally carry an absolute
/// expiration instant, checked lazily on read. Used for MX results and
/// other DNS-derived facts where a stale-but-not-yet-evicted entry must
/// never be returned.
pub struct LruCacheWithTtl<K: Hash + Eq, V: Clone> {
    name: String,
    cache: Mutex<LruCache<K, Item<V>>>,
}

impl<K: Hash + Eq, V: Clone> LruCacheWithTtl<K, V> {
    pub fn new_named<S: Into<String>>(name: S, capacity: usize) -> Self {
        let name = name.into();
        tracing::debug!("registered cache {name} with capacity {capacity}");
        Self {
            name,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clear(&self) -> usize {
        let mut cache = self.cache.lock();
        let num_entries = cache.len();
        cache.clear();
        num_entries
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_with_expiry<Q: ?Sized>(&self, name: &Q) -> Option<(V, Instant)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        let mut cache = self.cache.lock();
        let entry = cache.get_mut(name)?;
        if Instant::now() < entry.expiration {
            Some((entry.item.clone(), entry.expiration))
        } else {
            cache.remove(name);
            None
        }
    }

    pub fn get<Q: ?Sized>(&self, name: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.get_with_expiry(name).map(|(v, _)| v)
    }

    pub fn insert(&self, name: K, item: V, expiration: Instant) -> V {
        self.cache.lock().insert(
            name,
            Item {
                item: item.clone(),
                expiration,
            },
        );
        item
    }

    /// Get an existing, unexpired item, or compute and insert one with the
    /// given TTL. Atomic with respect to other callers of this cache.
    pub fn get_or_insert<F: FnOnce() -> V>(&self, name: K, ttl: Duration, func: F) -> V {
        let mut cache = self.cache.lock();
        if let Some(entry) = cache.get_mut(&name) {
            if Instant::now() < entry.expiration {
                return entry.item.clone();
            }
        }
        let item = func();
        cache.insert(
            name,
            Item {
                item: item.clone(),
                expiration: Instant::now() + ttl,
            },
        );
        item
    }
}
