// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of PlexDeals.
//
// PlexDeals is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// PlexDeals is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with PlexDeals. If not, see <https://www.gnu.org/licenses/>.

//! Cache-aside client.
//!
//! ## Key namespaces
//! - Entries: `cache:<entityType>:<id>`
//! - Rebuild locks: `lock:<entityType>:<id>` (applied by the lock manager)

use crate::{CacheEnvelope, CacheResult, CacheStore, RebuildPool};
use plexdeals_common::RequestContext;
use plexdeals_locks::{new_holder_token, AcquireOptions, LockManager};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const CACHE_KEY_PREFIX: &str = "cache:";

/// Negative-cache marker for entities the backing store does not have.
const EMPTY_MARKER: &str = "";

/// Physical TTL of the empty marker; long enough to blunt penetration,
/// short enough that a newly created entity becomes visible quickly.
const EMPTY_MARKER_TTL: Duration = Duration::from_secs(120);

/// Lease on the per-key rebuild lock; bounds how long a crashed rebuild
/// worker can suppress further rebuild attempts.
const REBUILD_LOCK_LEASE: Duration = Duration::from_secs(10);

/// Bounded wait for the pass-through miss lock.
const MISS_LOCK_MAX_WAIT: Duration = Duration::from_secs(1);
const MISS_LOCK_RETRY: Duration = Duration::from_millis(50);

/// Cache-aside client over a [`CacheStore`] backend.
///
/// See the crate docs for the two read disciplines. Entries are written as
/// whole values (JSON envelope or raw payload); concurrent readers never
/// observe a partial write.
pub struct CacheClient {
    store: Arc<dyn CacheStore>,
    locks: Arc<dyn LockManager>,
    rebuilds: RebuildPool,
}

impl CacheClient {
    /// Create a client over `store`, using `locks` for single-flight
    /// rebuild coordination and at most `max_concurrent_rebuilds`
    /// background rebuild workers.
    pub fn new(
        store: Arc<dyn CacheStore>,
        locks: Arc<dyn LockManager>,
        max_concurrent_rebuilds: usize,
    ) -> Self {
        Self {
            store,
            locks,
            rebuilds: RebuildPool::new(max_concurrent_rebuilds),
        }
    }

    fn cache_key(entity: &str, id: u64) -> String {
        format!("{}{}:{}", CACHE_KEY_PREFIX, entity, id)
    }

    fn lock_resource(entity: &str, id: u64) -> String {
        format!("{}:{}", entity, id)
    }

    /// Store a pass-through entry with a physical TTL.
    pub async fn put<T: Serialize>(
        &self,
        ctx: &RequestContext,
        entity: &str,
        id: u64,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let json = serde_json::to_string(value)?;
        self.store
            .put_with_ttl(ctx, &Self::cache_key(entity, id), json, ttl)
            .await
    }

    /// Store a hot-key entry with a logical expiry and no physical TTL
    /// (pre-warming path).
    pub async fn put_with_logical_expire<T: Serialize>(
        &self,
        ctx: &RequestContext,
        entity: &str,
        id: u64,
        value: &T,
        logical_ttl: Duration,
    ) -> CacheResult<()> {
        let envelope = CacheEnvelope::new(value, logical_ttl);
        let json = serde_json::to_string(&envelope)?;
        self.store
            .put(ctx, &Self::cache_key(entity, id), json)
            .await
    }

    /// Evict an entry.
    pub async fn evict(&self, ctx: &RequestContext, entity: &str, id: u64) -> CacheResult<()> {
        self.store.delete(ctx, &Self::cache_key(entity, id)).await
    }

    /// Read a hot key under the logical-expiration discipline.
    ///
    /// ## Behavior
    /// - Entry absent: `Ok(None)`; the key was never pre-warmed and the
    ///   caller falls back to its slow path directly
    /// - Entry fresh: payload returned immediately
    /// - Entry stale: the **stale** payload is returned immediately, and at
    ///   most one background rebuild is started (per-key lock plus bounded
    ///   pool); everyone else just serves stale
    ///
    /// Readers never block on a rebuild.
    pub async fn get_with_logical_expire<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        entity: &str,
        id: u64,
        logical_ttl: Duration,
        loader: F,
    ) -> CacheResult<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = CacheResult<Option<T>>> + Send + 'static,
    {
        let key = Self::cache_key(entity, id);
        let json = match self.store.get(ctx, &key).await? {
            Some(json) => json,
            None => return Ok(None),
        };

        let envelope: CacheEnvelope<T> = serde_json::from_str(&json)?;
        if !envelope.is_expired() {
            return Ok(Some(envelope.data));
        }

        // Stale. Try to become the one rebuilder; losing the race means a
        // rebuild is already in flight and there is nothing left to do.
        let options = AcquireOptions {
            resource: Self::lock_resource(entity, id),
            holder: new_holder_token(),
            lease: REBUILD_LOCK_LEASE,
        };
        if self.locks.try_acquire(ctx, &options).await? {
            let store = Arc::clone(&self.store);
            let locks = Arc::clone(&self.locks);
            let task_ctx = ctx.clone();
            let task_key = key.clone();
            let resource = options.resource.clone();
            let holder = options.holder.clone();

            let submitted = self.rebuilds.try_submit(async move {
                rebuild_entry(&store, &task_ctx, &task_key, id, logical_ttl, loader).await;
                if let Err(e) = locks.release(&task_ctx, &resource, &holder).await {
                    warn!("failed to release rebuild lock {}: {}", resource, e);
                }
            });
            if !submitted {
                debug!("rebuild pool saturated, deferring rebuild of {}", key);
                if let Err(e) = self.locks.release(ctx, &options.resource, &options.holder).await {
                    warn!("failed to release rebuild lock {}: {}", options.resource, e);
                }
            }
        }

        Ok(Some(envelope.data))
    }

    /// Read a non-hot key under the pass-through discipline.
    ///
    /// ## Behavior
    /// - Cached value: returned
    /// - Cached empty marker: `Ok(None)` without touching the backing store
    /// - Miss: take the per-key lock (bounded sleep-and-retry), re-check the
    ///   cache, then load; a backing miss caches the empty marker with a
    ///   short physical TTL
    pub async fn get_with_pass_through<T, F, Fut>(
        &self,
        ctx: &RequestContext,
        entity: &str,
        id: u64,
        ttl: Duration,
        loader: F,
    ) -> CacheResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = CacheResult<Option<T>>>,
    {
        let key = Self::cache_key(entity, id);
        if let Some(json) = self.store.get(ctx, &key).await? {
            return parse_cached(json);
        }

        let options = AcquireOptions {
            resource: Self::lock_resource(entity, id),
            holder: new_holder_token(),
            lease: REBUILD_LOCK_LEASE,
        };
        let acquired = self
            .locks
            .acquire(ctx, &options, MISS_LOCK_MAX_WAIT, MISS_LOCK_RETRY)
            .await?;

        // Whoever held the lock before us may have populated the entry.
        if let Some(json) = self.store.get(ctx, &key).await? {
            if acquired {
                let _ = self
                    .locks
                    .release(ctx, &options.resource, &options.holder)
                    .await;
            }
            return parse_cached(json);
        }

        let loaded = loader(id).await;
        match &loaded {
            Ok(Some(value)) => match serde_json::to_string(value) {
                Ok(json) => {
                    if let Err(e) = self.store.put_with_ttl(ctx, &key, json, ttl).await {
                        warn!("failed to populate cache entry {}: {}", key, e);
                    }
                }
                Err(e) => warn!("failed to serialize cache entry {}: {}", key, e),
            },
            Ok(None) => {
                if let Err(e) = self
                    .store
                    .put_with_ttl(ctx, &key, EMPTY_MARKER.to_string(), EMPTY_MARKER_TTL)
                    .await
                {
                    warn!("failed to cache empty marker {}: {}", key, e);
                }
            }
            Err(_) => {}
        }

        if acquired {
            let _ = self
                .locks
                .release(ctx, &options.resource, &options.holder)
                .await;
        }
        loaded
    }
}

fn parse_cached<T: DeserializeOwned>(json: String) -> CacheResult<Option<T>> {
    if json == EMPTY_MARKER {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&json)?))
}

/// Load, re-envelope, and write one hot key; a vanished entity evicts the
/// entry so it does not serve stale forever.
async fn rebuild_entry<T, F, Fut>(
    store: &Arc<dyn CacheStore>,
    ctx: &RequestContext,
    key: &str,
    id: u64,
    logical_ttl: Duration,
    loader: F,
) where
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce(u64) -> Fut + Send + 'static,
    Fut: Future<Output = CacheResult<Option<T>>> + Send + 'static,
{
    match loader(id).await {
        Ok(Some(value)) => {
            let envelope = CacheEnvelope::new(value, logical_ttl);
            match serde_json::to_string(&envelope) {
                Ok(json) => {
                    if let Err(e) = store.put(ctx, key, json).await {
                        warn!("cache rebuild write failed for {}: {}", key, e);
                    }
                }
                Err(e) => warn!("cache rebuild serialization failed for {}: {}", key, e),
            }
        }
        Ok(None) => {
            warn!("entity behind hot key {} no longer exists, evicting", key);
            if let Err(e) = store.delete(ctx, key).await {
                warn!("cache eviction failed for {}: {}", key, e);
            }
        }
        Err(e) => warn!("cache rebuild loader failed for {}: {}", key, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCacheStore;
    use plexdeals_locks::MemoryLockManager;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Shop {
        id: u64,
        name: String,
    }

    fn shop(id: u64, name: &str) -> Shop {
        Shop {
            id,
            name: name.to_string(),
        }
    }

    fn client() -> CacheClient {
        CacheClient::new(
            Arc::new(MemoryCacheStore::new()),
            Arc::new(MemoryLockManager::new()),
            4,
        )
    }

    #[tokio::test]
    async fn test_logical_expire_fresh_hit_never_loads() {
        let cache = client();
        let ctx = RequestContext::background();
        let loads = Arc::new(AtomicUsize::new(0));

        cache
            .put_with_logical_expire(&ctx, "shop", 1, &shop(1, "noodle bar"), Duration::from_secs(600))
            .await
            .unwrap();

        let loads_in_loader = loads.clone();
        let result: Option<Shop> = cache
            .get_with_logical_expire(&ctx, "shop", 1, Duration::from_secs(600), move |id| async move {
                loads_in_loader.fetch_add(1, Ordering::SeqCst);
                Ok(Some(shop(id, "from db")))
            })
            .await
            .unwrap();

        assert_eq!(result, Some(shop(1, "noodle bar")));
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_logical_expire_absent_key_is_not_hot() {
        let cache = client();
        let ctx = RequestContext::background();
        let loads = Arc::new(AtomicUsize::new(0));

        let loads_in_loader = loads.clone();
        let result: Option<Shop> = cache
            .get_with_logical_expire(&ctx, "shop", 99, Duration::from_secs(600), move |id| async move {
                loads_in_loader.fetch_add(1, Ordering::SeqCst);
                Ok(Some(shop(id, "from db")))
            })
            .await
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_logical_expire_stale_served_and_rebuilt_once() {
        let cache = Arc::new(client());
        let ctx = RequestContext::background();
        let loads = Arc::new(AtomicUsize::new(0));

        // Pre-warm already stale.
        cache
            .put_with_logical_expire(&ctx, "shop", 1, &shop(1, "stale name"), Duration::ZERO)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let cache = cache.clone();
            let loads = loads.clone();
            handles.push(tokio::spawn(async move {
                let ctx = RequestContext::background();
                let result: Option<Shop> = cache
                    .get_with_logical_expire(
                        &ctx,
                        "shop",
                        1,
                        Duration::from_secs(600),
                        move |id| async move {
                            loads.fetch_add(1, Ordering::SeqCst);
                            // Keep the rebuild in flight until every
                            // concurrent reader has been served.
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(Some(shop(id, "fresh name")))
                        },
                    )
                    .await
                    .unwrap();
                result
            }));
        }

        // Every concurrent reader is served the stale payload immediately.
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(shop(1, "stale name")));
        }

        // One expiration episode, one rebuild.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let loads_in_loader = loads.clone();
        let refreshed: Option<Shop> = cache
            .get_with_logical_expire(&ctx, "shop", 1, Duration::from_secs(600), move |id| async move {
                loads_in_loader.fetch_add(1, Ordering::SeqCst);
                Ok(Some(shop(id, "fresh name")))
            })
            .await
            .unwrap();
        assert_eq!(refreshed, Some(shop(1, "fresh name")));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logical_expire_vanished_entity_evicted() {
        let cache = client();
        let ctx = RequestContext::background();

        cache
            .put_with_logical_expire(&ctx, "shop", 1, &shop(1, "closing down"), Duration::ZERO)
            .await
            .unwrap();

        let stale: Option<Shop> = cache
            .get_with_logical_expire(&ctx, "shop", 1, Duration::from_secs(600), |_id| async {
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(stale, Some(shop(1, "closing down")));

        tokio::time::sleep(Duration::from_millis(100)).await;

        let after: Option<Shop> = cache
            .get_with_logical_expire(&ctx, "shop", 1, Duration::from_secs(600), |id| async move {
                Ok(Some(shop(id, "should not load")))
            })
            .await
            .unwrap();
        assert_eq!(after, None);
    }

    #[tokio::test]
    async fn test_pass_through_caches_value() {
        let cache = client();
        let ctx = RequestContext::background();
        let loads = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let loads = loads.clone();
            let result: Option<Shop> = cache
                .get_with_pass_through(&ctx, "shop", 5, Duration::from_secs(60), move |id| async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(shop(id, "tea house")))
                })
                .await
                .unwrap();
            assert_eq!(result, Some(shop(5, "tea house")));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_pass_through_caches_empty_marker() {
        let cache = client();
        let ctx = RequestContext::background();
        let loads = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let loads = loads.clone();
            let result: Option<Shop> = cache
                .get_with_pass_through(&ctx, "shop", 404, Duration::from_secs(60), move |_id| async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(None)
                })
                .await
                .unwrap();
            assert_eq!(result, None);
        }
        // Repeated lookups for a nonexistent entity hit the marker, not the
        // backing store.
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_pass_through_concurrent_missers_load_once() {
        let cache = Arc::new(client());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let cache = cache.clone();
            let loads = loads.clone();
            handles.push(tokio::spawn(async move {
                let ctx = RequestContext::background();
                let result: Option<Shop> = cache
                    .get_with_pass_through(&ctx, "shop", 6, Duration::from_secs(60), move |id| async move {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(30)).await;
                        Ok(Some(shop(id, "ramen stand")))
                    })
                    .await
                    .unwrap();
                result
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(shop(6, "ramen stand")));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_evict() {
        let cache = client();
        let ctx = RequestContext::background();

        cache
            .put_with_logical_expire(&ctx, "shop", 1, &shop(1, "x"), Duration::from_secs(600))
            .await
            .unwrap();
        cache.evict(&ctx, "shop", 1).await.unwrap();

        let result: Option<Shop> = cache
            .get_with_logical_expire(&ctx, "shop", 1, Duration::from_secs(600), |_id| async {
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(result, None);
    }
}
