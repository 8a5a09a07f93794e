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

//! Redis-based cache store implementation.

use crate::{CacheError, CacheResult, CacheStore};
use async_trait::async_trait;
use plexdeals_common::RequestContext;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Redis-backed cache store.
///
/// ## Design Decisions
/// - **Why ConnectionManager**: pooled async connections with automatic
///   reconnection, shared with the other Redis-backed components
/// - **Why native SETEX**: physical TTLs are enforced server-side; the
///   client never has to sweep
#[derive(Clone)]
pub struct RedisCacheStore {
    manager: ConnectionManager,
}

impl RedisCacheStore {
    /// Create a new Redis cache store connected to the given URL.
    pub async fn new(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::BackendError(format!("failed to create redis client: {}", e)))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::BackendError(format!("failed to connect redis: {}", e)))?;
        Ok(Self::with_manager(manager))
    }

    /// Wrap an existing connection manager (shared with other components).
    pub fn with_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, _ctx: &RequestContext, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn put(&self, _ctx: &RequestContext, key: &str, value: String) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn put_with_ttl(
        &self,
        _ctx: &RequestContext,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, _ctx: &RequestContext, key: &str) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }
}
