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

//! In-memory cache store implementation.

use crate::{CacheResult, CacheStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plexdeals_common::RequestContext;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

struct StoredValue {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires) if expires <= now)
    }
}

/// In-memory cache store.
///
/// ## Limitations
/// - Not persistent, not distributed
/// - Expired entries are dropped lazily on access
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
}

impl MemoryCacheStore {
    /// Create a new in-memory cache store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, _ctx: &RequestContext, key: &str) -> CacheResult<Option<String>> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|stored| !stored.expired(now))
            .map(|stored| stored.value.clone()))
    }

    async fn put(&self, _ctx: &RequestContext, key: &str, value: String) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn put_with_ttl(
        &self,
        _ctx: &RequestContext,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> CacheResult<()> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000));
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: Some(expires_at),
            },
        );
        Ok(())
    }

    async fn delete(&self, _ctx: &RequestContext, key: &str) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}
