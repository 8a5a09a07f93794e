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

//! In-memory lock manager implementation.

use crate::{AcquireOptions, LockManager, LockResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plexdeals_common::RequestContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct LockEntry {
    holder: String,
    expires_at: DateTime<Utc>,
}

impl LockEntry {
    fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// In-memory lock manager.
///
/// ## Purpose
/// Single-process implementation of [`LockManager`] with the same
/// observable contract as the Redis backend.
///
/// ## Limitations
/// - Not persistent (locks lost on restart)
/// - Not distributed (single process only)
/// - Expired entries are dropped lazily on access, mirroring how a
///   TTL-expired key is simply absent in the distributed backend
#[derive(Clone, Default)]
pub struct MemoryLockManager {
    locks: Arc<RwLock<HashMap<String, LockEntry>>>,
}

impl MemoryLockManager {
    /// Create a new in-memory lock manager.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn try_acquire(
        &self,
        _ctx: &RequestContext,
        options: &AcquireOptions,
    ) -> LockResult<bool> {
        options.validate()?;

        let now = Utc::now();
        let expires_at = now
            + chrono::Duration::from_std(options.lease)
                .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000));

        let mut locks = self.locks.write().await;
        match locks.get(&options.resource) {
            Some(existing) if !existing.expired(now) && existing.holder != options.holder => {
                Ok(false)
            }
            _ => {
                // Free, expired, or re-acquired by the same holder: (re)take
                // it and refresh the lease.
                locks.insert(
                    options.resource.clone(),
                    LockEntry {
                        holder: options.holder.clone(),
                        expires_at,
                    },
                );
                Ok(true)
            }
        }
    }

    async fn release(
        &self,
        _ctx: &RequestContext,
        resource: &str,
        holder: &str,
    ) -> LockResult<bool> {
        let now = Utc::now();
        let mut locks = self.locks.write().await;

        match locks.get(resource) {
            Some(existing) if existing.expired(now) => {
                // Lease already lapsed; the entry is as good as gone and this
                // caller no longer owns anything.
                locks.remove(resource);
                Ok(false)
            }
            Some(existing) if existing.holder == holder => {
                locks.remove(resource);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_holder(
        &self,
        _ctx: &RequestContext,
        resource: &str,
    ) -> LockResult<Option<String>> {
        let now = Utc::now();
        let locks = self.locks.read().await;
        Ok(locks
            .get(resource)
            .filter(|entry| !entry.expired(now))
            .map(|entry| entry.holder.clone()))
    }
}
