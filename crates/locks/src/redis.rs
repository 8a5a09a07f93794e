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

//! Redis-based lock manager implementation.
//!
//! ## Design Decisions
//! - **Acquisition** is one Lua script: refresh when the key already holds
//!   this token (reentrant), otherwise `SET NX PX`. Either way a single
//!   round trip, no check-then-set window.
//! - **Release** is the classic compare-and-delete script: `DEL` only when
//!   the stored token matches, so a holder that slept past its lease cannot
//!   delete the lock a new holder now owns.
//! - **Lease expiry** rides on Redis `PX`; nothing to clean up client-side.

use crate::{AcquireOptions, LockError, LockManager, LockResult};
use async_trait::async_trait;
use plexdeals_common::RequestContext;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

/// Key namespace for locks in the shared store.
const KEY_PREFIX: &str = "lock:";

const ACQUIRE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('PEXPIRE', KEYS[1], ARGV[2])
    return 1
end
if redis.call('SET', KEYS[1], ARGV[1], 'NX', 'PX', ARGV[2]) then
    return 1
end
return 0
"#;

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Redis-backed lock manager.
pub struct RedisLockManager {
    manager: ConnectionManager,
    acquire_script: Script,
    release_script: Script,
}

impl RedisLockManager {
    /// Create a new Redis lock manager connected to the given URL.
    ///
    /// Example URLs:
    /// - `redis://127.0.0.1/`
    /// - `redis+tls://host:6379/`
    pub async fn new(url: &str) -> LockResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| LockError::BackendError(format!("failed to create redis client: {}", e)))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| LockError::BackendError(format!("failed to connect redis: {}", e)))?;
        Ok(Self::with_manager(manager))
    }

    /// Wrap an existing connection manager (shared with other components).
    pub fn with_manager(manager: ConnectionManager) -> Self {
        Self {
            manager,
            acquire_script: Script::new(ACQUIRE_SCRIPT),
            release_script: Script::new(RELEASE_SCRIPT),
        }
    }

    fn lock_key(resource: &str) -> String {
        format!("{}{}", KEY_PREFIX, resource)
    }
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn try_acquire(
        &self,
        _ctx: &RequestContext,
        options: &AcquireOptions,
    ) -> LockResult<bool> {
        options.validate()?;

        let mut conn = self.manager.clone();
        let lease_ms = options.lease.as_millis() as u64;

        let acquired: i64 = self
            .acquire_script
            .key(Self::lock_key(&options.resource))
            .arg(&options.holder)
            .arg(lease_ms)
            .invoke_async(&mut conn)
            .await?;

        Ok(acquired == 1)
    }

    async fn release(
        &self,
        _ctx: &RequestContext,
        resource: &str,
        holder: &str,
    ) -> LockResult<bool> {
        let mut conn = self.manager.clone();

        let deleted: i64 = self
            .release_script
            .key(Self::lock_key(resource))
            .arg(holder)
            .invoke_async(&mut conn)
            .await?;

        Ok(deleted == 1)
    }

    async fn get_holder(
        &self,
        _ctx: &RequestContext,
        resource: &str,
    ) -> LockResult<Option<String>> {
        let mut conn = self.manager.clone();
        let holder: Option<String> = conn.get(Self::lock_key(resource)).await?;
        Ok(holder)
    }
}
