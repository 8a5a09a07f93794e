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

//! Lock manager trait for distributed mutual exclusion.

use crate::{LockError, LockResult};
use async_trait::async_trait;
use plexdeals_common::RequestContext;
use std::time::Duration;
use ulid::Ulid;

/// Mint a fresh opaque holder token.
///
/// Tokens identify one acquisition and are never reused across
/// acquisitions, so a stale holder can always be told apart from the
/// current one.
pub fn new_holder_token() -> String {
    Ulid::new().to_string()
}

/// Options for acquiring a lock.
#[derive(Clone, Debug)]
pub struct AcquireOptions {
    /// Resource name; backends store it under the `lock:` key namespace.
    pub resource: String,
    /// Opaque holder token, minted by the caller per acquisition.
    pub holder: String,
    /// Lease duration; the lock auto-expires server-side after this.
    pub lease: Duration,
}

impl AcquireOptions {
    /// Validate options before any backend call.
    pub(crate) fn validate(&self) -> LockResult<()> {
        if self.resource.is_empty() {
            return Err(LockError::InvalidResource(self.resource.clone()));
        }
        if self.holder.is_empty() {
            return Err(LockError::InvalidHolder);
        }
        if self.lease.is_zero() {
            return Err(LockError::InvalidLease);
        }
        Ok(())
    }
}

/// Trait for distributed lock management.
///
/// ## Invariants
/// - At most one valid holder token per resource at a time
/// - Acquisition and release are each a single atomic operation against the
///   backing store
/// - `release` with a token that is not the current holder never removes
///   the lock
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Try to acquire the lock without blocking.
    ///
    /// ## Behavior
    /// - Resource free (or lease expired): acquired, `Ok(true)`
    /// - Held by the same holder token: lease refreshed, `Ok(true)`
    ///   (reentrant re-acquisition)
    /// - Held by a different holder: `Ok(false)`, returns immediately
    async fn try_acquire(&self, ctx: &RequestContext, options: &AcquireOptions)
        -> LockResult<bool>;

    /// Release the lock if and only if `holder` is the current holder.
    ///
    /// ## Returns
    /// - `Ok(true)`: this holder owned the lock and it was removed
    /// - `Ok(false)`: lock absent, expired, or owned by someone else; no
    ///   change was made
    async fn release(&self, ctx: &RequestContext, resource: &str, holder: &str)
        -> LockResult<bool>;

    /// Current holder token of the resource, if any.
    async fn get_holder(&self, ctx: &RequestContext, resource: &str)
        -> LockResult<Option<String>>;

    /// Blocking acquisition variant: retry `try_acquire` with a fixed delay
    /// until it succeeds or `max_wait` elapses.
    ///
    /// Intended for background callers (consumers, cache pass-through); the
    /// admission path uses `try_acquire` directly and fails fast.
    async fn acquire(
        &self,
        ctx: &RequestContext,
        options: &AcquireOptions,
        max_wait: Duration,
        retry_every: Duration,
    ) -> LockResult<bool> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            if self.try_acquire(ctx, options).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() + retry_every > deadline {
                return Ok(false);
            }
            tokio::time::sleep(retry_every).await;
        }
    }
}
