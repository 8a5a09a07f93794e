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

//! Cache storage trait.

use crate::CacheResult;
use async_trait::async_trait;
use plexdeals_common::RequestContext;
use std::time::Duration;

/// Storage seam under [`crate::CacheClient`].
///
/// Values are opaque strings (JSON envelopes or raw payloads); the client
/// owns serialization. An expired entry is indistinguishable from an absent
/// one.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get value by key.
    async fn get(&self, ctx: &RequestContext, key: &str) -> CacheResult<Option<String>>;

    /// Store a value without a physical TTL (logical-expiration entries).
    async fn put(&self, ctx: &RequestContext, key: &str, value: String) -> CacheResult<()>;

    /// Store a value with a physical TTL (pass-through entries and empty
    /// markers).
    async fn put_with_ttl(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> CacheResult<()>;

    /// Delete a key (idempotent).
    async fn delete(&self, ctx: &RequestContext, key: &str) -> CacheResult<()>;
}
