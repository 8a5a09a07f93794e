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

//! # PlexDeals Cache
//!
//! ## Purpose
//! Cache-aside layer for hot, read-mostly entities that must not stampede
//! the backing store.
//!
//! ## Architecture Context
//! Two read disciplines, both driven by [`CacheClient`]:
//!
//! - **Logical expiration** (hot, pre-warmed keys): entries carry an
//!   application-level staleness timestamp instead of a storage TTL.
//!   Readers always get an answer immediately; a stale entry triggers at
//!   most one background rebuild per key, guarded by a distributed lock and
//!   run on a bounded worker pool.
//! - **Pass-through** (everything else): physical TTL, an empty-marker for
//!   nonexistent entities to blunt penetration, and a bounded lock/retry
//!   loop so simultaneous missers rebuild once.
//!
//! ## Design Decisions
//! - **Storage seam**: the [`CacheStore`] trait keeps the client logic
//!   backend-agnostic; memory and Redis backends honor the same contract
//! - **Replace-on-write**: entries are immutable envelopes; readers never
//!   observe a half-written value
//! - **No hidden executor**: rebuilds run on an explicitly constructed,
//!   semaphore-bounded [`RebuildPool`] owned by the client
//!
//! ## Examples
//! ```rust
//! use plexdeals_cache::{CacheClient, MemoryCacheStore};
//! use plexdeals_common::RequestContext;
//! use plexdeals_locks::MemoryLockManager;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheClient::new(
//!     Arc::new(MemoryCacheStore::new()),
//!     Arc::new(MemoryLockManager::new()),
//!     4,
//! );
//! let ctx = RequestContext::background();
//!
//! // Pre-warm a hot key, then read it.
//! cache
//!     .put_with_logical_expire(&ctx, "shop", 1, &"noodle bar".to_string(), Duration::from_secs(600))
//!     .await?;
//! let name: Option<String> = cache
//!     .get_with_logical_expire(&ctx, "shop", 1, Duration::from_secs(600), |_id| async {
//!         Ok(Some("noodle bar".to_string()))
//!     })
//!     .await?;
//! assert_eq!(name.as_deref(), Some("noodle bar"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod envelope;
pub mod error;
pub mod rebuild;
pub mod store;

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use client::CacheClient;
pub use envelope::CacheEnvelope;
pub use error::{CacheError, CacheResult};
pub use rebuild::RebuildPool;
pub use store::CacheStore;

#[cfg(feature = "memory-backend")]
pub use memory::MemoryCacheStore;

#[cfg(feature = "redis-backend")]
pub use redis::RedisCacheStore;
