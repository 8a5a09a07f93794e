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

//! # PlexDeals Distributed Locks
//!
//! ## Purpose
//! Named, leased, reentrant-capable mutual exclusion usable by multiple
//! processes. Serializes per-user order creation and guards single-flight
//! cache rebuilds.
//!
//! ## Design Decisions
//! - **Atomic acquisition**: a single set-if-absent-with-expiry operation,
//!   never a separate check-then-set
//! - **Token-verified release**: release compares the holder token before
//!   deleting, so a process that outlived its lease cannot delete a lock
//!   already reassigned to a new holder
//! - **Server-side lease expiry**: a crashed holder cannot wedge a resource
//! - **Non-blocking by default**: `try_acquire` fails fast for the admission
//!   path; a bounded sleep-and-retry `acquire` is provided for background
//!   callers
//!
//! ## Backend Support
//! - **Memory**: map-based, expiry checked on access (always available)
//! - **Redis**: `SET NX PX` plus Lua compare-and-delete (feature:
//!   `redis-backend`)
//!
//! ## Examples
//! ```rust
//! use plexdeals_common::RequestContext;
//! use plexdeals_locks::{new_holder_token, AcquireOptions, LockManager, MemoryLockManager};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let locks = MemoryLockManager::new();
//! let ctx = RequestContext::for_user(1010);
//!
//! let options = AcquireOptions {
//!     resource: "order:1010".to_string(),
//!     holder: new_holder_token(),
//!     lease: Duration::from_secs(10),
//! };
//! if locks.try_acquire(&ctx, &options).await? {
//!     // ... critical section ...
//!     locks.release(&ctx, &options.resource, &options.holder).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod manager;

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use error::{LockError, LockResult};
pub use manager::{new_holder_token, AcquireOptions, LockManager};

#[cfg(feature = "memory-backend")]
pub use memory::MemoryLockManager;

#[cfg(feature = "redis-backend")]
pub use redis::RedisLockManager;
