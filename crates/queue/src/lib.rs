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

//! # PlexDeals Order Queue
//!
//! ## Purpose
//! Append-only, consumer-group-based log carrying pending-order records from
//! the admission path to the order consumer, with at-least-once delivery and
//! a replayable pending-entries set for crash recovery.
//!
//! ## Architecture Context
//! The atomic stock gate appends a record in the same indivisible step that
//! reserves stock; the consumer claims records with a bounded long-poll,
//! acknowledges after durable order creation, and replays its own
//! unacknowledged claims after a failure.
//!
//! ## Design Decisions
//! - **Flat field maps**: records are string field maps (the wire contract),
//!   not typed payloads; encoding is the producer's concern
//! - **Backend-assigned entry ids**: replay order follows id order
//! - **No ack ⇒ redeliverable**: records stay in the group's pending set
//!   until explicitly acknowledged
//!
//! ## Backend Support
//! - **Memory**: append-only log + per-group cursor and pending map
//!   (always available)
//! - **Redis**: Streams with consumer groups (feature: `redis-backend`)
//!
//! ## Examples
//! ```rust
//! use plexdeals_common::RequestContext;
//! use plexdeals_queue::{MemoryOrderQueue, OrderQueue, QueueRecord};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = MemoryOrderQueue::new();
//! let ctx = RequestContext::background();
//!
//! queue.ensure_group(&ctx, "orders").await?;
//! queue
//!     .append(&ctx, QueueRecord::new().with_field("orderId", "77"))
//!     .await?;
//!
//! let claimed = queue
//!     .read_new(&ctx, "orders", "consumer-1", 1, Duration::from_millis(100))
//!     .await?;
//! queue.ack(&ctx, "orders", &claimed[0].id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod queue;

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use queue::{OrderQueue, QueueEntry, QueueError, QueueRecord, QueueResult};

#[cfg(feature = "memory-backend")]
pub use memory::MemoryOrderQueue;

#[cfg(feature = "redis-backend")]
pub use redis::RedisOrderQueue;
