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

//! # PlexDeals ID Generator
//!
//! ## Purpose
//! Produces globally ordered, roughly time-sortable 64-bit identifiers for
//! order creation and other business entities.
//!
//! ## Design Decisions
//! - **Time-bucketed layout**: high 32 bits are seconds elapsed since a fixed
//!   epoch, low 32 bits a per-tag-per-day counter starting at 1. IDs trend
//!   upward over time, enabling coarse chronological sorting.
//! - **Per-day counter keys**: the counter key embeds the calendar day, so a
//!   single counter can never run out within the id space and the key itself
//!   doubles as a per-day volume audit counter.
//! - **Fail closed**: if the counter store is unreachable the call fails with
//!   [`IdError::Unavailable`]; a colliding ID is never fabricated locally.
//!
//! ## Backend Support
//! - **Memory**: mutex-guarded counter map (always available, single process)
//! - **Redis**: `INCR` on a day-bucketed key (feature: `redis-backend`)
//!
//! ## Examples
//! ```rust
//! use plexdeals_common::RequestContext;
//! use plexdeals_idgen::{IdGenerator, MemoryIdGenerator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ids = MemoryIdGenerator::new();
//! let ctx = RequestContext::background();
//! let order_id = ids.next_id(&ctx, "order").await?;
//! assert!(order_id > 0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(feature = "redis-backend")]
pub mod redis;

pub use error::{IdError, IdResult};

#[cfg(feature = "memory-backend")]
pub use memory::MemoryIdGenerator;

#[cfg(feature = "redis-backend")]
pub use redis::RedisIdGenerator;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use plexdeals_common::RequestContext;

/// Fixed epoch for the timestamp component: 2022-01-01T00:00:00Z.
pub const EPOCH_SECONDS: i64 = 1_640_995_200;

/// Number of low bits reserved for the daily sequence counter.
pub const SEQUENCE_BITS: u32 = 32;

/// Key prefix for the daily counters.
pub(crate) const COUNTER_KEY_PREFIX: &str = "icr:";

/// Trait for distributed ID generation.
///
/// ## Contract
/// For a given tag, no two calls on the same day may observe the same
/// counter value, regardless of which process issued them. IDs are
/// time-bucketed, not strictly per-caller ordered across machines.
#[async_trait]
pub trait IdGenerator: Send + Sync {
    /// Generate the next identifier for a business tag (e.g. `"order"`).
    ///
    /// ## Returns
    /// - `Ok(id)`: `(seconds since epoch << 32) | daily counter`
    /// - `Err(IdError::InvalidTag)`: empty tag
    /// - `Err(IdError::Unavailable)`: counter store unreachable
    async fn next_id(&self, ctx: &RequestContext, tag: &str) -> IdResult<u64>;
}

/// Compose the 64-bit identifier from its two components.
pub fn compose_id(seconds_since_epoch: u64, sequence: u64) -> u64 {
    (seconds_since_epoch << SEQUENCE_BITS) | (sequence & ((1 << SEQUENCE_BITS) - 1))
}

/// Seconds elapsed since the fixed epoch at `now`.
pub fn seconds_since_epoch(now: DateTime<Utc>) -> u64 {
    (now.timestamp() - EPOCH_SECONDS).max(0) as u64
}

/// Counter key for a tag on the given day: `icr:<tag>:<yyyy:MM:dd>`.
pub(crate) fn counter_key(tag: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}{}:{}",
        COUNTER_KEY_PREFIX,
        tag,
        now.format("%Y:%m:%d")
    )
}

/// Validate the business tag before touching the counter store.
pub(crate) fn validate_tag(tag: &str) -> IdResult<()> {
    if tag.is_empty() {
        return Err(IdError::InvalidTag(tag.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_compose_id_layout() {
        let id = compose_id(5, 3);
        assert_eq!(id >> SEQUENCE_BITS, 5);
        assert_eq!(id & 0xFFFF_FFFF, 3);
    }

    #[test]
    fn test_compose_id_masks_sequence() {
        // A sequence wider than 32 bits must not bleed into the timestamp.
        let id = compose_id(1, (1 << SEQUENCE_BITS) + 7);
        assert_eq!(id >> SEQUENCE_BITS, 1);
        assert_eq!(id & 0xFFFF_FFFF, 7);
    }

    #[test]
    fn test_counter_key_is_day_bucketed() {
        let day1 = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap();
        assert_eq!(counter_key("order", day1), "icr:order:2024:03:05");
        assert_ne!(counter_key("order", day1), counter_key("order", day2));
    }

    #[test]
    fn test_later_day_has_higher_timestamp_bits() {
        let day1 = Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2024, 3, 6, 10, 0, 0).unwrap();
        let id1 = compose_id(seconds_since_epoch(day1), 999_999);
        let id2 = compose_id(seconds_since_epoch(day2), 1);
        assert!(id2 > id1);
    }

    #[test]
    fn test_validate_tag_rejects_empty() {
        assert!(matches!(validate_tag(""), Err(IdError::InvalidTag(_))));
        assert!(validate_tag("order").is_ok());
    }
}
