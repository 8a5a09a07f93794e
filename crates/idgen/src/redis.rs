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

//! Redis-based ID generator implementation.
//!
//! ## Design Decisions
//! - **INCR per day-bucketed key**: `INCR icr:<tag>:<yyyy:MM:dd>` initializes
//!   the key to 0 on first use, so the first id of each day carries
//!   sequence 1 for every tag on every node.
//! - **No local fallback**: a failed `INCR` surfaces as
//!   [`IdError::Unavailable`]; generating from a local counter could collide
//!   with ids minted by other nodes.

use crate::{
    compose_id, counter_key, seconds_since_epoch, validate_tag, IdError, IdGenerator, IdResult,
    SEQUENCE_BITS,
};
use async_trait::async_trait;
use chrono::Utc;
use plexdeals_common::RequestContext;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis-backed ID generator.
#[derive(Clone)]
pub struct RedisIdGenerator {
    manager: ConnectionManager,
}

impl RedisIdGenerator {
    /// Create a new Redis ID generator connected to the given URL.
    pub async fn new(url: &str) -> IdResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| IdError::Unavailable(format!("failed to create redis client: {}", e)))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| IdError::Unavailable(format!("failed to connect redis: {}", e)))?;
        Ok(Self { manager })
    }

    /// Wrap an existing connection manager (shared with other components).
    pub fn with_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl IdGenerator for RedisIdGenerator {
    async fn next_id(&self, _ctx: &RequestContext, tag: &str) -> IdResult<u64> {
        validate_tag(tag)?;

        let now = Utc::now();
        let key = counter_key(tag, now);

        let mut conn = self.manager.clone();
        let sequence: u64 = conn.incr(&key, 1u64).await?;

        if sequence >= (1 << SEQUENCE_BITS) {
            return Err(IdError::SequenceExhausted(tag.to_string()));
        }

        Ok(compose_id(seconds_since_epoch(now), sequence))
    }
}
