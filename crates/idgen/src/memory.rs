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

//! In-memory ID generator implementation.

use crate::{
    compose_id, counter_key, seconds_since_epoch, validate_tag, IdError, IdGenerator, IdResult,
    SEQUENCE_BITS,
};
use async_trait::async_trait;
use chrono::Utc;
use plexdeals_common::RequestContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-memory ID generator.
///
/// ## Purpose
/// Single-process implementation of [`IdGenerator`] backed by a
/// mutex-guarded counter map keyed by `(tag, day)`.
///
/// ## Limitations
/// - Not distributed (counters are per process)
/// - Counters are not persisted across restarts
#[derive(Clone, Default)]
pub struct MemoryIdGenerator {
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl MemoryIdGenerator {
    /// Create a new in-memory ID generator.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdGenerator for MemoryIdGenerator {
    async fn next_id(&self, _ctx: &RequestContext, tag: &str) -> IdResult<u64> {
        validate_tag(tag)?;

        let now = Utc::now();
        let key = counter_key(tag, now);

        let sequence = {
            let mut counters = self.counters.lock().await;
            let entry = counters.entry(key).or_insert(0);
            *entry += 1;
            *entry
        };

        if sequence >= (1 << SEQUENCE_BITS) {
            return Err(IdError::SequenceExhausted(tag.to_string()));
        }

        Ok(compose_id(seconds_since_epoch(now), sequence))
    }
}
