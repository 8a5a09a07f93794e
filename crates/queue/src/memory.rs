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

//! In-memory order queue implementation.
//!
//! An append-only log with per-group read cursors and per-group pending
//! maps. Entry ids are monotonically increasing sequence numbers, so
//! pending-set replay order matches append order.

use crate::{OrderQueue, QueueEntry, QueueError, QueueRecord, QueueResult};
use async_trait::async_trait;
use plexdeals_common::RequestContext;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};

struct PendingEntry {
    consumer: String,
    fields: HashMap<String, String>,
}

#[derive(Default)]
struct GroupState {
    /// Index into the log of the next entry this group has not claimed.
    cursor: usize,
    /// Claimed-but-unacknowledged entries, keyed by sequence number.
    pending: BTreeMap<u64, PendingEntry>,
}

#[derive(Default)]
struct QueueState {
    log: Vec<(u64, HashMap<String, String>)>,
    next_seq: u64,
    groups: HashMap<String, GroupState>,
}

/// In-memory order queue.
///
/// ## Purpose
/// Single-process implementation of [`OrderQueue`] with the same delivery
/// and replay contract as the Redis Streams backend.
///
/// ## Limitations
/// - Not persistent (log lost on restart)
/// - Not distributed (single process only)
#[derive(Clone, Default)]
pub struct MemoryOrderQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

impl MemoryOrderQueue {
    /// Create a new in-memory queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim up to `count` unread entries for `consumer`, moving them into
    /// the group's pending set.
    async fn claim(
        &self,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> QueueResult<Vec<QueueEntry>> {
        let mut state = self.state.lock().await;
        let QueueState { log, groups, .. } = &mut *state;
        let group_state = groups
            .get_mut(group)
            .ok_or_else(|| QueueError::GroupNotFound(group.to_string()))?;

        let mut claimed = Vec::new();
        while claimed.len() < count && group_state.cursor < log.len() {
            let (seq, fields) = &log[group_state.cursor];
            group_state.cursor += 1;
            group_state.pending.insert(
                *seq,
                PendingEntry {
                    consumer: consumer.to_string(),
                    fields: fields.clone(),
                },
            );
            claimed.push(QueueEntry {
                id: seq.to_string(),
                fields: fields.clone(),
            });
        }
        Ok(claimed)
    }
}

#[async_trait]
impl OrderQueue for MemoryOrderQueue {
    async fn append(&self, _ctx: &RequestContext, record: QueueRecord) -> QueueResult<String> {
        record.validate()?;

        let seq = {
            let mut state = self.state.lock().await;
            let seq = state.next_seq;
            state.next_seq += 1;
            state.log.push((seq, record.fields));
            seq
        };
        self.notify.notify_one();
        Ok(seq.to_string())
    }

    async fn ensure_group(&self, _ctx: &RequestContext, group: &str) -> QueueResult<()> {
        let mut state = self.state.lock().await;
        state.groups.entry(group.to_string()).or_default();
        Ok(())
    }

    async fn read_new(
        &self,
        _ctx: &RequestContext,
        group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> QueueResult<Vec<QueueEntry>> {
        let deadline = tokio::time::Instant::now() + block;
        loop {
            let claimed = self.claim(group, consumer, count).await?;
            if !claimed.is_empty() {
                return Ok(claimed);
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            // Wake on append or poll again at the deadline, whichever is
            // first; spurious wakeups just re-check the log.
            let _ = tokio::time::timeout_at(deadline, self.notify.notified()).await;
        }
    }

    async fn read_pending(
        &self,
        _ctx: &RequestContext,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> QueueResult<Vec<QueueEntry>> {
        let state = self.state.lock().await;
        let group_state = state
            .groups
            .get(group)
            .ok_or_else(|| QueueError::GroupNotFound(group.to_string()))?;

        Ok(group_state
            .pending
            .iter()
            .filter(|(_, entry)| entry.consumer == consumer)
            .take(count)
            .map(|(seq, entry)| QueueEntry {
                id: seq.to_string(),
                fields: entry.fields.clone(),
            })
            .collect())
    }

    async fn ack(&self, _ctx: &RequestContext, group: &str, entry_id: &str) -> QueueResult<u64> {
        let seq: u64 = entry_id
            .parse()
            .map_err(|_| QueueError::InvalidEntryId(entry_id.to_string()))?;

        let mut state = self.state.lock().await;
        let group_state = state
            .groups
            .get_mut(group)
            .ok_or_else(|| QueueError::GroupNotFound(group.to_string()))?;

        Ok(u64::from(group_state.pending.remove(&seq).is_some()))
    }

    async fn len(&self, _ctx: &RequestContext) -> QueueResult<usize> {
        Ok(self.state.lock().await.log.len())
    }
}
