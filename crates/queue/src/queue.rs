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

//! Queue trait, record types, and error types.

use async_trait::async_trait;
use plexdeals_common::RequestContext;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during queue operations.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Consumer group does not exist; call `ensure_group` first.
    #[error("consumer group not found: {0}")]
    GroupNotFound(String),

    /// Entry id not understood by this backend.
    #[error("invalid entry id: {0}")]
    InvalidEntryId(String),

    /// Record rejected (e.g. empty field map).
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Backend-specific error.
    #[error("backend error: {0}")]
    BackendError(String),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// A record to append: a flat string field map (the wire contract).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueRecord {
    /// Wire fields.
    pub fields: HashMap<String, String>,
}

impl QueueRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, consuming and returning the record.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub(crate) fn validate(&self) -> QueueResult<()> {
        if self.fields.is_empty() {
            return Err(QueueError::InvalidRecord("empty field map".to_string()));
        }
        Ok(())
    }
}

/// A claimed entry: backend-assigned id plus the record's fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueEntry {
    /// Backend-assigned entry id; replay order follows id order.
    pub id: String,
    /// Wire fields as appended.
    pub fields: HashMap<String, String>,
}

impl QueueEntry {
    /// Field lookup.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Trait for the order queue.
///
/// ## Invariants
/// - Entries are delivered at least once per consumer group
/// - A claimed entry stays in the group's pending set until acknowledged
/// - `read_pending` replays a consumer's own unacknowledged claims from the
///   beginning, in id order
#[async_trait]
pub trait OrderQueue: Send + Sync {
    /// Append a record to the log.
    ///
    /// ## Returns
    /// The backend-assigned entry id.
    async fn append(&self, ctx: &RequestContext, record: QueueRecord) -> QueueResult<String>;

    /// Create the consumer group if it does not exist (idempotent).
    ///
    /// A freshly created group starts reading from the beginning of the
    /// log, so records appended before the first consumer came up are not
    /// lost.
    async fn ensure_group(&self, ctx: &RequestContext, group: &str) -> QueueResult<()>;

    /// Claim up to `count` new entries for `consumer` in `group`, waiting
    /// up to `block` for at least one to arrive.
    ///
    /// This is the only intentionally blocking call in the pipeline; it
    /// returns an empty vector on timeout. Claimed entries move into the
    /// group's pending set.
    async fn read_new(
        &self,
        ctx: &RequestContext,
        group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> QueueResult<Vec<QueueEntry>>;

    /// Read up to `count` of `consumer`'s own pending (claimed but
    /// unacknowledged) entries, from the beginning.
    async fn read_pending(
        &self,
        ctx: &RequestContext,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> QueueResult<Vec<QueueEntry>>;

    /// Acknowledge a claimed entry, removing it from the pending set.
    ///
    /// ## Returns
    /// The number of entries actually acknowledged (0 when the id was not
    /// pending, e.g. an ack retried after a crash).
    async fn ack(&self, ctx: &RequestContext, group: &str, entry_id: &str) -> QueueResult<u64>;

    /// Total number of entries in the log.
    async fn len(&self, ctx: &RequestContext) -> QueueResult<usize>;
}
