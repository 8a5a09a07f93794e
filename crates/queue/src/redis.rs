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

//! Redis Streams order queue implementation.
//!
//! ## Design Decisions
//! - **XADD for append**: entry ids are Redis-generated
//!   (timestamp-sequence), so replay order matches append order
//! - **XREADGROUP `>` for new entries**: claims move into the group's
//!   pending-entries list until `XACK`
//! - **XREADGROUP `0` for recovery**: re-reads the calling consumer's own
//!   pending entries from the beginning
//! - **XGROUP CREATE ... 0 MKSTREAM**: a freshly created group sees records
//!   appended before the first consumer came up

use crate::{OrderQueue, QueueEntry, QueueError, QueueRecord, QueueResult};
use async_trait::async_trait;
use plexdeals_common::RequestContext;
use redis::aio::ConnectionManager;
use redis::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Redis Streams-backed order queue.
#[derive(Clone)]
pub struct RedisOrderQueue {
    manager: ConnectionManager,
    stream_key: String,
}

impl RedisOrderQueue {
    /// Create a new queue on `stream_key`, connected to the given URL.
    pub async fn new(url: &str, stream_key: &str) -> QueueResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            QueueError::BackendError(format!("failed to create redis client: {}", e))
        })?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| QueueError::BackendError(format!("failed to connect redis: {}", e)))?;
        Ok(Self::with_manager(manager, stream_key))
    }

    /// Wrap an existing connection manager (shared with other components).
    pub fn with_manager(manager: ConnectionManager, stream_key: &str) -> Self {
        Self {
            manager,
            stream_key: stream_key.to_string(),
        }
    }

    /// Stream key this queue appends to and reads from.
    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    async fn read_group(
        &self,
        group: &str,
        consumer: &str,
        count: usize,
        block: Option<Duration>,
        offset: &str,
    ) -> QueueResult<Vec<QueueEntry>> {
        let mut conn = self.manager.clone();

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(group)
            .arg(consumer)
            .arg("COUNT")
            .arg(count);
        if let Some(block) = block {
            cmd.arg("BLOCK").arg(block.as_millis() as u64);
        }
        cmd.arg("STREAMS").arg(&self.stream_key).arg(offset);

        let reply: Option<Value> = cmd.query_async(&mut conn).await.map_err(|e| {
            if e.to_string().contains("NOGROUP") {
                QueueError::GroupNotFound(group.to_string())
            } else {
                QueueError::BackendError(format!("XREADGROUP failed: {}", e))
            }
        })?;

        parse_stream_reply(reply)
    }
}

#[async_trait]
impl OrderQueue for RedisOrderQueue {
    async fn append(&self, _ctx: &RequestContext, record: QueueRecord) -> QueueResult<String> {
        record.validate()?;

        let mut conn = self.manager.clone();
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.stream_key).arg("*");
        for (key, value) in &record.fields {
            cmd.arg(key).arg(value);
        }

        let entry_id: String = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::BackendError(format!("XADD failed: {}", e)))?;
        Ok(entry_id)
    }

    async fn ensure_group(&self, _ctx: &RequestContext, group: &str) -> QueueResult<()> {
        let mut conn = self.manager.clone();
        let result: Result<Value, redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => Ok(()),
            // Group already exists: creation is idempotent.
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(QueueError::BackendError(format!(
                "XGROUP CREATE failed: {}",
                e
            ))),
        }
    }

    async fn read_new(
        &self,
        _ctx: &RequestContext,
        group: &str,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> QueueResult<Vec<QueueEntry>> {
        self.read_group(group, consumer, count, Some(block), ">")
            .await
    }

    async fn read_pending(
        &self,
        _ctx: &RequestContext,
        group: &str,
        consumer: &str,
        count: usize,
    ) -> QueueResult<Vec<QueueEntry>> {
        self.read_group(group, consumer, count, None, "0").await
    }

    async fn ack(&self, _ctx: &RequestContext, group: &str, entry_id: &str) -> QueueResult<u64> {
        let mut conn = self.manager.clone();
        let acked: u64 = redis::cmd("XACK")
            .arg(&self.stream_key)
            .arg(group)
            .arg(entry_id)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::BackendError(format!("XACK failed: {}", e)))?;
        Ok(acked)
    }

    async fn len(&self, _ctx: &RequestContext) -> QueueResult<usize> {
        let mut conn = self.manager.clone();
        let length: usize = redis::cmd("XLEN")
            .arg(&self.stream_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| QueueError::BackendError(format!("XLEN failed: {}", e)))?;
        Ok(length)
    }
}

/// Parse an XREADGROUP reply into entries.
///
/// Reply shape: `[[stream_key, [[id, [k1, v1, k2, v2, ...]], ...]]]`, or
/// nil when a blocking read timed out.
fn parse_stream_reply(reply: Option<Value>) -> QueueResult<Vec<QueueEntry>> {
    let mut entries = Vec::new();
    let Some(Value::Bulk(streams)) = reply else {
        return Ok(entries);
    };

    for stream in streams {
        let Value::Bulk(stream_parts) = stream else {
            continue;
        };
        let Some(Value::Bulk(stream_entries)) = stream_parts.into_iter().nth(1) else {
            continue;
        };

        for entry in stream_entries {
            let Value::Bulk(entry_parts) = entry else {
                continue;
            };
            let mut parts = entry_parts.into_iter();
            let Some(Value::Data(id_bytes)) = parts.next() else {
                continue;
            };
            let Some(Value::Bulk(field_values)) = parts.next() else {
                continue;
            };

            let mut fields = HashMap::new();
            let mut field_iter = field_values.into_iter();
            while let (Some(key), Some(value)) = (field_iter.next(), field_iter.next()) {
                if let (Value::Data(key), Value::Data(value)) = (key, value) {
                    fields.insert(
                        String::from_utf8_lossy(&key).into_owned(),
                        String::from_utf8_lossy(&value).into_owned(),
                    );
                }
            }

            entries.push(QueueEntry {
                id: String::from_utf8_lossy(&id_bytes).into_owned(),
                fields,
            });
        }
    }

    Ok(entries)
}
