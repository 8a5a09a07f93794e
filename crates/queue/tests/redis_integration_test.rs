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

//! Redis Streams queue integration tests.
//!
//! ## Running Tests
//! ```bash
//! # Start Redis
//! docker-compose up -d redis
//!
//! # Run tests
//! cargo test -p plexdeals-queue --features redis-backend --test redis_integration_test
//! ```

#![cfg(feature = "redis-backend")]

use plexdeals_common::RequestContext;
use plexdeals_queue::{OrderQueue, QueueRecord, RedisOrderQueue};
use std::time::Duration;

const REDIS_URL: &str = "redis://localhost:6379";

// Helper to check if Redis is available
fn is_redis_available() -> bool {
    redis::Client::open(REDIS_URL)
        .and_then(|client| {
            let mut conn = client.get_connection()?;
            redis::cmd("PING").query::<String>(&mut conn)
        })
        .is_ok()
}

fn unique_stream(label: &str) -> String {
    format!("it:stream:{}:{}", label, ulid::Ulid::new())
}

fn record(order_id: u64, user_id: u64) -> QueueRecord {
    QueueRecord::new()
        .with_field("orderId", order_id.to_string())
        .with_field("userId", user_id.to_string())
        .with_field("voucherId", "9")
}

#[tokio::test]
async fn test_append_claim_ack() {
    if !is_redis_available() {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let queue = RedisOrderQueue::new(REDIS_URL, &unique_stream("basic"))
        .await
        .unwrap();
    let ctx = RequestContext::background();

    queue.ensure_group(&ctx, "g1").await.unwrap();
    queue.append(&ctx, record(1, 100)).await.unwrap();

    let claimed = queue
        .read_new(&ctx, "g1", "c1", 1, Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].field("orderId"), Some("1"));
    assert_eq!(claimed[0].field("userId"), Some("100"));

    assert_eq!(queue.ack(&ctx, "g1", &claimed[0].id).await.unwrap(), 1);
    let pending = queue.read_pending(&ctx, "g1", "c1", 10).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_unacked_entries_are_replayable() {
    if !is_redis_available() {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let queue = RedisOrderQueue::new(REDIS_URL, &unique_stream("replay"))
        .await
        .unwrap();
    let ctx = RequestContext::background();

    queue.ensure_group(&ctx, "g1").await.unwrap();
    queue.append(&ctx, record(1, 100)).await.unwrap();
    queue.append(&ctx, record(2, 200)).await.unwrap();

    // Claim both, ack neither (simulated crash after claim).
    let claimed = queue
        .read_new(&ctx, "g1", "c1", 10, Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(claimed.len(), 2);

    // The pending list replays both, oldest first.
    let pending = queue.read_pending(&ctx, "g1", "c1", 10).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].field("orderId"), Some("1"));
    assert_eq!(pending[1].field("orderId"), Some("2"));

    for entry in &pending {
        queue.ack(&ctx, "g1", &entry.id).await.unwrap();
    }
    let pending = queue.read_pending(&ctx, "g1", "c1", 10).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_late_group_sees_backlog() {
    if !is_redis_available() {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let queue = RedisOrderQueue::new(REDIS_URL, &unique_stream("backlog"))
        .await
        .unwrap();
    let ctx = RequestContext::background();

    queue.append(&ctx, record(1, 100)).await.unwrap();
    queue.ensure_group(&ctx, "late").await.unwrap();

    let claimed = queue
        .read_new(&ctx, "late", "c1", 10, Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(claimed.len(), 1);
}

#[tokio::test]
async fn test_blocking_read_times_out_empty() {
    if !is_redis_available() {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let queue = RedisOrderQueue::new(REDIS_URL, &unique_stream("timeout"))
        .await
        .unwrap();
    let ctx = RequestContext::background();

    queue.ensure_group(&ctx, "g1").await.unwrap();
    let claimed = queue
        .read_new(&ctx, "g1", "c1", 1, Duration::from_millis(100))
        .await
        .unwrap();
    assert!(claimed.is_empty());
}
