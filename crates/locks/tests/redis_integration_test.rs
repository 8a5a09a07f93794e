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

//! Redis lock integration tests.
//!
//! ## Running Tests
//! ```bash
//! # Start Redis
//! docker-compose up -d redis
//!
//! # Run tests
//! cargo test -p plexdeals-locks --features redis-backend --test redis_integration_test
//! ```

#![cfg(feature = "redis-backend")]

use plexdeals_common::RequestContext;
use plexdeals_locks::{new_holder_token, AcquireOptions, LockManager, RedisLockManager};
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

fn unique_resource(label: &str) -> String {
    format!("it:{}:{}", label, ulid::Ulid::new())
}

#[tokio::test]
async fn test_acquire_and_release() {
    if !is_redis_available() {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let locks = RedisLockManager::new(REDIS_URL).await.unwrap();
    let ctx = RequestContext::background();
    let resource = unique_resource("basic");

    let options = AcquireOptions {
        resource: resource.clone(),
        holder: new_holder_token(),
        lease: Duration::from_secs(10),
    };
    assert!(locks.try_acquire(&ctx, &options).await.unwrap());
    assert_eq!(
        locks.get_holder(&ctx, &resource).await.unwrap(),
        Some(options.holder.clone())
    );
    assert!(locks.release(&ctx, &resource, &options.holder).await.unwrap());
    assert_eq!(locks.get_holder(&ctx, &resource).await.unwrap(), None);
}

#[tokio::test]
async fn test_contention_and_foreign_release() {
    if !is_redis_available() {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let locks = RedisLockManager::new(REDIS_URL).await.unwrap();
    let ctx = RequestContext::background();
    let resource = unique_resource("contended");

    let winner = AcquireOptions {
        resource: resource.clone(),
        holder: new_holder_token(),
        lease: Duration::from_secs(10),
    };
    let loser = AcquireOptions {
        resource: resource.clone(),
        holder: new_holder_token(),
        lease: Duration::from_secs(10),
    };

    assert!(locks.try_acquire(&ctx, &winner).await.unwrap());
    assert!(!locks.try_acquire(&ctx, &loser).await.unwrap());

    // A non-holder release must not evict the winner.
    assert!(!locks.release(&ctx, &resource, &loser.holder).await.unwrap());
    assert_eq!(
        locks.get_holder(&ctx, &resource).await.unwrap(),
        Some(winner.holder.clone())
    );

    locks.release(&ctx, &resource, &winner.holder).await.unwrap();
}

#[tokio::test]
async fn test_lease_expiry_allows_reacquisition() {
    if !is_redis_available() {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let locks = RedisLockManager::new(REDIS_URL).await.unwrap();
    let ctx = RequestContext::background();
    let resource = unique_resource("expiry");

    let first = AcquireOptions {
        resource: resource.clone(),
        holder: new_holder_token(),
        lease: Duration::from_millis(100),
    };
    assert!(locks.try_acquire(&ctx, &first).await.unwrap());

    tokio::time::sleep(Duration::from_millis(250)).await;

    let second = AcquireOptions {
        resource: resource.clone(),
        holder: new_holder_token(),
        lease: Duration::from_secs(10),
    };
    assert!(locks.try_acquire(&ctx, &second).await.unwrap());

    // Stale holder must not be able to delete the new lease.
    assert!(!locks.release(&ctx, &resource, &first.holder).await.unwrap());

    locks.release(&ctx, &resource, &second.holder).await.unwrap();
}

#[tokio::test]
async fn test_reentrant_refresh() {
    if !is_redis_available() {
        eprintln!("Skipping test: Redis not available");
        return;
    }

    let locks = RedisLockManager::new(REDIS_URL).await.unwrap();
    let ctx = RequestContext::background();
    let resource = unique_resource("reentrant");

    let options = AcquireOptions {
        resource: resource.clone(),
        holder: new_holder_token(),
        lease: Duration::from_secs(10),
    };
    assert!(locks.try_acquire(&ctx, &options).await.unwrap());
    assert!(locks.try_acquire(&ctx, &options).await.unwrap());

    locks.release(&ctx, &resource, &options.holder).await.unwrap();
}
