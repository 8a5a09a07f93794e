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

//! Idempotent order creator.
//!
//! The single authoritative writer of orders. Built to be invoked more than
//! once with the same `(user_id, voucher_id)`: duplicate delivery from the
//! queue must not produce a second order or a second stock decrement.

use crate::{Order, OrderRepository, PendingOrder, SeckillError, SeckillResult};
use chrono::Utc;
use plexdeals_common::RequestContext;
use plexdeals_locks::{new_holder_token, AcquireOptions, LockManager};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Lock namespace for per-user order creation: `lock:order:<userId>`.
const ORDER_LOCK_PREFIX: &str = "order:";

/// Lease on the per-user creation lock.
const ORDER_LOCK_LEASE: Duration = Duration::from_secs(10);

/// Idempotent order creator.
///
/// ## Protocol
/// Under the per-user lock: duplicate short-circuit via the existing-order
/// check, conditional durable decrement (`remaining > 0`), then order
/// insert. With a single consumer per queue partition the lock is a safety
/// net for future multi-worker deployments rather than the sole
/// serialization mechanism.
pub struct OrderCreator {
    repository: Arc<dyn OrderRepository>,
    locks: Arc<dyn LockManager>,
}

impl OrderCreator {
    /// Create a new order creator.
    pub fn new(repository: Arc<dyn OrderRepository>, locks: Arc<dyn LockManager>) -> Self {
        Self { repository, locks }
    }

    /// Turn a pending record into a durable order, exactly-once-effective.
    ///
    /// ## Errors
    /// - [`SeckillError::LockUnavailable`]: another worker is creating an
    ///   order for this user; the record stays unacknowledged and is
    ///   retried by recovery
    /// - [`SeckillError::InconsistentStock`]: durable decrement affected no
    ///   rows despite prior admission; terminal, see the error docs
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        pending: &PendingOrder,
    ) -> SeckillResult<()> {
        let options = AcquireOptions {
            resource: format!("{}{}", ORDER_LOCK_PREFIX, pending.user_id),
            holder: new_holder_token(),
            lease: ORDER_LOCK_LEASE,
        };
        if !self.locks.try_acquire(ctx, &options).await? {
            warn!(
                "order creation for user {} already in flight",
                pending.user_id
            );
            return Err(SeckillError::LockUnavailable);
        }

        let result = self.create_locked(ctx, pending).await;
        if let Err(e) = self
            .locks
            .release(ctx, &options.resource, &options.holder)
            .await
        {
            warn!("failed to release {}: {}", options.resource, e);
        }
        result
    }

    async fn create_locked(
        &self,
        ctx: &RequestContext,
        pending: &PendingOrder,
    ) -> SeckillResult<()> {
        if self
            .repository
            .exists_order(ctx, pending.user_id, pending.voucher_id)
            .await?
        {
            // Duplicate delivery: already applied, nothing to do.
            debug!(
                "order for user {} voucher {} already exists, skipping",
                pending.user_id, pending.voucher_id
            );
            return Ok(());
        }

        if !self
            .repository
            .conditional_decrement_stock(ctx, pending.voucher_id)
            .await?
        {
            error!(
                "durable stock exhausted for voucher {} after admission of order {}",
                pending.voucher_id, pending.order_id
            );
            return Err(SeckillError::InconsistentStock {
                voucher_id: pending.voucher_id,
            });
        }

        self.repository
            .insert_order(
                ctx,
                Order {
                    id: pending.order_id,
                    user_id: pending.user_id,
                    voucher_id: pending.voucher_id,
                    created_at: Utc::now(),
                },
            )
            .await?;
        debug!(
            "order {} created for user {} voucher {}",
            pending.order_id, pending.user_id, pending.voucher_id
        );
        Ok(())
    }
}
