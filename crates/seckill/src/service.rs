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

//! Seckill service: the admission entry point.

use crate::{Admission, OrderRepository, SeckillError, SeckillResult, StockGate, Voucher};
use chrono::Utc;
use plexdeals_common::RequestContext;
use plexdeals_idgen::IdGenerator;
use std::sync::Arc;
use tracing::{debug, info};

/// Business tag for order ids.
pub const ORDER_ID_TAG: &str = "order";

/// Admission entry point.
///
/// `seckill` is synchronous with the admission decision only: it returns as
/// soon as the gate admits (or rejects) the request, while the durable
/// order materializes later through the consumer.
pub struct SeckillService {
    repository: Arc<dyn OrderRepository>,
    gate: Arc<dyn StockGate>,
    ids: Arc<dyn IdGenerator>,
}

impl SeckillService {
    /// Create a new service.
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        gate: Arc<dyn StockGate>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            repository,
            gate,
            ids,
        }
    }

    /// Publish a voucher: persist it and pre-warm the gate's fast stock
    /// counter so admission can run without touching durable storage.
    pub async fn publish_voucher(
        &self,
        ctx: &RequestContext,
        voucher: Voucher,
    ) -> SeckillResult<()> {
        let voucher_id = voucher.id;
        let units = voucher.stock;
        self.repository.put_voucher(ctx, voucher).await?;
        self.gate.seed_stock(ctx, voucher_id, units).await?;
        info!("voucher {} published with {} units", voucher_id, units);
        Ok(())
    }

    /// Attempt to buy one unit of `voucher_id` for the context's user.
    ///
    /// ## Returns
    /// The reserved order id; the durable order is created asynchronously.
    ///
    /// ## Errors
    /// - [`SeckillError::VoucherNotFound`], [`SeckillError::NotYetOpen`],
    ///   [`SeckillError::AlreadyClosed`]: window guard, checked before the
    ///   atomic script runs
    /// - [`SeckillError::OutOfStock`], [`SeckillError::DuplicateOrder`]:
    ///   gate rejections, terminal for this request
    /// - [`SeckillError::IdUnavailable`]: admission fails closed without an
    ///   order id
    pub async fn seckill(&self, ctx: &RequestContext, voucher_id: u64) -> SeckillResult<u64> {
        let user_id = ctx.require_user()?;

        let voucher = self
            .repository
            .get_voucher(ctx, voucher_id)
            .await?
            .ok_or(SeckillError::VoucherNotFound(voucher_id))?;
        let now = Utc::now();
        if now < voucher.begin_at {
            return Err(SeckillError::NotYetOpen);
        }
        if now > voucher.end_at {
            return Err(SeckillError::AlreadyClosed);
        }

        let order_id = self.ids.next_id(ctx, ORDER_ID_TAG).await?;

        match self.gate.try_admit(ctx, voucher_id, user_id, order_id).await? {
            Admission::Admitted => {
                debug!(
                    "user {} admitted for voucher {} with order {}",
                    user_id, voucher_id, order_id
                );
                Ok(order_id)
            }
            Admission::OutOfStock => Err(SeckillError::OutOfStock),
            Admission::DuplicateUser => Err(SeckillError::DuplicateOrder),
        }
    }
}
