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

//! Persistence boundary to the relational layer.
//!
//! The relational schema and its access layer are owned elsewhere; this
//! trait is everything the pipeline needs from it. The in-memory
//! implementation honors the same contracts (conditional decrement,
//! uniqueness on `(user_id, voucher_id)`) and backs tests and single-node
//! deployments.

use crate::{Order, SeckillError, SeckillResult, Voucher};
use async_trait::async_trait;
use plexdeals_common::RequestContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Boundary to durable voucher and order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Fetch a voucher (sale window and durable stock).
    async fn get_voucher(&self, ctx: &RequestContext, voucher_id: u64)
        -> SeckillResult<Option<Voucher>>;

    /// Create or replace a voucher (publication path).
    async fn put_voucher(&self, ctx: &RequestContext, voucher: Voucher) -> SeckillResult<()>;

    /// Remaining durable units for a voucher.
    async fn get_stock(&self, ctx: &RequestContext, voucher_id: u64)
        -> SeckillResult<Option<i64>>;

    /// Atomically decrement stock where `remaining > 0`.
    ///
    /// ## Returns
    /// `true` when a row was affected; `false` means no stock was left and
    /// nothing changed. This is the durable half of the no-oversell
    /// invariant; it must never be emulated with read-then-write.
    async fn conditional_decrement_stock(
        &self,
        ctx: &RequestContext,
        voucher_id: u64,
    ) -> SeckillResult<bool>;

    /// Whether an order already exists for `(user_id, voucher_id)`.
    async fn exists_order(
        &self,
        ctx: &RequestContext,
        user_id: u64,
        voucher_id: u64,
    ) -> SeckillResult<bool>;

    /// Persist a new order. Fails if one already exists for the same
    /// `(user_id, voucher_id)` (uniqueness constraint).
    async fn insert_order(&self, ctx: &RequestContext, order: Order) -> SeckillResult<()>;
}

#[cfg(feature = "memory-backend")]
#[derive(Default)]
struct RepositoryState {
    vouchers: HashMap<u64, Voucher>,
    orders: HashMap<(u64, u64), Order>,
}

/// In-memory repository implementation.
#[cfg(feature = "memory-backend")]
#[derive(Clone, Default)]
pub struct MemoryOrderRepository {
    state: Arc<RwLock<RepositoryState>>,
}

#[cfg(feature = "memory-backend")]
impl MemoryOrderRepository {
    /// Create a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// All orders recorded for a voucher (test/inspection helper).
    pub async fn orders_for_voucher(&self, voucher_id: u64) -> Vec<Order> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| order.voucher_id == voucher_id)
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.id);
        orders
    }
}

#[cfg(feature = "memory-backend")]
#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn get_voucher(
        &self,
        _ctx: &RequestContext,
        voucher_id: u64,
    ) -> SeckillResult<Option<Voucher>> {
        let state = self.state.read().await;
        Ok(state.vouchers.get(&voucher_id).cloned())
    }

    async fn put_voucher(&self, _ctx: &RequestContext, voucher: Voucher) -> SeckillResult<()> {
        let mut state = self.state.write().await;
        state.vouchers.insert(voucher.id, voucher);
        Ok(())
    }

    async fn get_stock(
        &self,
        _ctx: &RequestContext,
        voucher_id: u64,
    ) -> SeckillResult<Option<i64>> {
        let state = self.state.read().await;
        Ok(state.vouchers.get(&voucher_id).map(|voucher| voucher.stock))
    }

    async fn conditional_decrement_stock(
        &self,
        _ctx: &RequestContext,
        voucher_id: u64,
    ) -> SeckillResult<bool> {
        let mut state = self.state.write().await;
        match state.vouchers.get_mut(&voucher_id) {
            Some(voucher) if voucher.stock > 0 => {
                voucher.stock -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn exists_order(
        &self,
        _ctx: &RequestContext,
        user_id: u64,
        voucher_id: u64,
    ) -> SeckillResult<bool> {
        let state = self.state.read().await;
        Ok(state.orders.contains_key(&(user_id, voucher_id)))
    }

    async fn insert_order(&self, _ctx: &RequestContext, order: Order) -> SeckillResult<()> {
        let mut state = self.state.write().await;
        let key = (order.user_id, order.voucher_id);
        if state.orders.contains_key(&key) {
            // Mirrors the relational unique index on (user_id, voucher_id).
            return Err(SeckillError::Backend(format!(
                "order already exists for user {} voucher {}",
                order.user_id, order.voucher_id
            )));
        }
        state.orders.insert(key, order);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn voucher(id: u64, stock: i64) -> Voucher {
        Voucher {
            id,
            stock,
            begin_at: Utc::now() - chrono::Duration::hours(1),
            end_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    #[tokio::test]
    async fn test_conditional_decrement_stops_at_zero() {
        let repo = MemoryOrderRepository::new();
        let ctx = RequestContext::background();

        repo.put_voucher(&ctx, voucher(1, 2)).await.unwrap();
        assert!(repo.conditional_decrement_stock(&ctx, 1).await.unwrap());
        assert!(repo.conditional_decrement_stock(&ctx, 1).await.unwrap());
        assert!(!repo.conditional_decrement_stock(&ctx, 1).await.unwrap());
        assert_eq!(repo.get_stock(&ctx, 1).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_conditional_decrement_unknown_voucher() {
        let repo = MemoryOrderRepository::new();
        let ctx = RequestContext::background();
        assert!(!repo.conditional_decrement_stock(&ctx, 404).await.unwrap());
    }

    #[tokio::test]
    async fn test_order_uniqueness_enforced() {
        let repo = MemoryOrderRepository::new();
        let ctx = RequestContext::background();

        let order = Order {
            id: 1,
            user_id: 10,
            voucher_id: 1,
            created_at: Utc::now(),
        };
        repo.insert_order(&ctx, order.clone()).await.unwrap();
        assert!(repo.exists_order(&ctx, 10, 1).await.unwrap());

        let duplicate = Order { id: 2, ..order };
        assert!(repo.insert_order(&ctx, duplicate).await.is_err());
        assert_eq!(repo.orders_for_voucher(1).await.len(), 1);
    }
}
