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

//! Atomic stock gate.
//!
//! One indivisible step decides admission: read remaining stock, read
//! whether the user already ordered, and only when both checks pass,
//! reserve a unit and append the pending-order record to the queue. No two
//! concurrent callers can both observe `stock == 1` and both succeed.
//!
//! ## Fast-store key namespaces
//! - Stock counters: `seckill:stock:<voucherId>`
//! - Purchaser sets: `seckill:order:<voucherId>`

use crate::{PendingOrder, SeckillError, SeckillResult};
use async_trait::async_trait;
use plexdeals_common::RequestContext;

#[cfg(feature = "memory-backend")]
use plexdeals_queue::OrderQueue;

/// Outcome of an admission attempt, mirroring the script codes 0/1/2.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Unit reserved and pending record enqueued.
    Admitted,
    /// No stock remaining.
    OutOfStock,
    /// The user already holds (or is pending) an order for this voucher.
    DuplicateUser,
}

/// Trait for the atomic stock gate.
#[async_trait]
pub trait StockGate: Send + Sync {
    /// Attempt to admit `user_id` for one unit of `voucher_id`, carrying
    /// `order_id` into the pending record. Executes as one atomic step
    /// against the fast store; never blocks on contention.
    async fn try_admit(
        &self,
        ctx: &RequestContext,
        voucher_id: u64,
        user_id: u64,
        order_id: u64,
    ) -> SeckillResult<Admission>;

    /// Pre-warm the fast stock counter for a voucher (publication path).
    /// A voucher that was never seeded is treated as out of stock.
    async fn seed_stock(
        &self,
        ctx: &RequestContext,
        voucher_id: u64,
        units: i64,
    ) -> SeckillResult<()>;

    /// Current fast-counter value (observability and tests).
    async fn get_fast_stock(
        &self,
        ctx: &RequestContext,
        voucher_id: u64,
    ) -> SeckillResult<Option<i64>>;
}

#[cfg(feature = "memory-backend")]
mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct GateState {
        stock: HashMap<u64, i64>,
        purchasers: HashMap<u64, HashSet<u64>>,
    }

    /// In-memory stock gate.
    ///
    /// A single async mutex over the counters and purchaser sets is held
    /// across the queue append, so admission plus enqueue is one
    /// indivisible step with respect to every other admitter, matching the
    /// serialization the Lua script provides on Redis.
    pub struct MemoryStockGate {
        state: Mutex<GateState>,
        queue: Arc<dyn OrderQueue>,
    }

    impl MemoryStockGate {
        /// Create a gate appending admitted records to `queue`.
        pub fn new(queue: Arc<dyn OrderQueue>) -> Self {
            Self {
                state: Mutex::new(GateState::default()),
                queue,
            }
        }
    }

    #[async_trait]
    impl StockGate for MemoryStockGate {
        async fn try_admit(
            &self,
            ctx: &RequestContext,
            voucher_id: u64,
            user_id: u64,
            order_id: u64,
        ) -> SeckillResult<Admission> {
            let mut state = self.state.lock().await;

            match state.stock.get(&voucher_id) {
                Some(units) if *units > 0 => {}
                _ => return Ok(Admission::OutOfStock),
            }
            if state
                .purchasers
                .get(&voucher_id)
                .is_some_and(|users| users.contains(&user_id))
            {
                return Ok(Admission::DuplicateUser);
            }

            *state.stock.entry(voucher_id).or_insert(0) -= 1;
            state
                .purchasers
                .entry(voucher_id)
                .or_default()
                .insert(user_id);

            let pending = PendingOrder {
                order_id,
                user_id,
                voucher_id,
            };
            if let Err(e) = self.queue.append(ctx, pending.to_record()).await {
                // All-or-nothing: a failed enqueue rolls the reservation
                // back so the unit is not lost.
                *state.stock.entry(voucher_id).or_insert(0) += 1;
                if let Some(users) = state.purchasers.get_mut(&voucher_id) {
                    users.remove(&user_id);
                }
                return Err(SeckillError::QueueUnavailable(e.to_string()));
            }

            Ok(Admission::Admitted)
        }

        async fn seed_stock(
            &self,
            _ctx: &RequestContext,
            voucher_id: u64,
            units: i64,
        ) -> SeckillResult<()> {
            let mut state = self.state.lock().await;
            state.stock.insert(voucher_id, units);
            Ok(())
        }

        async fn get_fast_stock(
            &self,
            _ctx: &RequestContext,
            voucher_id: u64,
        ) -> SeckillResult<Option<i64>> {
            let state = self.state.lock().await;
            Ok(state.stock.get(&voucher_id).copied())
        }
    }
}

#[cfg(feature = "memory-backend")]
pub use memory::MemoryStockGate;

#[cfg(feature = "redis-backend")]
mod redis_gate {
    use super::*;
    use redis::aio::ConnectionManager;
    use redis::{AsyncCommands, Script};

    const STOCK_KEY_PREFIX: &str = "seckill:stock:";
    const ORDER_SET_KEY_PREFIX: &str = "seckill:order:";

    /// Admission script. KEYS: stock counter, purchaser set, order stream.
    /// ARGV: userId, voucherId, orderId. Returns 0 admitted, 1 out of
    /// stock, 2 duplicate user.
    const ADMISSION_SCRIPT: &str = r#"
local stock = redis.call('GET', KEYS[1])
if not stock or tonumber(stock) <= 0 then
    return 1
end
if redis.call('SISMEMBER', KEYS[2], ARGV[1]) == 1 then
    return 2
end
redis.call('INCRBY', KEYS[1], -1)
redis.call('SADD', KEYS[2], ARGV[1])
redis.call('XADD', KEYS[3], '*', 'userId', ARGV[1], 'voucherId', ARGV[2], 'orderId', ARGV[3])
return 0
"#;

    /// Redis-backed stock gate.
    ///
    /// The script appends directly onto the same stream the Redis order
    /// queue reads, inside the script's atomic execution.
    pub struct RedisStockGate {
        manager: ConnectionManager,
        script: Script,
        stream_key: String,
    }

    impl RedisStockGate {
        /// Create a gate connected to the given URL, enqueueing onto
        /// `stream_key`.
        pub async fn new(url: &str, stream_key: &str) -> SeckillResult<Self> {
            let client = redis::Client::open(url)
                .map_err(|e| SeckillError::Backend(format!("failed to create redis client: {}", e)))?;
            let manager = ConnectionManager::new(client)
                .await
                .map_err(|e| SeckillError::Backend(format!("failed to connect redis: {}", e)))?;
            Ok(Self::with_manager(manager, stream_key))
        }

        /// Wrap an existing connection manager (shared with other
        /// components).
        pub fn with_manager(manager: ConnectionManager, stream_key: &str) -> Self {
            Self {
                manager,
                script: Script::new(ADMISSION_SCRIPT),
                stream_key: stream_key.to_string(),
            }
        }

        fn stock_key(voucher_id: u64) -> String {
            format!("{}{}", STOCK_KEY_PREFIX, voucher_id)
        }

        fn order_set_key(voucher_id: u64) -> String {
            format!("{}{}", ORDER_SET_KEY_PREFIX, voucher_id)
        }
    }

    #[async_trait]
    impl StockGate for RedisStockGate {
        async fn try_admit(
            &self,
            _ctx: &RequestContext,
            voucher_id: u64,
            user_id: u64,
            order_id: u64,
        ) -> SeckillResult<Admission> {
            let mut conn = self.manager.clone();
            let code: i64 = self
                .script
                .key(Self::stock_key(voucher_id))
                .key(Self::order_set_key(voucher_id))
                .key(&self.stream_key)
                .arg(user_id)
                .arg(voucher_id)
                .arg(order_id)
                .invoke_async(&mut conn)
                .await?;

            match code {
                0 => Ok(Admission::Admitted),
                1 => Ok(Admission::OutOfStock),
                2 => Ok(Admission::DuplicateUser),
                other => Err(SeckillError::Backend(format!(
                    "admission script returned unexpected code {}",
                    other
                ))),
            }
        }

        async fn seed_stock(
            &self,
            _ctx: &RequestContext,
            voucher_id: u64,
            units: i64,
        ) -> SeckillResult<()> {
            let mut conn = self.manager.clone();
            conn.set::<_, _, ()>(Self::stock_key(voucher_id), units)
                .await?;
            Ok(())
        }

        async fn get_fast_stock(
            &self,
            _ctx: &RequestContext,
            voucher_id: u64,
        ) -> SeckillResult<Option<i64>> {
            let mut conn = self.manager.clone();
            let units: Option<i64> = conn.get(Self::stock_key(voucher_id)).await?;
            Ok(units)
        }
    }
}

#[cfg(feature = "redis-backend")]
pub use redis_gate::RedisStockGate;
