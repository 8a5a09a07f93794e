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

//! # PlexDeals Seckill
//!
//! ## Purpose
//! The flash-sale admission pipeline: sell a fixed quantity of a voucher
//! exactly once per eligible user, at arbitrary request concurrency, without
//! ever overselling.
//!
//! ## Architecture Context
//! ```text
//!  request ──▶ SeckillService ──▶ StockGate (atomic script) ──▶ OrderQueue
//!                  │                                                │
//!                  ▼                                                ▼
//!             IdGenerator                                    OrderConsumer
//!                                                                   │
//!                                                                   ▼
//!                                                    OrderCreator ──▶ OrderRepository
//!                                                        │
//!                                                        ▼
//!                                                   LockManager (per user)
//! ```
//!
//! The gate decides admission and reserves capacity in one indivisible step
//! against the fast store; the consumer later materializes the durable order
//! through the idempotent creator. Admission returns as soon as it is
//! decided, not after persistence.
//!
//! ## Key Components
//! - [`SeckillService`]: time-window guard, id mint, gate call
//! - [`StockGate`]: atomic stock/duplicate check + enqueue
//! - [`OrderConsumer`]: owned worker draining the queue, with pending-list
//!   crash recovery
//! - [`OrderCreator`]: idempotent, single authoritative writer of orders
//! - [`OrderRepository`]: boundary to the (out-of-scope) relational layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod consumer;
pub mod creator;
pub mod error;
pub mod gate;
pub mod model;
pub mod repository;
pub mod service;

pub use config::{
    create_pipeline_from_config, create_pipeline_with_repository, BackendType, SeckillConfig,
    SeckillPipeline,
};
pub use consumer::{ConsumerConfig, ConsumerHandle, OrderConsumer};
pub use creator::OrderCreator;
pub use error::{SeckillError, SeckillResult};
pub use gate::{Admission, StockGate};
pub use model::{Order, PendingOrder, Voucher};
pub use repository::OrderRepository;
pub use service::SeckillService;

#[cfg(feature = "memory-backend")]
pub use gate::MemoryStockGate;
#[cfg(feature = "memory-backend")]
pub use repository::MemoryOrderRepository;

#[cfg(feature = "redis-backend")]
pub use gate::RedisStockGate;
