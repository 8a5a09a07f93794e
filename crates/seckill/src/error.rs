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

//! Error types for the seckill pipeline.
//!
//! User-visible variants carry a human-readable reason distinguishing
//! "no stock" from "already purchased" from "system busy". Consumer-path
//! errors are contained by the consumer loop and never crash the process.

use thiserror::Error;

/// Result type for seckill operations.
pub type SeckillResult<T> = Result<T, SeckillError>;

/// Errors that can occur in the seckill pipeline.
#[derive(Error, Debug)]
pub enum SeckillError {
    /// Voucher does not exist.
    #[error("voucher {0} not found, please refresh")]
    VoucherNotFound(u64),

    /// The sale window has not opened yet.
    #[error("the sale has not started yet")]
    NotYetOpen,

    /// The sale window has already closed.
    #[error("the sale has already ended")]
    AlreadyClosed,

    /// No units left; terminal for this request.
    #[error("out of stock")]
    OutOfStock,

    /// The user already holds an order for this voucher; terminal.
    #[error("you have already purchased this voucher")]
    DuplicateOrder,

    /// Per-user lock contended; the caller may try again.
    #[error("system busy, please try again")]
    LockUnavailable,

    /// Order queue unreachable.
    #[error("order queue unavailable: {0}")]
    QueueUnavailable(String),

    /// Durable decrement affected no rows despite prior admission. A
    /// critical invariant violation: logged, never retried automatically
    /// (retrying without stock could oversell), requires operator attention.
    #[error("stock inconsistency for voucher {voucher_id}: durable stock exhausted after admission")]
    InconsistentStock {
        /// Voucher whose fast and durable stock disagree.
        voucher_id: u64,
    },

    /// ID generator unreachable; admission fails closed.
    #[error("id generator unavailable: {0}")]
    IdUnavailable(String),

    /// Queue record missing or carrying unparseable fields.
    #[error("malformed queue record: {0}")]
    MalformedRecord(String),

    /// Backend error (store, network, etc.).
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<plexdeals_idgen::IdError> for SeckillError {
    fn from(err: plexdeals_idgen::IdError) -> Self {
        match err {
            plexdeals_idgen::IdError::Unavailable(msg) => SeckillError::IdUnavailable(msg),
            other => SeckillError::IdUnavailable(other.to_string()),
        }
    }
}

impl From<plexdeals_queue::QueueError> for SeckillError {
    fn from(err: plexdeals_queue::QueueError) -> Self {
        SeckillError::QueueUnavailable(err.to_string())
    }
}

impl From<plexdeals_locks::LockError> for SeckillError {
    fn from(err: plexdeals_locks::LockError) -> Self {
        SeckillError::Backend(err.to_string())
    }
}

impl From<plexdeals_common::ContextError> for SeckillError {
    fn from(err: plexdeals_common::ContextError) -> Self {
        SeckillError::Backend(err.to_string())
    }
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for SeckillError {
    fn from(err: redis::RedisError) -> Self {
        SeckillError::Backend(format!("Redis error: {}", err))
    }
}
