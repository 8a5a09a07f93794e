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

//! Domain types and the queue wire mapping.

use crate::{SeckillError, SeckillResult};
use chrono::{DateTime, Utc};
use plexdeals_queue::{QueueEntry, QueueRecord};

/// Wire field names for pending-order records.
pub(crate) const FIELD_ORDER_ID: &str = "orderId";
pub(crate) const FIELD_USER_ID: &str = "userId";
pub(crate) const FIELD_VOUCHER_ID: &str = "voucherId";

/// A flash-sale voucher with its sale window and seeded stock.
///
/// `stock` here is the durable record; the gate's fast counter is seeded
/// from it at publication and the durable record stays authoritative.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voucher {
    /// Voucher id.
    pub id: u64,
    /// Remaining durable units; never goes negative.
    pub stock: i64,
    /// Sale opens at this instant.
    pub begin_at: DateTime<Utc>,
    /// Sale closes at this instant.
    pub end_at: DateTime<Utc>,
}

/// A durable order. At most one ever exists per `(user_id, voucher_id)`;
/// created exactly once, never mutated, never deleted by this subsystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    /// Order id minted by the ID generator at admission.
    pub id: u64,
    /// Purchasing user.
    pub user_id: u64,
    /// Purchased voucher.
    pub voucher_id: u64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// The unit of work carried on the order queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingOrder {
    /// Order id reserved at admission.
    pub order_id: u64,
    /// Admitted user.
    pub user_id: u64,
    /// Voucher a unit of which was reserved.
    pub voucher_id: u64,
}

impl PendingOrder {
    /// Encode as the flat wire field map `{orderId, userId, voucherId}`.
    pub fn to_record(self) -> QueueRecord {
        QueueRecord::new()
            .with_field(FIELD_ORDER_ID, self.order_id.to_string())
            .with_field(FIELD_USER_ID, self.user_id.to_string())
            .with_field(FIELD_VOUCHER_ID, self.voucher_id.to_string())
    }

    /// Decode from a claimed queue entry.
    pub fn from_entry(entry: &QueueEntry) -> SeckillResult<Self> {
        Ok(Self {
            order_id: parse_field(entry, FIELD_ORDER_ID)?,
            user_id: parse_field(entry, FIELD_USER_ID)?,
            voucher_id: parse_field(entry, FIELD_VOUCHER_ID)?,
        })
    }
}

fn parse_field(entry: &QueueEntry, field: &str) -> SeckillResult<u64> {
    entry
        .field(field)
        .ok_or_else(|| SeckillError::MalformedRecord(format!("missing field {}", field)))?
        .parse()
        .map_err(|_| {
            SeckillError::MalformedRecord(format!(
                "field {} is not a valid id in entry {}",
                field, entry.id
            ))
        })
}
