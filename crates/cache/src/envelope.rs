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

//! Logical-expiration envelope stored for hot keys.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cached payload plus its application-level staleness timestamp.
///
/// The storage layer's physical TTL is intentionally absent for these
/// entries; `logical_expire_at` alone governs staleness decisions, so a
/// stale entry can still be served while a rebuild runs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEnvelope<T> {
    /// The cached payload.
    pub data: T,
    /// Staleness boundary, milliseconds since the Unix epoch.
    pub logical_expire_at: i64,
}

impl<T> CacheEnvelope<T> {
    /// Wrap `data` with a logical expiry of now + `ttl`.
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            logical_expire_at: Utc::now().timestamp_millis() + ttl.as_millis() as i64,
        }
    }

    /// Whether the logical expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.logical_expire_at <= Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_envelope_not_expired() {
        let envelope = CacheEnvelope::new(7u64, Duration::from_secs(600));
        assert!(!envelope.is_expired());
    }

    #[test]
    fn test_zero_ttl_envelope_expired() {
        let envelope = CacheEnvelope::new(7u64, Duration::ZERO);
        assert!(envelope.is_expired());
    }

    #[test]
    fn test_wire_field_names() {
        let envelope = CacheEnvelope {
            data: "x".to_string(),
            logical_expire_at: 1000,
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"data":"x","logicalExpireAt":1000}"#);

        let parsed: CacheEnvelope<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, envelope);
    }
}
