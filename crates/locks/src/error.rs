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

//! Error types for distributed lock operations.

use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur during lock operations.
///
/// Contention is not an error: `try_acquire` reports it as `Ok(false)`.
#[derive(Error, Debug)]
pub enum LockError {
    /// Resource name empty or malformed.
    #[error("invalid lock resource: {0:?}")]
    InvalidResource(String),

    /// Holder token empty.
    #[error("invalid holder token")]
    InvalidHolder,

    /// Zero-length lease requested.
    #[error("lock lease must be non-zero")]
    InvalidLease,

    /// Backend error (store, network, etc.).
    #[error("backend error: {0}")]
    BackendError(String),
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::BackendError(format!("Redis error: {}", err))
    }
}
