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

//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend error (store, network, etc.).
    #[error("backend error: {0}")]
    BackendError(String),

    /// Envelope could not be serialized or parsed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Rebuild-lock operation failed.
    #[error("lock error: {0}")]
    LockError(String),

    /// Backing-store loader failed.
    #[error("loader error: {0}")]
    LoaderError(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializationError(err.to_string())
    }
}

impl From<plexdeals_locks::LockError> for CacheError {
    fn from(err: plexdeals_locks::LockError) -> Self {
        CacheError::LockError(err.to_string())
    }
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::BackendError(format!("Redis error: {}", err))
    }
}
