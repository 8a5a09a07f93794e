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

//! Error types for ID generation.

use thiserror::Error;

/// Result type for ID generation.
pub type IdResult<T> = Result<T, IdError>;

/// Errors that can occur while generating identifiers.
#[derive(Error, Debug)]
pub enum IdError {
    /// Counter store unreachable; the caller must fail closed.
    #[error("id counter store unavailable: {0}")]
    Unavailable(String),

    /// Business tag empty or malformed.
    #[error("invalid business tag: {0:?}")]
    InvalidTag(String),

    /// The daily sequence exceeded the 32-bit id space.
    #[error("daily sequence exhausted for tag {0}")]
    SequenceExhausted(String),
}

#[cfg(feature = "redis-backend")]
impl From<redis::RedisError> for IdError {
    fn from(err: redis::RedisError) -> Self {
        IdError::Unavailable(format!("Redis error: {}", err))
    }
}
