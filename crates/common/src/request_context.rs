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

//! Request context (Go-style context.Context)
//!
//! ## Purpose
//! Carries the calling user and request metadata through the call chain.
//! The admission path requires a user identity; background workers operate
//! with an anonymous context.
//!
//! ## Design Philosophy
//! - **Explicit**: always a parameter, never a thread-local
//! - **Immutable**: passed by reference, not mutated
//! - **Extensible**: metadata map for additional context

use std::collections::HashMap;
use thiserror::Error;
use ulid::Ulid;

/// Errors raised while reading required context fields.
#[derive(Error, Debug)]
pub enum ContextError {
    /// The operation requires an authenticated user but none was attached.
    #[error("no user attached to request context")]
    MissingUser,
}

/// Request-scoped context passed into every core operation.
///
/// ## Usage Pattern
/// ```rust
/// use plexdeals_common::RequestContext;
///
/// // Admission path: context built from the authenticated request
/// let ctx = RequestContext::for_user(1010);
/// assert_eq!(ctx.require_user().unwrap(), 1010);
///
/// // Background workers: anonymous context
/// let ctx = RequestContext::background();
/// assert!(ctx.user_id().is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    /// Calling user, when the operation originates from a request.
    user_id: Option<u64>,

    /// Request ID (for log correlation).
    request_id: String,

    /// Extensible key-value metadata.
    metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a context for an authenticated user.
    pub fn for_user(user_id: u64) -> Self {
        Self {
            user_id: Some(user_id),
            request_id: Ulid::new().to_string(),
            metadata: HashMap::new(),
        }
    }

    /// Create an anonymous context for background work (consumers,
    /// cache rebuilds, maintenance tasks).
    pub fn background() -> Self {
        Self {
            user_id: None,
            request_id: Ulid::new().to_string(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry, consuming and returning the context.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Calling user, if any.
    pub fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    /// Calling user, or [`ContextError::MissingUser`] when the operation
    /// must not run anonymously.
    pub fn require_user(&self) -> Result<u64, ContextError> {
        self.user_id.ok_or(ContextError::MissingUser)
    }

    /// Request ID for log correlation.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Metadata entry lookup.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_user_carries_identity() {
        let ctx = RequestContext::for_user(42);
        assert_eq!(ctx.user_id(), Some(42));
        assert_eq!(ctx.require_user().unwrap(), 42);
        assert!(!ctx.request_id().is_empty());
    }

    #[test]
    fn test_background_has_no_user() {
        let ctx = RequestContext::background();
        assert_eq!(ctx.user_id(), None);
        assert!(matches!(ctx.require_user(), Err(ContextError::MissingUser)));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestContext::background();
        let b = RequestContext::background();
        assert_ne!(a.request_id(), b.request_id());
    }

    #[test]
    fn test_metadata_round_trip() {
        let ctx = RequestContext::for_user(7).with_metadata("source", "api");
        assert_eq!(ctx.metadata("source"), Some("api"));
        assert_eq!(ctx.metadata("missing"), None);
    }
}
