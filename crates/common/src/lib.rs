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

//! # PlexDeals Common
//!
//! ## Purpose
//! Shared request-scoped context for all PlexDeals crates. Every core
//! operation takes a [`RequestContext`] parameter explicitly; no component
//! reads the calling user or request identity from ambient/global state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod request_context;

pub use request_context::{ContextError, RequestContext};
