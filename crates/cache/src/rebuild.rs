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

//! Bounded worker pool for background cache rebuilds.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Semaphore-bounded pool for background rebuild tasks.
///
/// ## Purpose
/// Decouples cache readers from rebuild work while keeping the number of
/// concurrent rebuilds bounded. Explicitly constructed and owned by its
/// client; there is no process-wide static executor.
///
/// ## Behavior
/// When the pool is saturated, `try_submit` refuses the task instead of
/// queueing it; the caller keeps serving the stale entry and a later
/// reader retries the rebuild.
pub struct RebuildPool {
    permits: Arc<Semaphore>,
}

impl RebuildPool {
    /// Create a pool allowing up to `max_concurrent` in-flight rebuilds.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Submit a rebuild task if a worker slot is free.
    ///
    /// ## Returns
    /// - `true`: task spawned; its slot is freed when it completes
    /// - `false`: pool saturated; task not spawned
    pub fn try_submit<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => {
                tokio::spawn(async move {
                    task.await;
                    drop(permit);
                });
                true
            }
            Err(_) => false,
        }
    }

    /// Number of currently free worker slots.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_saturated_pool_refuses_task() {
        let pool = RebuildPool::new(1);
        let (tx, rx) = oneshot::channel::<()>();

        assert!(pool.try_submit(async move {
            let _ = rx.await;
        }));
        assert_eq!(pool.available(), 0);

        // Second task refused while the first occupies the only slot.
        assert!(!pool.try_submit(async {}));

        tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(pool.available(), 1);
        assert!(pool.try_submit(async {}));
    }

    #[tokio::test]
    async fn test_zero_size_pool_still_runs_one_task() {
        let pool = RebuildPool::new(0);
        assert!(pool.try_submit(async {}));
    }
}
