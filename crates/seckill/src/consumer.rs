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

//! Order queue consumer.
//!
//! An explicitly constructed, owned worker: `start()` spawns the loop and
//! hands back a handle, `stop()` signals shutdown and joins. There is no
//! hidden static executor.
//!
//! ## Loop structure
//! - **Startup recovery**: the consumer's own pending entries (claimed by a
//!   previous incarnation that crashed before acknowledging) are replayed
//!   before any new reads.
//! - **Main loop**: bounded block-read of new records; each is applied via
//!   the idempotent creator and acknowledged on success.
//! - **Failure recovery**: a processing failure leaves the record
//!   unacknowledged and drains the pending list through the same idempotent
//!   path; reprocessing a record whose order already exists is a no-op.
//!
//! Consumer-path errors are contained here: logged, the record left for
//! recovery, the loop never crashes the process.

use crate::{OrderCreator, PendingOrder, SeckillError, SeckillResult};
use plexdeals_common::RequestContext;
use plexdeals_queue::{OrderQueue, QueueEntry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Pause between recovery attempts when a pending entry keeps failing.
const RECOVERY_BACKOFF: Duration = Duration::from_millis(20);

/// Consumer identity and read tuning.
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    /// Consumer group name (deployment configuration, not protocol).
    pub group: String,
    /// Per-instance consumer name within the group.
    pub consumer: String,
    /// Records claimed per read.
    pub batch: usize,
    /// Bounded long-poll duration of the blocking read.
    pub block: Duration,
    /// Backoff after a failed queue read.
    pub read_retry: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group: "g1".to_string(),
            consumer: "c1".to_string(),
            batch: 1,
            block: Duration::from_secs(2),
            read_retry: Duration::from_secs(1),
        }
    }
}

/// Handle to a running consumer; dropping it does NOT stop the worker.
pub struct ConsumerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Signal shutdown and wait for the loop to exit. In-flight records
    /// simply remain pending for recovery by a future consumer instance.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

/// Order queue consumer worker.
pub struct OrderConsumer {
    queue: Arc<dyn OrderQueue>,
    creator: Arc<OrderCreator>,
    config: ConsumerConfig,
}

impl OrderConsumer {
    /// Create a consumer; call [`OrderConsumer::start`] to run it.
    pub fn new(
        queue: Arc<dyn OrderQueue>,
        creator: Arc<OrderCreator>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            queue,
            creator,
            config,
        }
    }

    /// Ensure the consumer group exists, then spawn the worker loop.
    pub async fn start(self) -> SeckillResult<ConsumerHandle> {
        let ctx = RequestContext::background();
        self.queue.ensure_group(&ctx, &self.config.group).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        Ok(ConsumerHandle { shutdown_tx, task })
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let ctx = RequestContext::background();
        info!(
            "order consumer {} started in group {}",
            self.config.consumer, self.config.group
        );

        // A previous incarnation may have crashed between claim and ack.
        self.recover_pending(&ctx, &mut shutdown_rx).await;

        loop {
            if *shutdown_rx.borrow_and_update() {
                break;
            }

            let read = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                read = self.queue.read_new(
                    &ctx,
                    &self.config.group,
                    &self.config.consumer,
                    self.config.batch,
                    self.config.block,
                ) => read,
            };

            match read {
                Ok(entries) if entries.is_empty() => continue,
                Ok(entries) => {
                    for entry in &entries {
                        if !self.process_entry(&ctx, entry).await {
                            self.recover_pending(&ctx, &mut shutdown_rx).await;
                        }
                    }
                }
                Err(e) => {
                    warn!("order queue read failed: {}", e);
                    tokio::select! {
                        _ = shutdown_rx.changed() => {},
                        _ = tokio::time::sleep(self.config.read_retry) => {},
                    }
                }
            }
        }

        info!(
            "order consumer {} in group {} stopped",
            self.config.consumer, self.config.group
        );
    }

    /// Apply one entry through the idempotent creator.
    ///
    /// Returns `true` when the entry was resolved (acknowledged, or
    /// terminally discarded); `false` leaves it pending for recovery.
    async fn process_entry(&self, ctx: &RequestContext, entry: &QueueEntry) -> bool {
        let pending = match PendingOrder::from_entry(entry) {
            Ok(pending) => pending,
            Err(e) => {
                // A record that can never parse can never succeed; keeping
                // it pending would wedge recovery forever.
                error!("discarding malformed queue entry {}: {}", entry.id, e);
                return self.ack_entry(ctx, entry).await;
            }
        };

        match self.creator.create_order(ctx, &pending).await {
            Ok(()) => self.ack_entry(ctx, entry).await,
            Err(e @ SeckillError::InconsistentStock { .. }) => {
                // Terminal: retrying without stock could oversell. The
                // error log is the operator signal.
                error!("order {} not created: {}", pending.order_id, e);
                self.ack_entry(ctx, entry).await
            }
            Err(e) => {
                error!(
                    "failed to process order {} for user {}: {}",
                    pending.order_id, pending.user_id, e
                );
                false
            }
        }
    }

    async fn ack_entry(&self, ctx: &RequestContext, entry: &QueueEntry) -> bool {
        match self
            .queue
            .ack(ctx, &self.config.group, &entry.id)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("failed to ack entry {}: {}", entry.id, e);
                false
            }
        }
    }

    /// Drain this consumer's pending-entries list through the idempotent
    /// path, acknowledging as entries succeed. Runs until the list is
    /// empty or shutdown is signalled; entries that keep failing are
    /// retried with a small backoff.
    async fn recover_pending(&self, ctx: &RequestContext, shutdown_rx: &mut watch::Receiver<bool>) {
        loop {
            if *shutdown_rx.borrow_and_update() {
                return;
            }

            let entries = match self
                .queue
                .read_pending(ctx, &self.config.group, &self.config.consumer, self.config.batch)
                .await
            {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("pending-entries read failed: {}", e);
                    tokio::time::sleep(RECOVERY_BACKOFF).await;
                    continue;
                }
            };

            if entries.is_empty() {
                return;
            }

            let mut any_failed = false;
            for entry in &entries {
                if !self.process_entry(ctx, entry).await {
                    any_failed = true;
                }
            }
            if any_failed {
                tokio::time::sleep(RECOVERY_BACKOFF).await;
            }
        }
    }
}
