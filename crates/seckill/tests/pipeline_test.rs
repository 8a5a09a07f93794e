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

//! End-to-end pipeline tests over the in-memory backends.

#![cfg(feature = "memory-backend")]

use chrono::Utc;
use plexdeals_common::RequestContext;
use plexdeals_queue::OrderQueue;
use plexdeals_seckill::{
    create_pipeline_with_repository, MemoryOrderRepository, OrderRepository, SeckillConfig,
    SeckillError, SeckillPipeline, StockGate, Voucher,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

fn test_config() -> SeckillConfig {
    let mut config = SeckillConfig::default();
    config.consumer.block = Duration::from_millis(100);
    config.consumer.read_retry = Duration::from_millis(50);
    config
}

async fn pipeline() -> (SeckillPipeline, Arc<MemoryOrderRepository>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let repository = Arc::new(MemoryOrderRepository::new());
    let pipeline = create_pipeline_with_repository(&test_config(), repository.clone())
        .await
        .unwrap();
    (pipeline, repository)
}

fn open_voucher(id: u64, stock: i64) -> Voucher {
    Voucher {
        id,
        stock,
        begin_at: Utc::now() - chrono::Duration::hours(1),
        end_at: Utc::now() + chrono::Duration::hours(1),
    }
}

/// Poll until `condition` yields true or the deadline passes.
async fn wait_until<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_n_units_admit_exactly_n_of_m_users() {
    let (pipeline, _repository) = pipeline().await;
    let admin = RequestContext::background();
    pipeline
        .service
        .publish_voucher(&admin, open_voucher(1, 10))
        .await
        .unwrap();

    let service = Arc::new(pipeline.service);
    let mut handles = Vec::new();
    for user_id in 1..=50u64 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let ctx = RequestContext::for_user(user_id);
            service.seckill(&ctx, 1).await
        }));
    }

    let mut admitted = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_order_id) => admitted += 1,
            Err(SeckillError::OutOfStock) => out_of_stock += 1,
            Err(other) => panic!("unexpected admission error: {}", other),
        }
    }

    assert_eq!(admitted, 10);
    assert_eq!(out_of_stock, 40);
    assert_eq!(
        pipeline.gate.get_fast_stock(&admin, 1).await.unwrap(),
        Some(0)
    );
    assert_eq!(pipeline.queue.len(&admin).await.unwrap(), 10);
}

#[tokio::test]
async fn test_second_admission_for_same_user_rejected() {
    let (pipeline, _repository) = pipeline().await;
    let admin = RequestContext::background();
    pipeline
        .service
        .publish_voucher(&admin, open_voucher(1, 10))
        .await
        .unwrap();

    let ctx = RequestContext::for_user(42);
    let first = pipeline.service.seckill(&ctx, 1).await;
    assert!(first.is_ok());

    let second = pipeline.service.seckill(&ctx, 1).await;
    assert!(matches!(second, Err(SeckillError::DuplicateOrder)));
    // The rejected retry must not burn a unit.
    assert_eq!(
        pipeline.gate.get_fast_stock(&admin, 1).await.unwrap(),
        Some(9)
    );
}

#[tokio::test]
async fn test_window_guards_run_before_the_gate() {
    let (pipeline, _repository) = pipeline().await;
    let admin = RequestContext::background();
    let ctx = RequestContext::for_user(42);

    assert!(matches!(
        pipeline.service.seckill(&ctx, 404).await,
        Err(SeckillError::VoucherNotFound(404))
    ));

    let mut not_open = open_voucher(2, 5);
    not_open.begin_at = Utc::now() + chrono::Duration::hours(1);
    not_open.end_at = Utc::now() + chrono::Duration::hours(2);
    pipeline
        .service
        .publish_voucher(&admin, not_open)
        .await
        .unwrap();
    assert!(matches!(
        pipeline.service.seckill(&ctx, 2).await,
        Err(SeckillError::NotYetOpen)
    ));

    let mut closed = open_voucher(3, 5);
    closed.begin_at = Utc::now() - chrono::Duration::hours(2);
    closed.end_at = Utc::now() - chrono::Duration::hours(1);
    pipeline
        .service
        .publish_voucher(&admin, closed)
        .await
        .unwrap();
    assert!(matches!(
        pipeline.service.seckill(&ctx, 3).await,
        Err(SeckillError::AlreadyClosed)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_unit_end_to_end() {
    let (pipeline, repository) = pipeline().await;
    let admin = RequestContext::background();
    pipeline
        .service
        .publish_voucher(&admin, open_voucher(1, 1))
        .await
        .unwrap();

    let service = Arc::new(pipeline.service);
    let u1 = {
        let service = service.clone();
        tokio::spawn(async move {
            let ctx = RequestContext::for_user(1);
            service.seckill(&ctx, 1).await
        })
    };
    let u2 = {
        let service = service.clone();
        tokio::spawn(async move {
            let ctx = RequestContext::for_user(2);
            service.seckill(&ctx, 1).await
        })
    };

    let results = vec![u1.await.unwrap(), u2.await.unwrap()];
    let winners: Vec<u64> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
    assert_eq!(winners.len(), 1, "exactly one of two users wins one unit");
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(SeckillError::OutOfStock))));

    // Materialize the durable order.
    let consumer = plexdeals_seckill::OrderConsumer::new(
        Arc::clone(&pipeline.queue),
        Arc::clone(&pipeline.creator),
        test_config().consumer,
    );
    let handle = consumer.start().await.unwrap();

    let repo = repository.clone();
    wait_until("the order row to appear", move || {
        let repo = repo.clone();
        async move { repo.orders_for_voucher(1).await.len() == 1 }
    })
    .await;
    handle.stop().await;

    let orders = repository.orders_for_voucher(1).await;
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, winners[0]);
    assert_eq!(repository.get_stock(&admin, 1).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_crashed_consumer_claims_recovered_on_restart() {
    let (pipeline, repository) = pipeline().await;
    let admin = RequestContext::background();
    pipeline
        .service
        .publish_voucher(&admin, open_voucher(1, 3))
        .await
        .unwrap();

    for user_id in 1..=3u64 {
        let ctx = RequestContext::for_user(user_id);
        pipeline.service.seckill(&ctx, 1).await.unwrap();
    }

    // Simulate a consumer that claimed everything and crashed before
    // acknowledging anything.
    let config = test_config();
    pipeline
        .queue
        .ensure_group(&admin, &config.consumer.group)
        .await
        .unwrap();
    let claimed = pipeline
        .queue
        .read_new(
            &admin,
            &config.consumer.group,
            &config.consumer.consumer,
            10,
            Duration::from_millis(100),
        )
        .await
        .unwrap();
    assert_eq!(claimed.len(), 3);
    assert!(repository.orders_for_voucher(1).await.is_empty());

    // A fresh consumer instance with the same identity replays the
    // pending entries on startup.
    let handle = pipeline.consumer().start().await.unwrap();
    let repo = repository.clone();
    wait_until("all recovered orders to appear", move || {
        let repo = repo.clone();
        async move { repo.orders_for_voucher(1).await.len() == 3 }
    })
    .await;
    handle.stop().await;

    let pending = pipeline
        .queue
        .read_pending(
            &admin,
            &config.consumer.group,
            &config.consumer.consumer,
            10,
        )
        .await
        .unwrap();
    assert!(pending.is_empty(), "recovered entries are acknowledged");
    assert_eq!(repository.get_stock(&admin, 1).await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_reprocessing_existing_order_is_a_no_op() {
    let (pipeline, repository) = pipeline().await;
    let admin = RequestContext::background();
    pipeline
        .service
        .publish_voucher(&admin, open_voucher(1, 5))
        .await
        .unwrap();

    let ctx = RequestContext::for_user(7);
    pipeline.service.seckill(&ctx, 1).await.unwrap();

    // Crash between durable creation and ack: the order exists but the
    // queue entry is still pending.
    let config = test_config();
    pipeline
        .queue
        .ensure_group(&admin, &config.consumer.group)
        .await
        .unwrap();
    let claimed = pipeline
        .queue
        .read_new(
            &admin,
            &config.consumer.group,
            &config.consumer.consumer,
            1,
            Duration::from_millis(100),
        )
        .await
        .unwrap();
    assert_eq!(claimed.len(), 1);
    let pending_order = plexdeals_seckill::PendingOrder::from_entry(&claimed[0]).unwrap();
    pipeline.creator.create_order(&admin, &pending_order).await.unwrap();
    assert_eq!(repository.orders_for_voucher(1).await.len(), 1);
    assert_eq!(repository.get_stock(&admin, 1).await.unwrap(), Some(4));

    // Recovery redelivers; the creator detects the existing order.
    let handle = pipeline.consumer().start().await.unwrap();
    let queue = Arc::clone(&pipeline.queue);
    let group = config.consumer.group.clone();
    let consumer_name = config.consumer.consumer.clone();
    wait_until("the pending entry to be acknowledged", move || {
        let queue = queue.clone();
        let group = group.clone();
        let consumer_name = consumer_name.clone();
        async move {
            let ctx = RequestContext::background();
            queue
                .read_pending(&ctx, &group, &consumer_name, 10)
                .await
                .map(|entries| entries.is_empty())
                .unwrap_or(false)
        }
    })
    .await;
    handle.stop().await;

    // No duplicate order, no double decrement.
    assert_eq!(repository.orders_for_voucher(1).await.len(), 1);
    assert_eq!(repository.get_stock(&admin, 1).await.unwrap(), Some(4));
}

#[tokio::test]
async fn test_fast_durable_disagreement_is_terminal_and_logged() {
    let (pipeline, repository) = pipeline().await;
    let admin = RequestContext::background();

    // Durable stock empty, fast counter seeded anyway: the gate admits and
    // the creator must refuse rather than oversell.
    repository
        .put_voucher(&admin, open_voucher(1, 0))
        .await
        .unwrap();
    pipeline.gate.seed_stock(&admin, 1, 1).await.unwrap();

    let ctx = RequestContext::for_user(9);
    let order_id = pipeline.service.seckill(&ctx, 1).await.unwrap();
    assert!(order_id > 0);

    let handle = pipeline.consumer().start().await.unwrap();
    let config = test_config();
    let queue = Arc::clone(&pipeline.queue);
    let group = config.consumer.group.clone();
    let consumer_name = config.consumer.consumer.clone();
    wait_until("the poisoned entry to be resolved", move || {
        let queue = queue.clone();
        let group = group.clone();
        let consumer_name = consumer_name.clone();
        async move {
            let ctx = RequestContext::background();
            queue
                .read_pending(&ctx, &group, &consumer_name, 10)
                .await
                .map(|entries| entries.is_empty())
                .unwrap_or(false)
        }
    })
    .await;
    handle.stop().await;

    // The order was not created and will not be retried.
    assert!(repository.orders_for_voucher(1).await.is_empty());
}
