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

//! Configuration support for the seckill pipeline.
//!
//! ## Environment Variables
//!
//! ### Backend Selection
//! - `PLEXDEALS_BACKEND`: backend type (default: "memory")
//!   - "memory" | "in-memory" → in-process gate/queue/locks/idgen
//!   - "redis" → Redis-backed components sharing one connection manager
//!
//! ### Redis Configuration
//! - `PLEXDEALS_REDIS_URL`: server URL (default: "redis://localhost:6379")
//!
//! ### Queue/Consumer Configuration
//! - `PLEXDEALS_ORDER_STREAM`: order stream key (default: "stream.orders")
//! - `PLEXDEALS_CONSUMER_GROUP`: consumer group name (default: "g1")
//! - `PLEXDEALS_CONSUMER_NAME`: per-instance consumer name (default: "c1")
//! - `PLEXDEALS_BLOCK_MS`: long-poll duration in milliseconds (default: 2000)

use crate::{
    ConsumerConfig, OrderConsumer, OrderCreator, OrderRepository, SeckillError, SeckillResult,
    SeckillService, StockGate,
};
use plexdeals_idgen::IdGenerator;
use plexdeals_locks::LockManager;
use plexdeals_queue::OrderQueue;
use std::sync::Arc;
use std::time::Duration;

/// Backend type configuration.
#[derive(Clone, Debug)]
pub enum BackendType {
    /// In-process components (default, always available).
    Memory,
    /// Redis-backed components (requires the `redis-backend` feature).
    Redis {
        /// Redis server URL.
        url: String,
    },
}

/// Seckill pipeline configuration.
#[derive(Clone, Debug)]
pub struct SeckillConfig {
    /// Backend type.
    pub backend: BackendType,
    /// Order stream key.
    pub stream_key: String,
    /// Consumer identity and read tuning.
    pub consumer: ConsumerConfig,
}

impl Default for SeckillConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::Memory,
            stream_key: "stream.orders".to_string(),
            consumer: ConsumerConfig::default(),
        }
    }
}

impl SeckillConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> SeckillResult<Self> {
        let backend_str = std::env::var("PLEXDEALS_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase();

        let backend = match backend_str.as_str() {
            "memory" | "in-memory" => BackendType::Memory,
            "redis" => {
                let url = std::env::var("PLEXDEALS_REDIS_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379".to_string());
                BackendType::Redis { url }
            }
            other => {
                return Err(SeckillError::Backend(format!(
                    "unknown PLEXDEALS_BACKEND: {}",
                    other
                )))
            }
        };

        let stream_key = std::env::var("PLEXDEALS_ORDER_STREAM")
            .unwrap_or_else(|_| "stream.orders".to_string());
        let block_ms = std::env::var("PLEXDEALS_BLOCK_MS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(2_000u64);

        let consumer = ConsumerConfig {
            group: std::env::var("PLEXDEALS_CONSUMER_GROUP").unwrap_or_else(|_| "g1".to_string()),
            consumer: std::env::var("PLEXDEALS_CONSUMER_NAME")
                .unwrap_or_else(|_| "c1".to_string()),
            block: Duration::from_millis(block_ms),
            ..ConsumerConfig::default()
        };

        Ok(Self {
            backend,
            stream_key,
            consumer,
        })
    }
}

/// Fully wired pipeline components.
///
/// The repository defaults to the in-memory implementation; production
/// deployments pass their relational-layer adapter to
/// [`create_pipeline_with_repository`].
pub struct SeckillPipeline {
    /// Durable storage boundary.
    pub repository: Arc<dyn OrderRepository>,
    /// Order queue shared by gate and consumer.
    pub queue: Arc<dyn OrderQueue>,
    /// Lock manager shared by creator (and cache rebuilds, if any).
    pub locks: Arc<dyn LockManager>,
    /// ID generator.
    pub ids: Arc<dyn IdGenerator>,
    /// Atomic stock gate.
    pub gate: Arc<dyn StockGate>,
    /// Admission service.
    pub service: SeckillService,
    /// Idempotent creator shared with consumers.
    pub creator: Arc<OrderCreator>,
    consumer_config: ConsumerConfig,
}

impl SeckillPipeline {
    /// Build a consumer worker for this pipeline.
    pub fn consumer(&self) -> OrderConsumer {
        OrderConsumer::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.creator),
            self.consumer_config.clone(),
        )
    }
}

/// Create a pipeline with the in-memory repository.
pub async fn create_pipeline_from_config(config: &SeckillConfig) -> SeckillResult<SeckillPipeline> {
    #[cfg(feature = "memory-backend")]
    {
        create_pipeline_with_repository(config, Arc::new(crate::MemoryOrderRepository::new()))
            .await
    }
    #[cfg(not(feature = "memory-backend"))]
    {
        Err(SeckillError::Backend(
            "no default repository available; enable the memory-backend feature or use create_pipeline_with_repository"
                .to_string(),
        ))
    }
}

/// Create a pipeline around a caller-supplied repository.
pub async fn create_pipeline_with_repository(
    config: &SeckillConfig,
    repository: Arc<dyn OrderRepository>,
) -> SeckillResult<SeckillPipeline> {
    match &config.backend {
        BackendType::Memory => {
            #[cfg(feature = "memory-backend")]
            {
                let queue: Arc<dyn OrderQueue> = Arc::new(plexdeals_queue::MemoryOrderQueue::new());
                let locks: Arc<dyn LockManager> =
                    Arc::new(plexdeals_locks::MemoryLockManager::new());
                let ids: Arc<dyn IdGenerator> =
                    Arc::new(plexdeals_idgen::MemoryIdGenerator::new());
                let gate: Arc<dyn StockGate> =
                    Arc::new(crate::MemoryStockGate::new(Arc::clone(&queue)));
                Ok(assemble(config, repository, queue, locks, ids, gate))
            }
            #[cfg(not(feature = "memory-backend"))]
            {
                Err(SeckillError::Backend(
                    "memory backend not enabled; enable the memory-backend feature".to_string(),
                ))
            }
        }
        BackendType::Redis { url } => {
            #[cfg(feature = "redis-backend")]
            {
                let client = redis::Client::open(url.as_str()).map_err(|e| {
                    SeckillError::Backend(format!("failed to create redis client: {}", e))
                })?;
                let manager = redis::aio::ConnectionManager::new(client)
                    .await
                    .map_err(|e| {
                        SeckillError::Backend(format!("failed to connect redis: {}", e))
                    })?;

                let queue: Arc<dyn OrderQueue> = Arc::new(
                    plexdeals_queue::RedisOrderQueue::with_manager(
                        manager.clone(),
                        &config.stream_key,
                    ),
                );
                let locks: Arc<dyn LockManager> = Arc::new(
                    plexdeals_locks::RedisLockManager::with_manager(manager.clone()),
                );
                let ids: Arc<dyn IdGenerator> =
                    Arc::new(plexdeals_idgen::RedisIdGenerator::with_manager(
                        manager.clone(),
                    ));
                let gate: Arc<dyn StockGate> = Arc::new(crate::RedisStockGate::with_manager(
                    manager,
                    &config.stream_key,
                ));
                Ok(assemble(config, repository, queue, locks, ids, gate))
            }
            #[cfg(not(feature = "redis-backend"))]
            {
                let _ = url;
                Err(SeckillError::Backend(
                    "Redis backend not enabled; enable the redis-backend feature".to_string(),
                ))
            }
        }
    }
}

fn assemble(
    config: &SeckillConfig,
    repository: Arc<dyn OrderRepository>,
    queue: Arc<dyn OrderQueue>,
    locks: Arc<dyn LockManager>,
    ids: Arc<dyn IdGenerator>,
    gate: Arc<dyn StockGate>,
) -> SeckillPipeline {
    let creator = Arc::new(OrderCreator::new(
        Arc::clone(&repository),
        Arc::clone(&locks),
    ));
    let service = SeckillService::new(
        Arc::clone(&repository),
        Arc::clone(&gate),
        Arc::clone(&ids),
    );
    SeckillPipeline {
        repository,
        queue,
        locks,
        ids,
        gate,
        service,
        creator,
        consumer_config: config.consumer.clone(),
    }
}

#[cfg(all(test, feature = "memory-backend"))]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SeckillConfig::default();
        assert!(matches!(config.backend, BackendType::Memory));
        assert_eq!(config.stream_key, "stream.orders");
        assert_eq!(config.consumer.group, "g1");
    }

    #[tokio::test]
    async fn test_create_memory_pipeline() {
        let pipeline = create_pipeline_from_config(&SeckillConfig::default())
            .await
            .unwrap();
        // Wired components share the same queue: the gate enqueues what the
        // consumer will read.
        let _consumer = pipeline.consumer();
    }
}
