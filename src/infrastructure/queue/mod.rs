//! Job Queue Module
//!
//! Background job transport used by webhook ingestion.
//!
//! Two implementations of [`JobQueue`]:
//! - [`RedisJobQueue`]: Redis lists (LPUSH / RPOP) plus `SET NX EX` for
//!   delivery de-duplication. Shared across processes.
//! - [`InMemoryJobQueue`]: process-local queue for tests and single-node
//!   runs without Redis.

mod memory_queue;
mod redis_queue;

use std::time::Duration;

use async_trait::async_trait;

use crate::shared::error::AppError;

pub use memory_queue::InMemoryJobQueue;
pub use redis_queue::{create_redis_client, RedisJobQueue};

/// FIFO queues of serialized jobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a job to the tail of `queue`.
    async fn push(&self, queue: &str, payload: String) -> Result<(), AppError>;

    /// Take the job at the head of `queue`, waiting up to `timeout`.
    async fn pop(&self, queue: &str, timeout: Duration) -> Result<Option<String>, AppError>;

    /// Record `key` for `ttl`; false if it was already recorded.
    async fn mark_once(&self, key: &str, ttl: Duration) -> Result<bool, AppError>;

    async fn len(&self, queue: &str) -> Result<u64, AppError>;

    /// Backend reachability check for readiness probes.
    async fn ping(&self) -> Result<(), AppError>;

    /// Name of the backend for health output.
    fn backend(&self) -> &'static str;
}
