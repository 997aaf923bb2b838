//! Redis-backed job queue.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument};

use super::JobQueue;
use crate::config::RedisSettings;
use crate::shared::error::AppError;

/// Interval between RPOP attempts while a queue is empty.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Creates a Redis connection manager with automatic reconnection.
#[instrument(skip(settings))]
pub async fn create_redis_client(
    settings: &RedisSettings,
) -> Result<ConnectionManager, redis::RedisError> {
    info!("Connecting to Redis...");
    let client = Client::open(settings.url.as_str())?;
    let manager = ConnectionManager::new(client).await?;
    info!("Redis connection established");
    Ok(manager)
}

/// Job queue over Redis lists.
///
/// Pops poll with RPOP rather than BRPOP: the connection manager is a
/// multiplexed connection and a blocking command would stall every other
/// caller sharing it.
#[derive(Clone)]
pub struct RedisJobQueue {
    conn: ConnectionManager,
}

impl RedisJobQueue {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    #[instrument(skip(self, payload), level = "debug")]
    async fn push(&self, queue: &str, payload: String) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(queue, payload).await?;
        debug!(queue, "Job pushed");
        Ok(())
    }

    async fn pop(&self, queue: &str, timeout: Duration) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();
        let deadline = Instant::now() + timeout;

        loop {
            let item: Option<String> = conn.rpop(queue, None).await?;
            if item.is_some() {
                return Ok(item);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn mark_once(&self, key: &str, ttl: Duration) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(set.is_some())
    }

    async fn len(&self, queue: &str) -> Result<u64, AppError> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(queue).await?;
        Ok(len)
    }

    async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
