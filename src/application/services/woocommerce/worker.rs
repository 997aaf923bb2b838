//! Background processing of queued webhook jobs.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::sync::{OrderSyncService, SyncError};
use super::webhook::{WebhookJob, WebhookTopic};
use crate::config::WebhookSettings;
use crate::infrastructure::metrics;
use crate::infrastructure::queue::JobQueue;
use crate::infrastructure::woocommerce::{WooDeleted, WooOrder, WooProduct};
use crate::shared::error::AppError;

const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// What happened to a popped job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobDisposition {
    Processed,
    Retried,
    DeadLettered,
}

impl JobDisposition {
    fn as_str(&self) -> &'static str {
        match self {
            JobDisposition::Processed => "processed",
            JobDisposition::Retried => "retried",
            JobDisposition::DeadLettered => "dead_letter",
        }
    }
}

#[derive(Debug)]
enum JobFailure {
    Retryable(String),
    Fatal(String),
}

impl From<SyncError> for JobFailure {
    fn from(err: SyncError) -> Self {
        if err.is_retryable() {
            JobFailure::Retryable(err.to_string())
        } else {
            JobFailure::Fatal(err.to_string())
        }
    }
}

fn decode<T: DeserializeOwned>(job: &WebhookJob) -> Result<T, JobFailure> {
    serde_json::from_value(job.payload.clone())
        .map_err(|e| JobFailure::Fatal(format!("payload decode failed: {}", e)))
}

/// Consumes the webhook queue.
pub struct WebhookWorker {
    sync: Arc<dyn OrderSyncService>,
    queue: Arc<dyn JobQueue>,
    settings: WebhookSettings,
}

impl WebhookWorker {
    pub fn new(
        sync: Arc<dyn OrderSyncService>,
        queue: Arc<dyn JobQueue>,
        settings: WebhookSettings,
    ) -> Self {
        Self {
            sync,
            queue,
            settings,
        }
    }

    /// Start the configured number of workers.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.settings.workers.max(1))
            .map(|worker| {
                let this = self.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move { this.run(worker, shutdown).await })
            })
            .collect()
    }

    /// Pop and handle jobs until `shutdown` flips to true.
    ///
    /// Shutdown is observed between pops, so it takes at most one poll
    /// timeout plus the job in flight.
    pub async fn run(&self, worker: usize, mut shutdown: watch::Receiver<bool>) {
        let poll = Duration::from_secs(self.settings.poll_timeout_secs.max(1));
        tracing::info!(worker, queue = %self.settings.queue_name, "Webhook worker started");

        while !*shutdown.borrow() {
            match self.queue.pop(&self.settings.queue_name, poll).await {
                Ok(Some(raw)) => {
                    self.handle(&raw).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(worker, error = %e, "Queue pop failed");
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(QUEUE_ERROR_BACKOFF) => {}
                    }
                    continue;
                }
            }
            if let Ok(depth) = self.queue.len(&self.settings.queue_name).await {
                metrics::set_queue_depth(&self.settings.queue_name, depth);
            }
        }

        tracing::info!(worker, "Webhook worker stopped");
    }

    /// Process one raw job, re-queueing or dead-lettering it on failure.
    pub async fn handle(&self, raw: &str) -> JobDisposition {
        let mut job: WebhookJob = match serde_json::from_str(raw) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(error = %e, "Undecodable webhook job");
                self.dead_letter(raw.to_string()).await;
                metrics::record_webhook_job("unknown", JobDisposition::DeadLettered.as_str());
                return JobDisposition::DeadLettered;
            }
        };

        let disposition = match self.process(&job).await {
            Ok(()) => JobDisposition::Processed,
            Err(failure) => {
                job.attempts += 1;
                let (retryable, reason) = match failure {
                    JobFailure::Retryable(reason) => (true, reason),
                    JobFailure::Fatal(reason) => (false, reason),
                };
                job.last_error = Some(reason.clone());

                if retryable && job.attempts < self.settings.max_attempts {
                    tracing::warn!(
                        job_id = %job.id,
                        topic = %job.topic,
                        attempts = job.attempts,
                        error = %reason,
                        "Webhook job failed, re-queueing"
                    );
                    self.requeue(&job).await;
                    JobDisposition::Retried
                } else {
                    tracing::error!(
                        job_id = %job.id,
                        store_id = %job.store_id,
                        topic = %job.topic,
                        attempts = job.attempts,
                        error = %reason,
                        "Webhook job dead-lettered"
                    );
                    match serde_json::to_string(&job) {
                        Ok(encoded) => self.dead_letter(encoded).await,
                        Err(_) => self.dead_letter(raw.to_string()).await,
                    }
                    JobDisposition::DeadLettered
                }
            }
        };

        metrics::record_webhook_job(job.topic.as_str(), disposition.as_str());
        disposition
    }

    async fn process(&self, job: &WebhookJob) -> Result<(), JobFailure> {
        let store = self
            .sync
            .active_store(job.store_id)
            .await?
            .ok_or_else(|| JobFailure::Fatal("store not found or disconnected".into()))?;

        match job.topic {
            WebhookTopic::OrderCreated | WebhookTopic::OrderUpdated | WebhookTopic::OrderRestored => {
                let order: WooOrder = decode(job)?;
                self.sync.upsert_external_order(&store, &order).await?;
            }
            WebhookTopic::OrderDeleted => {
                let deleted: WooDeleted = decode(job)?;
                self.sync.cancel_external_order(&store, deleted.id).await?;
            }
            WebhookTopic::ProductCreated | WebhookTopic::ProductUpdated => {
                let product: WooProduct = decode(job)?;
                self.sync.apply_product(&store, &product).await?;
            }
            WebhookTopic::ProductDeleted => {
                let deleted: WooDeleted = decode(job)?;
                self.sync.remove_product(&store, deleted.id).await?;
            }
        }

        tracing::debug!(job_id = %job.id, topic = %job.topic, "Webhook job processed");
        Ok(())
    }

    async fn requeue(&self, job: &WebhookJob) {
        let result = match serde_json::to_string(job) {
            Ok(encoded) => self.queue.push(&self.settings.queue_name, encoded).await,
            Err(e) => Err(AppError::Internal(e.to_string())),
        };
        if let Err(e) = result {
            tracing::error!(job_id = %job.id, error = %e, "Failed to re-queue webhook job");
        }
    }

    async fn dead_letter(&self, payload: String) {
        if let Err(e) = self
            .queue
            .push(&self.settings.dead_letter_queue, payload)
            .await
        {
            tracing::error!(error = %e, "Failed to push to dead-letter queue");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::woocommerce::sync::MockOrderSyncService;
    use crate::domain::{UpsertOutcome, WooCommerceStore};
    use crate::infrastructure::queue::InMemoryJobQueue;
    use crate::infrastructure::woocommerce::WooClientError;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    const JOBS: &str = "woo:jobs";
    const DEAD: &str = "woo:dead";

    fn settings() -> WebhookSettings {
        WebhookSettings {
            queue_name: JOBS.into(),
            dead_letter_queue: DEAD.into(),
            dedup_ttl_secs: 60,
            max_attempts: 2,
            poll_timeout_secs: 1,
            workers: 1,
        }
    }

    fn store() -> WooCommerceStore {
        let now = Utc::now();
        WooCommerceStore {
            id: Uuid::now_v7(),
            company_id: Uuid::now_v7(),
            name: "Chai Co".into(),
            store_url: "https://chai.example".into(),
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            webhook_secret: "s".into(),
            is_active: true,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn job(topic: WebhookTopic, payload: serde_json::Value) -> String {
        serde_json::to_string(&WebhookJob {
            id: Uuid::now_v7(),
            store_id: Uuid::now_v7(),
            topic,
            delivery_id: Some("d-1".into()),
            payload,
            attempts: 0,
            enqueued_at: Utc::now(),
            last_error: None,
        })
        .unwrap()
    }

    fn with_store(sync: &mut MockOrderSyncService) {
        sync.expect_active_store().returning(|_| Ok(Some(store())));
    }

    fn worker(sync: MockOrderSyncService) -> (WebhookWorker, Arc<InMemoryJobQueue>) {
        let queue = Arc::new(InMemoryJobQueue::new());
        (
            WebhookWorker::new(Arc::new(sync), queue.clone(), settings()),
            queue,
        )
    }

    async fn pop(queue: &InMemoryJobQueue, name: &str) -> Option<WebhookJob> {
        queue
            .pop(name, Duration::from_millis(10))
            .await
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[tokio::test]
    async fn order_job_runs_shared_upsert() {
        let mut sync = MockOrderSyncService::new();
        with_store(&mut sync);
        sync.expect_upsert_external_order()
            .withf(|_, order| order.id == 101 && order.status == "processing")
            .times(1)
            .returning(|_, _| Ok(UpsertOutcome::Created));
        let (worker, queue) = worker(sync);

        let disposition = worker
            .handle(&job(
                WebhookTopic::OrderCreated,
                json!({"id": 101, "status": "processing"}),
            ))
            .await;

        assert_eq!(disposition, JobDisposition::Processed);
        assert_eq!(queue.len(JOBS).await.unwrap(), 0);
        assert_eq!(queue.len(DEAD).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deleted_order_is_cancelled() {
        let mut sync = MockOrderSyncService::new();
        with_store(&mut sync);
        sync.expect_cancel_external_order()
            .withf(|_, id| *id == 77)
            .times(1)
            .returning(|_, _| Ok(true));
        let (worker, _) = worker(sync);

        let disposition = worker
            .handle(&job(WebhookTopic::OrderDeleted, json!({"id": 77})))
            .await;
        assert_eq!(disposition, JobDisposition::Processed);
    }

    #[tokio::test]
    async fn product_topics_touch_mappings() {
        let mut sync = MockOrderSyncService::new();
        with_store(&mut sync);
        sync.expect_apply_product()
            .withf(|_, p| p.id == 9 && p.weight == "0.25")
            .times(1)
            .returning(|_, _| Ok(()));
        sync.expect_remove_product()
            .withf(|_, id| *id == 9)
            .times(1)
            .returning(|_, _| Ok(()));
        let (worker, _) = worker(sync);

        assert_eq!(
            worker
                .handle(&job(
                    WebhookTopic::ProductUpdated,
                    json!({"id": 9, "weight": "0.25"})
                ))
                .await,
            JobDisposition::Processed
        );
        assert_eq!(
            worker
                .handle(&job(WebhookTopic::ProductDeleted, json!({"id": 9})))
                .await,
            JobDisposition::Processed
        );
    }

    #[tokio::test]
    async fn transient_failure_retries_then_dead_letters() {
        let mut sync = MockOrderSyncService::new();
        with_store(&mut sync);
        sync.expect_upsert_external_order()
            .times(2)
            .returning(|_, _| Err(SyncError::Client(WooClientError::RateLimited)));
        let (worker, queue) = worker(sync);

        let first = worker
            .handle(&job(WebhookTopic::OrderUpdated, json!({"id": 5})))
            .await;
        assert_eq!(first, JobDisposition::Retried);

        let requeued = pop(&queue, JOBS).await.unwrap();
        assert_eq!(requeued.attempts, 1);
        assert!(requeued.last_error.is_some());

        let second = worker
            .handle(&serde_json::to_string(&requeued).unwrap())
            .await;
        assert_eq!(second, JobDisposition::DeadLettered);

        let dead = pop(&queue, DEAD).await.unwrap();
        assert_eq!(dead.id, requeued.id);
        assert_eq!(dead.attempts, 2);
        assert_eq!(queue.len(JOBS).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn undecodable_payload_goes_straight_to_dead_letter() {
        let mut sync = MockOrderSyncService::new();
        with_store(&mut sync);
        sync.expect_cancel_external_order().never();
        let (worker, queue) = worker(sync);

        let disposition = worker
            .handle(&job(WebhookTopic::OrderDeleted, json!({"name": "no id"})))
            .await;

        assert_eq!(disposition, JobDisposition::DeadLettered);
        assert_eq!(queue.len(JOBS).await.unwrap(), 0);
        let dead = pop(&queue, DEAD).await.unwrap();
        assert_eq!(dead.attempts, 1);
    }

    #[tokio::test]
    async fn garbage_job_is_dead_lettered_verbatim() {
        let (worker, queue) = worker(MockOrderSyncService::new());

        assert_eq!(worker.handle("not json").await, JobDisposition::DeadLettered);
        let raw = queue
            .pop(DEAD, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(raw.as_deref(), Some("not json"));
    }

    #[tokio::test]
    async fn workers_drain_queue_and_stop_on_shutdown() {
        let mut sync = MockOrderSyncService::new();
        with_store(&mut sync);
        sync.expect_upsert_external_order()
            .times(1)
            .returning(|_, _| Ok(UpsertOutcome::Updated));
        let (worker, queue) = worker(sync);
        queue
            .push(JOBS, job(WebhookTopic::OrderUpdated, json!({"id": 3})))
            .await
            .unwrap();

        let (tx, rx) = watch::channel(false);
        let handles = Arc::new(worker).spawn(rx);

        for _ in 0..50 {
            if queue.len(JOBS).await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        // Let the popped job finish before stopping.
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(3), handle)
                .await
                .expect("worker did not stop")
                .unwrap();
        }
        assert_eq!(queue.len(JOBS).await.unwrap(), 0);
    }
}
