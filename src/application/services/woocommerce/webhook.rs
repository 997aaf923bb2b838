//! Webhook ingestion.
//!
//! Deliveries are authenticated, de-duplicated and queued; the actual work
//! happens in the background worker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::WebhookSettings;
use crate::domain::WooStoreRepository;
use crate::infrastructure::queue::JobQueue;
use crate::infrastructure::repositories::PgWooStoreRepository;
use crate::shared::error::AppError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookTopic {
    #[serde(rename = "order.created")]
    OrderCreated,
    #[serde(rename = "order.updated")]
    OrderUpdated,
    #[serde(rename = "order.deleted")]
    OrderDeleted,
    #[serde(rename = "order.restored")]
    OrderRestored,
    #[serde(rename = "product.created")]
    ProductCreated,
    #[serde(rename = "product.updated")]
    ProductUpdated,
    #[serde(rename = "product.deleted")]
    ProductDeleted,
}

impl WebhookTopic {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "order.created" => Some(Self::OrderCreated),
            "order.updated" => Some(Self::OrderUpdated),
            "order.deleted" => Some(Self::OrderDeleted),
            "order.restored" => Some(Self::OrderRestored),
            "product.created" => Some(Self::ProductCreated),
            "product.updated" => Some(Self::ProductUpdated),
            "product.deleted" => Some(Self::ProductDeleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderCreated => "order.created",
            Self::OrderUpdated => "order.updated",
            Self::OrderDeleted => "order.deleted",
            Self::OrderRestored => "order.restored",
            Self::ProductCreated => "product.created",
            Self::ProductUpdated => "product.updated",
            Self::ProductDeleted => "product.deleted",
        }
    }
}

impl std::fmt::Display for WebhookTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookJob {
    pub id: Uuid,
    pub store_id: Uuid,
    pub topic: WebhookTopic,
    pub delivery_id: Option<String>,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
    /// Reason of the most recent failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// The `X-WC-Webhook-*` headers of a delivery.
#[derive(Debug, Clone, Default)]
pub struct WebhookHeaders {
    pub topic: Option<String>,
    pub signature: Option<String>,
    pub delivery_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Ping,
    Ignored(String),
    Duplicate,
    Queued(Uuid),
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Store not found")]
    StoreNotFound,

    #[error("Missing webhook signature")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Webhook body is not valid JSON: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::StoreNotFound => AppError::NotFound(err.to_string()),
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                AppError::Unauthorized(err.to_string())
            }
            WebhookError::InvalidPayload(_) => AppError::BadRequest(err.to_string()),
            WebhookError::Repository(e) => e,
        }
    }
}

/// Check a base64 HMAC-SHA256 signature of `body`.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Base64 HMAC-SHA256 signature of `body`, as the storefront sends it.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Storefront pings are form-encoded and carry no topic.
fn is_ping(headers: &WebhookHeaders, body: &[u8]) -> bool {
    headers.topic.as_deref().map_or(true, |t| t.trim().is_empty())
        && body.starts_with(b"webhook_id=")
}

fn dedup_key(store_id: Uuid, delivery_id: &str) -> String {
    format!("woo:delivery:{}:{}", store_id, delivery_id)
}

/// Webhook ingestion service trait.
#[async_trait]
pub trait WebhookService: Send + Sync {
    async fn ingest(
        &self,
        store_id: Uuid,
        headers: WebhookHeaders,
        body: &[u8],
    ) -> Result<WebhookOutcome, WebhookError>;
}

/// Webhook ingestion implementation.
pub struct WebhookServiceImpl<W: WooStoreRepository> {
    store_repo: Arc<W>,
    queue: Arc<dyn JobQueue>,
    settings: WebhookSettings,
}

impl<W: WooStoreRepository> WebhookServiceImpl<W> {
    pub fn new(store_repo: Arc<W>, queue: Arc<dyn JobQueue>, settings: WebhookSettings) -> Self {
        Self {
            store_repo,
            queue,
            settings,
        }
    }
}

#[async_trait]
impl<W: WooStoreRepository + 'static> WebhookService for WebhookServiceImpl<W> {
    #[tracing::instrument(skip(self, headers, body), fields(topic = ?headers.topic))]
    async fn ingest(
        &self,
        store_id: Uuid,
        headers: WebhookHeaders,
        body: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        let store = self
            .store_repo
            .find_by_id(store_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or(WebhookError::StoreNotFound)?;

        if is_ping(&headers, body) {
            tracing::info!(store_id = %store_id, "Webhook ping received");
            return Ok(WebhookOutcome::Ping);
        }

        let signature = headers
            .signature
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(WebhookError::MissingSignature)?;
        if !verify_signature(&store.webhook_secret, body, signature) {
            tracing::warn!(store_id = %store_id, "Webhook signature mismatch");
            return Err(WebhookError::InvalidSignature);
        }

        let raw_topic = headers.topic.as_deref().unwrap_or_default();
        let Some(topic) = WebhookTopic::parse(raw_topic) else {
            tracing::debug!(store_id = %store_id, topic = raw_topic, "Webhook topic ignored");
            return Ok(WebhookOutcome::Ignored(raw_topic.to_string()));
        };

        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

        let delivery_id = headers
            .delivery_id
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(delivery) = &delivery_id {
            let ttl = Duration::from_secs(self.settings.dedup_ttl_secs);
            if !self.queue.mark_once(&dedup_key(store_id, delivery), ttl).await? {
                tracing::info!(store_id = %store_id, delivery_id = %delivery, "Duplicate webhook delivery");
                return Ok(WebhookOutcome::Duplicate);
            }
        }

        let job = WebhookJob {
            id: Uuid::now_v7(),
            store_id,
            topic,
            delivery_id,
            payload,
            attempts: 0,
            enqueued_at: Utc::now(),
            last_error: None,
        };
        let encoded =
            serde_json::to_string(&job).map_err(|e| AppError::Internal(e.to_string()))?;
        self.queue.push(&self.settings.queue_name, encoded).await?;

        tracing::info!(
            store_id = %store_id,
            job_id = %job.id,
            topic = %topic,
            "Webhook job queued"
        );
        Ok(WebhookOutcome::Queued(job.id))
    }
}

/// Concrete implementation using PostgreSQL repositories.
pub type PgWebhookService = WebhookServiceImpl<PgWooStoreRepository>;
