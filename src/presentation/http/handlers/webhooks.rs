//! Storefront Webhook Handler
//!
//! Public endpoint; deliveries authenticate with their HMAC signature.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::application::dto::response::WebhookAck;
use crate::application::services::woocommerce::{
    PgWebhookService, WebhookHeaders, WebhookOutcome, WebhookService, WebhookServiceImpl,
};
use crate::infrastructure::repositories::PgWooStoreRepository;
use crate::shared::error::AppError;
use crate::startup::AppState;

const TOPIC_HEADER: &str = "x-wc-webhook-topic";
const SIGNATURE_HEADER: &str = "x-wc-webhook-signature";
const DELIVERY_HEADER: &str = "x-wc-webhook-delivery-id";

fn service(state: &AppState) -> PgWebhookService {
    WebhookServiceImpl::new(
        Arc::new(PgWooStoreRepository::new(state.db.clone())),
        state.queue.clone(),
        state.settings.webhooks.clone(),
    )
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn receive_webhook(
    State(state): State<AppState>,
    Path(store_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookAck>), AppError> {
    let delivery = WebhookHeaders {
        topic: header(&headers, TOPIC_HEADER),
        signature: header(&headers, SIGNATURE_HEADER),
        delivery_id: header(&headers, DELIVERY_HEADER),
    };

    let ack = match service(&state).ingest(store_id, delivery, &body).await? {
        WebhookOutcome::Ping => (StatusCode::OK, WebhookAck::new("ok")),
        WebhookOutcome::Duplicate => (StatusCode::OK, WebhookAck::new("duplicate")),
        WebhookOutcome::Ignored(_) => (StatusCode::ACCEPTED, WebhookAck::new("ignored")),
        WebhookOutcome::Queued(job_id) => (StatusCode::ACCEPTED, WebhookAck::queued(job_id)),
    };
    Ok((ack.0, Json(ack.1)))
}
