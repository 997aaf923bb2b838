//! Response DTOs
//!
//! Data structures for API response bodies. Entities without secrets are
//! returned as-is; the types here cover views that reshape or redact them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::application::services::ManifestDetails;
use crate::domain::{
    Address, AppliedDiscount, Manifest, ManifestStatus, RejectReason, WooCommerceStore,
};
use crate::shared::error::FieldError;

/// Connected store without credentials
#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub store_url: String,
    pub consumer_key: String,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WooCommerceStore> for StoreResponse {
    fn from(store: WooCommerceStore) -> Self {
        Self {
            consumer_key: store.masked_consumer_key(),
            id: store.id,
            company_id: store.company_id,
            name: store.name,
            store_url: store.store_url,
            is_active: store.is_active,
            last_synced_at: store.last_synced_at,
            created_at: store.created_at,
            updated_at: store.updated_at,
        }
    }
}

/// Returned once, on connect: the only time the webhook secret is shown.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectStoreResponse {
    #[serde(flatten)]
    pub store: StoreResponse,
    pub webhook_secret: String,
    /// Path to configure as the storefront's webhook delivery URL.
    pub webhook_path: String,
}

impl From<WooCommerceStore> for ConnectStoreResponse {
    fn from(store: WooCommerceStore) -> Self {
        let webhook_secret = store.webhook_secret.clone();
        let webhook_path = format!("/api/v1/webhooks/woocommerce/{}", store.id);
        Self {
            store: store.into(),
            webhook_secret,
            webhook_path,
        }
    }
}

/// Coupon check result
#[derive(Debug, Clone, Serialize)]
pub struct CouponValidationResponse {
    pub valid: bool,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CouponValidationResponse {
    pub fn accepted(code: String, applied: AppliedDiscount) -> Self {
        Self {
            valid: true,
            code,
            discount: Some(applied.discount),
            final_amount: Some(applied.final_amount),
            reason: None,
            message: None,
        }
    }

    pub fn rejected(code: String, reason: RejectReason) -> Self {
        Self {
            valid: false,
            code,
            discount: None,
            final_amount: None,
            reason: Some(reason),
            message: Some(reason.message().to_string()),
        }
    }
}

/// Address check result
#[derive(Debug, Clone, Serialize)]
pub struct AddressValidationResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<Address>,
    pub errors: Vec<FieldError>,
}

impl AddressValidationResponse {
    /// Normalize then validate.
    pub fn check(address: Address) -> Self {
        let normalized = address.normalize();
        match normalized.validate() {
            Ok(()) => Self {
                valid: true,
                normalized: Some(normalized),
                errors: Vec::new(),
            },
            Err(errors) => Self {
                valid: false,
                normalized: None,
                errors,
            },
        }
    }
}

/// Manifest with its shipment ids
#[derive(Debug, Clone, Serialize)]
pub struct ManifestResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub courier_id: Uuid,
    pub manifest_number: String,
    pub status: ManifestStatus,
    pub pickup_date: Option<NaiveDate>,
    pub shipment_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipment_ids: Option<Vec<Uuid>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Manifest> for ManifestResponse {
    fn from(m: Manifest) -> Self {
        Self {
            id: m.id,
            company_id: m.company_id,
            courier_id: m.courier_id,
            manifest_number: m.manifest_number,
            status: m.status,
            pickup_date: m.pickup_date,
            shipment_count: m.shipment_count,
            shipment_ids: None,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<ManifestDetails> for ManifestResponse {
    fn from(details: ManifestDetails) -> Self {
        let mut response = Self::from(details.manifest);
        response.shipment_ids = Some(details.shipment_ids);
        response
    }
}

/// Webhook acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

impl WebhookAck {
    pub fn new(status: &'static str) -> Self {
        Self {
            status,
            job_id: None,
        }
    }

    pub fn queued(job_id: Uuid) -> Self {
        Self {
            status: "queued",
            job_id: Some(job_id),
        }
    }
}

/// Liveness / info response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// One dependency in the readiness report
#[derive(Debug, Clone, Serialize)]
pub struct DependencyHealth {
    pub status: &'static str,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub database: DependencyHealth,
    pub queue: DependencyHealth,
}

impl ReadinessResponse {
    pub fn is_ready(&self) -> bool {
        self.database.status == "up" && self.queue.status == "up"
    }
}
