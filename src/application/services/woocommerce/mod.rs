//! WooCommerce Integration Services
//!
//! - **status / mapper**: pure translation of storefront payloads
//! - **store_service**: store connection and product mappings
//! - **sync**: idempotent order ETL shared by pull sync and webhooks
//! - **webhook**: authenticated, de-duplicated delivery intake
//! - **worker**: background processing of queued deliveries

mod mapper;
mod status;
mod store_service;
mod sync;
mod webhook;
mod worker;

pub use mapper::{map_order, map_product, MapError, ProductLookup};
pub use status::{map_inbound_status, map_outbound_status};
pub use store_service::{
    normalize_store_url, PgStoreService, ProductSyncReport, StoreError, StoreService,
    StoreServiceImpl,
};
pub use sync::{
    OrderSyncService, OrderSyncServiceImpl, PgOrderSyncService, SyncError, SyncFailure, SyncMode,
    SyncReport,
};
pub use webhook::{
    sign, verify_signature, PgWebhookService, WebhookError, WebhookHeaders, WebhookJob,
    WebhookOutcome, WebhookService, WebhookServiceImpl, WebhookTopic,
};
pub use worker::{JobDisposition, WebhookWorker};
