//! WooCommerce store connection and product mapping entities.
//!
//! Maps to the `woocommerce_stores` and `woocommerce_product_mappings`
//! tables in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

pub const WEBHOOK_SECRET_LEN: usize = 32;

/// A connected WooCommerce storefront.
///
/// Maps to the `woocommerce_stores` table:
/// - id: UUID PRIMARY KEY
/// - company_id: UUID NOT NULL REFERENCES companies(id)
/// - name: TEXT NOT NULL
/// - store_url: TEXT NOT NULL (no trailing slash)
/// - consumer_key, consumer_secret: TEXT NOT NULL
/// - webhook_secret: TEXT NOT NULL
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - last_synced_at: TIMESTAMPTZ NULL
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Unique (company_id, store_url) among active rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WooCommerceStore {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub store_url: String,
    #[serde(skip_serializing)]
    pub consumer_key: String,
    #[serde(skip_serializing)]
    pub consumer_secret: String,
    #[serde(skip_serializing)]
    pub webhook_secret: String,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WooCommerceStore {
    /// Random alphanumeric secret used to sign webhook deliveries.
    pub fn generate_webhook_secret() -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(WEBHOOK_SECRET_LEN)
            .map(char::from)
            .collect()
    }

    /// Consumer key with all but the last four characters hidden.
    pub fn masked_consumer_key(&self) -> String {
        let chars: Vec<char> = self.consumer_key.chars().collect();
        let visible = chars.len().min(4);
        let hidden = chars.len() - visible;
        let tail: String = chars[hidden..].iter().collect();
        format!("{}{}", "*".repeat(hidden), tail)
    }

    /// REST API root for this store.
    pub fn api_base(&self) -> String {
        format!("{}/wp-json/wc/v3", self.store_url)
    }
}

/// Shipping attributes for a storefront product or variation.
///
/// Maps to the `woocommerce_product_mappings` table:
/// - id: UUID PRIMARY KEY
/// - store_id: UUID NOT NULL REFERENCES woocommerce_stores(id)
/// - woo_product_id: BIGINT NOT NULL
/// - woo_variation_id: BIGINT NOT NULL DEFAULT 0 (0 = simple product)
/// - sku: TEXT NULL
/// - name: TEXT NOT NULL
/// - weight_grams, length_cm, breadth_cm, height_cm: INTEGER NULL
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
///
/// Unique (store_id, woo_product_id, woo_variation_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WooCommerceProductMapping {
    pub id: Uuid,
    pub store_id: Uuid,
    pub woo_product_id: i64,
    pub woo_variation_id: i64,
    pub sku: Option<String>,
    pub name: String,
    pub weight_grams: Option<i32>,
    pub length_cm: Option<i32>,
    pub breadth_cm: Option<i32>,
    pub height_cm: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

/// Repository trait for WooCommerce store data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WooStoreRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WooCommerceStore>, AppError>;

    /// Whether the company already has an active connection to this URL.
    async fn active_url_exists(&self, company_id: Uuid, store_url: &str) -> Result<bool, AppError>;

    async fn create(&self, store: &WooCommerceStore) -> Result<WooCommerceStore, AppError>;

    async fn list_by_company(&self, company_id: Uuid) -> Result<Vec<WooCommerceStore>, AppError>;

    async fn deactivate(&self, id: Uuid) -> Result<(), AppError>;

    async fn set_last_synced_at(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
}

/// Repository trait for product mapping data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductMappingRepository: Send + Sync {
    /// Mappings for a set of product ids (variations included).
    async fn find_for_products(
        &self,
        store_id: Uuid,
        product_ids: &[i64],
    ) -> Result<Vec<WooCommerceProductMapping>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WooCommerceProductMapping>, AppError>;

    async fn list_by_store(&self, store_id: Uuid) -> Result<Vec<WooCommerceProductMapping>, AppError>;

    /// Insert or update on (store_id, woo_product_id, woo_variation_id).
    ///
    /// Manually entered dimensions are kept when the incoming row has none.
    async fn upsert(
        &self,
        mapping: &WooCommerceProductMapping,
    ) -> Result<WooCommerceProductMapping, AppError>;

    async fn update_dimensions(
        &self,
        mapping: &WooCommerceProductMapping,
    ) -> Result<WooCommerceProductMapping, AppError>;

    /// Remove a product and all its variations; returns rows deleted.
    async fn delete_product(&self, store_id: Uuid, woo_product_id: i64) -> Result<u64, AppError>;
}
