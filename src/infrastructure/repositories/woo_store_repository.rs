//! WooCommerce Store and Product Mapping Repository Implementations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    ProductMappingRepository, WooCommerceProductMapping, WooCommerceStore, WooStoreRepository,
};
use crate::infrastructure::database::map_write_error;
use crate::shared::error::AppError;

const STORE_COLUMNS: &str = "id, company_id, name, store_url, consumer_key, consumer_secret, \
                             webhook_secret, is_active, last_synced_at, created_at, updated_at";

const MAPPING_COLUMNS: &str = "id, store_id, woo_product_id, woo_variation_id, sku, name, \
                               weight_grams, length_cm, breadth_cm, height_cm, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    store_url: String,
    consumer_key: String,
    consumer_secret: String,
    webhook_secret: String,
    is_active: bool,
    last_synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoreRow {
    fn into_store(self) -> WooCommerceStore {
        WooCommerceStore {
            id: self.id,
            company_id: self.company_id,
            name: self.name,
            store_url: self.store_url,
            consumer_key: self.consumer_key,
            consumer_secret: self.consumer_secret,
            webhook_secret: self.webhook_secret,
            is_active: self.is_active,
            last_synced_at: self.last_synced_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MappingRow {
    id: Uuid,
    store_id: Uuid,
    woo_product_id: i64,
    woo_variation_id: i64,
    sku: Option<String>,
    name: String,
    weight_grams: Option<i32>,
    length_cm: Option<i32>,
    breadth_cm: Option<i32>,
    height_cm: Option<i32>,
    updated_at: DateTime<Utc>,
}

impl MappingRow {
    fn into_mapping(self) -> WooCommerceProductMapping {
        WooCommerceProductMapping {
            id: self.id,
            store_id: self.store_id,
            woo_product_id: self.woo_product_id,
            woo_variation_id: self.woo_variation_id,
            sku: self.sku,
            name: self.name,
            weight_grams: self.weight_grams,
            length_cm: self.length_cm,
            breadth_cm: self.breadth_cm,
            height_cm: self.height_cm,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL WooCommerce store repository implementation.
#[derive(Clone)]
pub struct PgWooStoreRepository {
    pool: PgPool,
}

impl PgWooStoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WooStoreRepository for PgWooStoreRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WooCommerceStore>, AppError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM woocommerce_stores WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoreRow::into_store))
    }

    async fn active_url_exists(&self, company_id: Uuid, store_url: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM woocommerce_stores
                WHERE company_id = $1 AND store_url = $2 AND is_active
            )
            "#,
        )
        .bind(company_id)
        .bind(store_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, store: &WooCommerceStore) -> Result<WooCommerceStore, AppError> {
        let row = sqlx::query_as::<_, StoreRow>(&format!(
            r#"
            INSERT INTO woocommerce_stores (id, company_id, name, store_url, consumer_key,
                                            consumer_secret, webhook_secret, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {STORE_COLUMNS}
            "#
        ))
        .bind(store.id)
        .bind(store.company_id)
        .bind(&store.name)
        .bind(&store.store_url)
        .bind(&store.consumer_key)
        .bind(&store.consumer_secret)
        .bind(&store.webhook_secret)
        .bind(store.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Store is already connected"))?;

        Ok(row.into_store())
    }

    async fn list_by_company(&self, company_id: Uuid) -> Result<Vec<WooCommerceStore>, AppError> {
        let rows = sqlx::query_as::<_, StoreRow>(&format!(
            "SELECT {STORE_COLUMNS} FROM woocommerce_stores WHERE company_id = $1 ORDER BY created_at DESC"
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoreRow::into_store).collect())
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE woocommerce_stores SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Store {} not found", id)));
        }

        Ok(())
    }

    async fn set_last_synced_at(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE woocommerce_stores SET last_synced_at = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// PostgreSQL product mapping repository implementation.
#[derive(Clone)]
pub struct PgProductMappingRepository {
    pool: PgPool,
}

impl PgProductMappingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductMappingRepository for PgProductMappingRepository {
    async fn find_for_products(
        &self,
        store_id: Uuid,
        product_ids: &[i64],
    ) -> Result<Vec<WooCommerceProductMapping>, AppError> {
        let rows = sqlx::query_as::<_, MappingRow>(&format!(
            r#"
            SELECT {MAPPING_COLUMNS}
            FROM woocommerce_product_mappings
            WHERE store_id = $1 AND woo_product_id = ANY($2)
            "#
        ))
        .bind(store_id)
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MappingRow::into_mapping).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WooCommerceProductMapping>, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(&format!(
            "SELECT {MAPPING_COLUMNS} FROM woocommerce_product_mappings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(MappingRow::into_mapping))
    }

    async fn list_by_store(&self, store_id: Uuid) -> Result<Vec<WooCommerceProductMapping>, AppError> {
        let rows = sqlx::query_as::<_, MappingRow>(&format!(
            r#"
            SELECT {MAPPING_COLUMNS}
            FROM woocommerce_product_mappings
            WHERE store_id = $1
            ORDER BY woo_product_id, woo_variation_id
            "#
        ))
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MappingRow::into_mapping).collect())
    }

    async fn upsert(
        &self,
        mapping: &WooCommerceProductMapping,
    ) -> Result<WooCommerceProductMapping, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(&format!(
            r#"
            INSERT INTO woocommerce_product_mappings (id, store_id, woo_product_id, woo_variation_id,
                                                      sku, name, weight_grams, length_cm,
                                                      breadth_cm, height_cm)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (store_id, woo_product_id, woo_variation_id) DO UPDATE
            SET sku = EXCLUDED.sku,
                name = EXCLUDED.name,
                weight_grams = COALESCE(EXCLUDED.weight_grams, woocommerce_product_mappings.weight_grams),
                length_cm = COALESCE(EXCLUDED.length_cm, woocommerce_product_mappings.length_cm),
                breadth_cm = COALESCE(EXCLUDED.breadth_cm, woocommerce_product_mappings.breadth_cm),
                height_cm = COALESCE(EXCLUDED.height_cm, woocommerce_product_mappings.height_cm),
                updated_at = NOW()
            RETURNING {MAPPING_COLUMNS}
            "#
        ))
        .bind(mapping.id)
        .bind(mapping.store_id)
        .bind(mapping.woo_product_id)
        .bind(mapping.woo_variation_id)
        .bind(&mapping.sku)
        .bind(&mapping.name)
        .bind(mapping.weight_grams)
        .bind(mapping.length_cm)
        .bind(mapping.breadth_cm)
        .bind(mapping.height_cm)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_mapping())
    }

    async fn update_dimensions(
        &self,
        mapping: &WooCommerceProductMapping,
    ) -> Result<WooCommerceProductMapping, AppError> {
        let row = sqlx::query_as::<_, MappingRow>(&format!(
            r#"
            UPDATE woocommerce_product_mappings
            SET weight_grams = $2, length_cm = $3, breadth_cm = $4, height_cm = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {MAPPING_COLUMNS}
            "#
        ))
        .bind(mapping.id)
        .bind(mapping.weight_grams)
        .bind(mapping.length_cm)
        .bind(mapping.breadth_cm)
        .bind(mapping.height_cm)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product mapping {} not found", mapping.id)))?;

        Ok(row.into_mapping())
    }

    async fn delete_product(&self, store_id: Uuid, woo_product_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM woocommerce_product_mappings WHERE store_id = $1 AND woo_product_id = $2",
        )
        .bind(store_id)
        .bind(woo_product_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
