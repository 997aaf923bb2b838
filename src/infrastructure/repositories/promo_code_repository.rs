//! Promo Code Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{DiscountType, PromoCode, PromoCodeFilter, PromoCodeRepository};
use crate::infrastructure::database::map_write_error;
use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

const COLUMNS: &str = "id, code, description, discount_type, discount_value, max_discount, \
                       min_order_value, usage_limit, used_count, company_id, valid_from, \
                       valid_until, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct PromoCodeRow {
    id: Uuid,
    code: String,
    description: Option<String>,
    discount_type: String,
    discount_value: i64,
    max_discount: Option<i64>,
    min_order_value: i64,
    usage_limit: Option<i32>,
    used_count: i32,
    company_id: Option<Uuid>,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PromoCodeRow {
    fn into_promo_code(self) -> PromoCode {
        PromoCode {
            id: self.id,
            code: self.code,
            description: self.description,
            discount_type: DiscountType::from_str(&self.discount_type),
            discount_value: self.discount_value,
            max_discount: self.max_discount,
            min_order_value: self.min_order_value,
            usage_limit: self.usage_limit,
            used_count: self.used_count,
            company_id: self.company_id,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL promo code repository implementation.
#[derive(Clone)]
pub struct PgPromoCodeRepository {
    pool: PgPool,
}

impl PgPromoCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromoCodeRepository for PgPromoCodeRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PromoCode>, AppError> {
        let row = sqlx::query_as::<_, PromoCodeRow>(&format!(
            "SELECT {COLUMNS} FROM promo_codes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PromoCodeRow::into_promo_code))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, AppError> {
        let row = sqlx::query_as::<_, PromoCodeRow>(&format!(
            "SELECT {COLUMNS} FROM promo_codes WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PromoCodeRow::into_promo_code))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM promo_codes WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn create(&self, promo: &PromoCode) -> Result<PromoCode, AppError> {
        let row = sqlx::query_as::<_, PromoCodeRow>(&format!(
            r#"
            INSERT INTO promo_codes (id, code, description, discount_type, discount_value,
                                     max_discount, min_order_value, usage_limit, company_id,
                                     valid_from, valid_until, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(promo.id)
        .bind(&promo.code)
        .bind(&promo.description)
        .bind(promo.discount_type.as_str())
        .bind(promo.discount_value)
        .bind(promo.max_discount)
        .bind(promo.min_order_value)
        .bind(promo.usage_limit)
        .bind(promo.company_id)
        .bind(promo.valid_from)
        .bind(promo.valid_until)
        .bind(promo.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Coupon code already exists"))?;

        Ok(row.into_promo_code())
    }

    async fn update(&self, promo: &PromoCode) -> Result<PromoCode, AppError> {
        let row = sqlx::query_as::<_, PromoCodeRow>(&format!(
            r#"
            UPDATE promo_codes
            SET description = $2,
                discount_type = $3,
                discount_value = $4,
                max_discount = $5,
                min_order_value = $6,
                usage_limit = $7,
                valid_from = $8,
                valid_until = $9,
                is_active = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(promo.id)
        .bind(&promo.description)
        .bind(promo.discount_type.as_str())
        .bind(promo.discount_value)
        .bind(promo.max_discount)
        .bind(promo.min_order_value)
        .bind(promo.usage_limit)
        .bind(promo.valid_from)
        .bind(promo.valid_until)
        .bind(promo.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Coupon {} not found", promo.id)))?;

        Ok(row.into_promo_code())
    }

    async fn list(
        &self,
        filter: &PromoCodeFilter,
        pagination: Pagination,
    ) -> Result<(Vec<PromoCode>, i64), AppError> {
        // A company sees its own codes plus global ones.
        let rows = sqlx::query_as::<_, PromoCodeRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM promo_codes
            WHERE ($1::UUID IS NULL OR company_id IS NULL OR company_id = $1)
              AND (NOT $2 OR is_active)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.company_id)
        .bind(filter.active_only)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM promo_codes
            WHERE ($1::UUID IS NULL OR company_id IS NULL OR company_id = $1)
              AND (NOT $2 OR is_active)
            "#,
        )
        .bind(filter.company_id)
        .bind(filter.active_only)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(PromoCodeRow::into_promo_code).collect(), total))
    }

    async fn try_increment_usage(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE promo_codes
            SET used_count = used_count + 1, updated_at = NOW()
            WHERE id = $1
              AND is_active
              AND (usage_limit IS NULL OR used_count < usage_limit)
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
