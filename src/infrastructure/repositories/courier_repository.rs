//! Courier Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Courier, CourierRepository};
use crate::infrastructure::database::map_write_error;
use crate::shared::error::AppError;

const COLUMNS: &str = "id, name, code, awb_prefix, supports_cod, max_weight_grams, \
                       serviceable_prefixes, base_rate, additional_rate, cod_charge_percent, \
                       cod_min_charge, volumetric_divisor, is_active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct CourierRow {
    id: Uuid,
    name: String,
    code: String,
    awb_prefix: String,
    supports_cod: bool,
    max_weight_grams: i32,
    serviceable_prefixes: Vec<String>,
    base_rate: i64,
    additional_rate: i64,
    cod_charge_percent: i32,
    cod_min_charge: i64,
    volumetric_divisor: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CourierRow {
    fn into_courier(self) -> Courier {
        Courier {
            id: self.id,
            name: self.name,
            code: self.code,
            awb_prefix: self.awb_prefix,
            supports_cod: self.supports_cod,
            max_weight_grams: self.max_weight_grams,
            serviceable_prefixes: self.serviceable_prefixes,
            base_rate: self.base_rate,
            additional_rate: self.additional_rate,
            cod_charge_percent: self.cod_charge_percent,
            cod_min_charge: self.cod_min_charge,
            volumetric_divisor: self.volumetric_divisor,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL courier repository implementation.
#[derive(Clone)]
pub struct PgCourierRepository {
    pool: PgPool,
}

impl PgCourierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CourierRepository for PgCourierRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Courier>, AppError> {
        let row = sqlx::query_as::<_, CourierRow>(&format!(
            "SELECT {COLUMNS} FROM couriers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CourierRow::into_courier))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM couriers WHERE code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Courier>, AppError> {
        let rows = sqlx::query_as::<_, CourierRow>(&format!(
            "SELECT {COLUMNS} FROM couriers WHERE (NOT $1 OR is_active) ORDER BY name"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CourierRow::into_courier).collect())
    }

    async fn create(&self, courier: &Courier) -> Result<Courier, AppError> {
        let row = sqlx::query_as::<_, CourierRow>(&format!(
            r#"
            INSERT INTO couriers (id, name, code, awb_prefix, supports_cod, max_weight_grams,
                                  serviceable_prefixes, base_rate, additional_rate,
                                  cod_charge_percent, cod_min_charge, volumetric_divisor, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(courier.id)
        .bind(&courier.name)
        .bind(&courier.code)
        .bind(&courier.awb_prefix)
        .bind(courier.supports_cod)
        .bind(courier.max_weight_grams)
        .bind(&courier.serviceable_prefixes)
        .bind(courier.base_rate)
        .bind(courier.additional_rate)
        .bind(courier.cod_charge_percent)
        .bind(courier.cod_min_charge)
        .bind(courier.volumetric_divisor)
        .bind(courier.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Courier code already exists"))?;

        Ok(row.into_courier())
    }

    async fn update(&self, courier: &Courier) -> Result<Courier, AppError> {
        let row = sqlx::query_as::<_, CourierRow>(&format!(
            r#"
            UPDATE couriers
            SET name = $2,
                awb_prefix = $3,
                supports_cod = $4,
                max_weight_grams = $5,
                serviceable_prefixes = $6,
                base_rate = $7,
                additional_rate = $8,
                cod_charge_percent = $9,
                cod_min_charge = $10,
                volumetric_divisor = $11,
                is_active = $12,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(courier.id)
        .bind(&courier.name)
        .bind(&courier.awb_prefix)
        .bind(courier.supports_cod)
        .bind(courier.max_weight_grams)
        .bind(&courier.serviceable_prefixes)
        .bind(courier.base_rate)
        .bind(courier.additional_rate)
        .bind(courier.cod_charge_percent)
        .bind(courier.cod_min_charge)
        .bind(courier.volumetric_divisor)
        .bind(courier.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Courier {} not found", courier.id)))?;

        Ok(row.into_courier())
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE couriers SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Courier {} not found", id)));
        }

        Ok(())
    }
}
