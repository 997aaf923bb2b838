//! Shipment Repository Implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{PaymentMode, Shipment, ShipmentFilter, ShipmentRepository, ShipmentStatus};
use crate::infrastructure::database::map_write_error;
use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

const SHIPMENT_COLUMNS: &str =
    "id, company_id, order_id, courier_id, awb, status, payment_mode, cod_amount, weight_grams, \
     length_cm, breadth_cm, height_cm, freight_charge, cod_charge, manifest_id, created_at, \
     updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ShipmentRow {
    id: Uuid,
    company_id: Uuid,
    order_id: Uuid,
    courier_id: Uuid,
    awb: Option<String>,
    status: String,
    payment_mode: String,
    cod_amount: i64,
    weight_grams: i32,
    length_cm: Option<i32>,
    breadth_cm: Option<i32>,
    height_cm: Option<i32>,
    freight_charge: i64,
    cod_charge: i64,
    manifest_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ShipmentRow {
    fn into_shipment(self) -> Shipment {
        Shipment {
            id: self.id,
            company_id: self.company_id,
            order_id: self.order_id,
            courier_id: self.courier_id,
            awb: self.awb,
            status: ShipmentStatus::from_str(&self.status),
            payment_mode: PaymentMode::from_str(&self.payment_mode),
            cod_amount: self.cod_amount,
            weight_grams: self.weight_grams,
            length_cm: self.length_cm,
            breadth_cm: self.breadth_cm,
            height_cm: self.height_cm,
            freight_charge: self.freight_charge,
            cod_charge: self.cod_charge,
            manifest_id: self.manifest_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL shipment repository implementation.
#[derive(Clone)]
pub struct PgShipmentRepository {
    pool: PgPool,
}

impl PgShipmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShipmentRepository for PgShipmentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Shipment>, AppError> {
        let row = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ShipmentRow::into_shipment))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Shipment>, AppError> {
        let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ShipmentRow::into_shipment).collect())
    }

    async fn has_live_shipment(&self, order_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM shipments WHERE order_id = $1 AND status <> 'cancelled')",
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_live_by_order(&self, order_id: Uuid) -> Result<Vec<Shipment>, AppError> {
        let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE order_id = $1 AND status <> 'cancelled'"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ShipmentRow::into_shipment).collect())
    }

    async fn awb_exists(&self, awb: &str) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM shipments WHERE awb = $1)")
                .bind(awb)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn create(&self, shipment: &Shipment) -> Result<Shipment, AppError> {
        let row = sqlx::query_as::<_, ShipmentRow>(&format!(
            r#"
            INSERT INTO shipments (id, company_id, order_id, courier_id, awb, status, payment_mode,
                                   cod_amount, weight_grams, length_cm, breadth_cm, height_cm,
                                   freight_charge, cod_charge)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {SHIPMENT_COLUMNS}
            "#
        ))
        .bind(shipment.id)
        .bind(shipment.company_id)
        .bind(shipment.order_id)
        .bind(shipment.courier_id)
        .bind(&shipment.awb)
        .bind(shipment.status.as_str())
        .bind(shipment.payment_mode.as_str())
        .bind(shipment.cod_amount)
        .bind(shipment.weight_grams)
        .bind(shipment.length_cm)
        .bind(shipment.breadth_cm)
        .bind(shipment.height_cm)
        .bind(shipment.freight_charge)
        .bind(shipment.cod_charge)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Order already has a live shipment or AWB is taken"))?;

        Ok(row.into_shipment())
    }

    async fn list(
        &self,
        filter: &ShipmentFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Shipment>, i64), AppError> {
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
            r#"
            SELECT {SHIPMENT_COLUMNS}
            FROM shipments
            WHERE ($1::UUID IS NULL OR company_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::UUID IS NULL OR courier_id = $3)
              AND ($4::UUID IS NULL OR order_id = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(filter.company_id)
        .bind(status)
        .bind(filter.courier_id)
        .bind(filter.order_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM shipments
            WHERE ($1::UUID IS NULL OR company_id = $1)
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::UUID IS NULL OR courier_id = $3)
              AND ($4::UUID IS NULL OR order_id = $4)
            "#,
        )
        .bind(filter.company_id)
        .bind(status)
        .bind(filter.courier_id)
        .bind(filter.order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(ShipmentRow::into_shipment).collect(), total))
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: ShipmentStatus,
        next: ShipmentStatus,
    ) -> Result<bool, AppError> {
        // Cancelled shipments leave their manifest.
        let result = sqlx::query(
            r#"
            UPDATE shipments
            SET status = $3,
                manifest_id = CASE WHEN $3 = 'cancelled' THEN NULL ELSE manifest_id END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_manifest(&self, manifest_id: Uuid) -> Result<Vec<Shipment>, AppError> {
        let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE manifest_id = $1 ORDER BY created_at"
        ))
        .bind(manifest_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ShipmentRow::into_shipment).collect())
    }
}
