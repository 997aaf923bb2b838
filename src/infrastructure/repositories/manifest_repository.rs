//! Manifest Repository Implementation
//!
//! Every state change that touches shipments runs in one transaction with
//! the manifest row locked.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Manifest, ManifestFilter, ManifestRepository, ManifestStatus};
use crate::infrastructure::database::map_write_error;
use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

const SELECT_MANIFEST: &str = r#"
    SELECT m.id, m.company_id, m.courier_id, m.manifest_number, m.status, m.pickup_date,
           (SELECT COUNT(*) FROM shipments s WHERE s.manifest_id = m.id)::INT4 AS shipment_count,
           m.created_at, m.updated_at
    FROM manifests m
"#;

#[derive(Debug, sqlx::FromRow)]
struct ManifestRow {
    id: Uuid,
    company_id: Uuid,
    courier_id: Uuid,
    manifest_number: String,
    status: String,
    pickup_date: Option<NaiveDate>,
    shipment_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ManifestRow {
    fn into_manifest(self) -> Manifest {
        Manifest {
            id: self.id,
            company_id: self.company_id,
            courier_id: self.courier_id,
            manifest_number: self.manifest_number,
            status: ManifestStatus::from_str(&self.status),
            pickup_date: self.pickup_date,
            shipment_count: self.shipment_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Manifest columns needed to validate a state change.
#[derive(Debug, sqlx::FromRow)]
struct LockedManifest {
    company_id: Uuid,
    courier_id: Uuid,
    status: String,
}

/// PostgreSQL manifest repository implementation.
#[derive(Clone)]
pub struct PgManifestRepository {
    pool: PgPool,
}

impl PgManifestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the manifest row and check it is in one of `allowed`.
    async fn lock(
        tx: &mut Transaction<'_, Postgres>,
        manifest_id: Uuid,
        allowed: &[ManifestStatus],
    ) -> Result<LockedManifest, AppError> {
        let locked = sqlx::query_as::<_, LockedManifest>(
            "SELECT company_id, courier_id, status FROM manifests WHERE id = $1 FOR UPDATE",
        )
        .bind(manifest_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Manifest {} not found", manifest_id)))?;

        let status = ManifestStatus::from_str(&locked.status);
        if !allowed.contains(&status) {
            return Err(AppError::Conflict(format!("Manifest is {}", status)));
        }

        Ok(locked)
    }

    async fn set_status(
        tx: &mut Transaction<'_, Postgres>,
        manifest_id: Uuid,
        status: ManifestStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE manifests SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(manifest_id)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn reload(&self, manifest_id: Uuid) -> Result<Manifest, AppError> {
        self.find_by_id(manifest_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Manifest {} not found", manifest_id)))
    }
}

#[async_trait]
impl ManifestRepository for PgManifestRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Manifest>, AppError> {
        let row = sqlx::query_as::<_, ManifestRow>(&format!("{SELECT_MANIFEST} WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ManifestRow::into_manifest))
    }

    async fn number_exists(&self, number: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM manifests WHERE manifest_number = $1)",
        )
        .bind(number)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, manifest: &Manifest) -> Result<Manifest, AppError> {
        sqlx::query(
            r#"
            INSERT INTO manifests (id, company_id, courier_id, manifest_number, status, pickup_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(manifest.id)
        .bind(manifest.company_id)
        .bind(manifest.courier_id)
        .bind(&manifest.manifest_number)
        .bind(manifest.status.as_str())
        .bind(manifest.pickup_date)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Manifest number already exists"))?;

        self.reload(manifest.id).await
    }

    async fn list(
        &self,
        filter: &ManifestFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Manifest>, i64), AppError> {
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, ManifestRow>(&format!(
            r#"
            {SELECT_MANIFEST}
            WHERE ($1::UUID IS NULL OR m.company_id = $1)
              AND ($2::UUID IS NULL OR m.courier_id = $2)
              AND ($3::TEXT IS NULL OR m.status = $3)
            ORDER BY m.created_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(filter.company_id)
        .bind(filter.courier_id)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM manifests m
            WHERE ($1::UUID IS NULL OR m.company_id = $1)
              AND ($2::UUID IS NULL OR m.courier_id = $2)
              AND ($3::TEXT IS NULL OR m.status = $3)
            "#,
        )
        .bind(filter.company_id)
        .bind(filter.courier_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(ManifestRow::into_manifest).collect(), total))
    }

    async fn add_shipments(
        &self,
        manifest_id: Uuid,
        shipment_ids: &[Uuid],
    ) -> Result<Manifest, AppError> {
        let unique: Vec<Uuid> = shipment_ids
            .iter()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut tx = self.pool.begin().await?;
        let locked = Self::lock(&mut tx, manifest_id, &[ManifestStatus::Open]).await?;

        let attached = sqlx::query(
            r#"
            UPDATE shipments
            SET manifest_id = $1, updated_at = NOW()
            WHERE id = ANY($2)
              AND company_id = $3
              AND courier_id = $4
              AND status = 'awb_assigned'
              AND manifest_id IS NULL
            "#,
        )
        .bind(manifest_id)
        .bind(&unique)
        .bind(locked.company_id)
        .bind(locked.courier_id)
        .execute(&mut *tx)
        .await?;

        if attached.rows_affected() != unique.len() as u64 {
            // Dropping the transaction rolls back the partial attach.
            return Err(AppError::Conflict(
                "One or more shipments cannot be added to this manifest".to_string(),
            ));
        }

        sqlx::query("UPDATE manifests SET updated_at = NOW() WHERE id = $1")
            .bind(manifest_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        self.reload(manifest_id).await
    }

    async fn remove_shipment(
        &self,
        manifest_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<Manifest, AppError> {
        let mut tx = self.pool.begin().await?;
        Self::lock(&mut tx, manifest_id, &[ManifestStatus::Open]).await?;

        let result = sqlx::query(
            "UPDATE shipments SET manifest_id = NULL, updated_at = NOW() WHERE id = $1 AND manifest_id = $2",
        )
        .bind(shipment_id)
        .bind(manifest_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Shipment {} is not on manifest {}",
                shipment_id, manifest_id
            )));
        }

        tx.commit().await?;
        self.reload(manifest_id).await
    }

    async fn close(&self, manifest_id: Uuid, pickup_date: NaiveDate) -> Result<Manifest, AppError> {
        let mut tx = self.pool.begin().await?;
        Self::lock(&mut tx, manifest_id, &[ManifestStatus::Open]).await?;

        let moved = sqlx::query(
            r#"
            UPDATE shipments
            SET status = 'manifested', updated_at = NOW()
            WHERE manifest_id = $1 AND status = 'awb_assigned'
            "#,
        )
        .bind(manifest_id)
        .execute(&mut *tx)
        .await?;

        if moved.rows_affected() == 0 {
            return Err(AppError::Conflict("Cannot close an empty manifest".to_string()));
        }

        sqlx::query(
            "UPDATE manifests SET status = 'closed', pickup_date = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(manifest_id)
        .bind(pickup_date)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.reload(manifest_id).await
    }

    async fn mark_picked_up(&self, manifest_id: Uuid) -> Result<Manifest, AppError> {
        let mut tx = self.pool.begin().await?;
        Self::lock(&mut tx, manifest_id, &[ManifestStatus::Closed]).await?;

        sqlx::query(
            r#"
            UPDATE shipments
            SET status = 'picked_up', updated_at = NOW()
            WHERE manifest_id = $1 AND status = 'manifested'
            "#,
        )
        .bind(manifest_id)
        .execute(&mut *tx)
        .await?;

        Self::set_status(&mut tx, manifest_id, ManifestStatus::PickedUp).await?;

        tx.commit().await?;
        self.reload(manifest_id).await
    }

    async fn cancel(&self, manifest_id: Uuid) -> Result<Manifest, AppError> {
        let mut tx = self.pool.begin().await?;
        Self::lock(
            &mut tx,
            manifest_id,
            &[ManifestStatus::Open, ManifestStatus::Closed],
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE shipments
            SET status = 'awb_assigned', manifest_id = NULL, updated_at = NOW()
            WHERE manifest_id = $1 AND status IN ('awb_assigned', 'manifested')
            "#,
        )
        .bind(manifest_id)
        .execute(&mut *tx)
        .await?;

        Self::set_status(&mut tx, manifest_id, ManifestStatus::Cancelled).await?;

        tx.commit().await?;
        self.reload(manifest_id).await
    }
}
