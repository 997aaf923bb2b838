//! Manifest Service
//!
//! Batches shipments for a courier pickup and drives the batch lifecycle.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::application::dto::request::CreateManifestRequest;
use crate::domain::{
    CourierRepository, Manifest, ManifestFilter, ManifestRepository, ManifestStatus,
    ShipmentRepository, ShipmentStatus,
};
use crate::infrastructure::repositories::{
    PgCourierRepository, PgManifestRepository, PgShipmentRepository,
};
use crate::shared::error::{AppError, FieldError};
use crate::shared::pagination::{Paginated, Pagination};

/// Maximum attempts to generate an unused manifest number.
const MAX_NUMBER_ATTEMPTS: usize = 5;

/// A manifest with the shipments on it.
#[derive(Debug, Clone)]
pub struct ManifestDetails {
    pub manifest: Manifest,
    pub shipment_ids: Vec<Uuid>,
}

/// Manifest service trait.
#[async_trait]
pub trait ManifestService: Send + Sync {
    async fn create(
        &self,
        scope: Option<Uuid>,
        request: CreateManifestRequest,
    ) -> Result<Manifest, ManifestError>;

    async fn get(&self, id: Uuid, scope: Option<Uuid>) -> Result<ManifestDetails, ManifestError>;

    async fn list(
        &self,
        filter: ManifestFilter,
        pagination: Pagination,
    ) -> Result<Paginated<Manifest>, ManifestError>;

    async fn add_shipments(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        shipment_ids: Vec<Uuid>,
    ) -> Result<Manifest, ManifestError>;

    async fn remove_shipment(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        shipment_id: Uuid,
    ) -> Result<Manifest, ManifestError>;

    /// Close for pickup; `pickup_date` defaults to today.
    async fn close(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        pickup_date: Option<NaiveDate>,
    ) -> Result<Manifest, ManifestError>;

    async fn mark_picked_up(&self, id: Uuid, scope: Option<Uuid>)
        -> Result<Manifest, ManifestError>;

    async fn cancel(&self, id: Uuid, scope: Option<Uuid>) -> Result<Manifest, ManifestError>;
}

/// Manifest service errors.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Manifest not found")]
    NotFound,

    #[error("Courier not found")]
    CourierNotFound,

    #[error("Manifest is {0}")]
    WrongState(ManifestStatus),

    #[error("Manifest has no shipments")]
    Empty,

    #[error("Shipment {id} cannot be manifested: {reason}")]
    Ineligible { id: Uuid, reason: &'static str },

    #[error("Shipment is not on this manifest")]
    NotOnManifest,

    #[error("Could not allocate a unique manifest number")]
    NumberExhausted,

    #[error("Invalid manifest")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<ManifestError> for AppError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound | ManifestError::CourierNotFound => {
                AppError::NotFound(err.to_string())
            }
            ManifestError::WrongState(_)
            | ManifestError::Ineligible { .. }
            | ManifestError::NotOnManifest => AppError::Conflict(err.to_string()),
            ManifestError::Empty => AppError::Unprocessable(err.to_string()),
            ManifestError::NumberExhausted => AppError::Internal(err.to_string()),
            ManifestError::Invalid(errors) => AppError::from_field_errors(errors),
            ManifestError::Repository(e) => e,
        }
    }
}

/// Manifest service implementation.
pub struct ManifestServiceImpl<M, S, C>
where
    M: ManifestRepository,
    S: ShipmentRepository,
    C: CourierRepository,
{
    manifest_repo: Arc<M>,
    shipment_repo: Arc<S>,
    courier_repo: Arc<C>,
}

impl<M, S, C> ManifestServiceImpl<M, S, C>
where
    M: ManifestRepository,
    S: ShipmentRepository,
    C: CourierRepository,
{
    pub fn new(manifest_repo: Arc<M>, shipment_repo: Arc<S>, courier_repo: Arc<C>) -> Self {
        Self {
            manifest_repo,
            shipment_repo,
            courier_repo,
        }
    }

    async fn load(&self, id: Uuid, scope: Option<Uuid>) -> Result<Manifest, ManifestError> {
        self.manifest_repo
            .find_by_id(id)
            .await?
            .filter(|m| scope.map_or(true, |company| m.company_id == company))
            .ok_or(ManifestError::NotFound)
    }

    async fn load_in(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        allowed: &[ManifestStatus],
    ) -> Result<Manifest, ManifestError> {
        let manifest = self.load(id, scope).await?;
        if !allowed.contains(&manifest.status) {
            return Err(ManifestError::WrongState(manifest.status));
        }
        Ok(manifest)
    }

    async fn unused_number(&self, date: NaiveDate) -> Result<String, ManifestError> {
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let number = Manifest::generate_number(date);
            if !self.manifest_repo.number_exists(&number).await? {
                return Ok(number);
            }
        }
        Err(ManifestError::NumberExhausted)
    }
}

#[async_trait]
impl<M, S, C> ManifestService for ManifestServiceImpl<M, S, C>
where
    M: ManifestRepository + 'static,
    S: ShipmentRepository + 'static,
    C: CourierRepository + 'static,
{
    async fn create(
        &self,
        scope: Option<Uuid>,
        request: CreateManifestRequest,
    ) -> Result<Manifest, ManifestError> {
        let company_id = scope.or(request.company_id).ok_or_else(|| {
            ManifestError::Invalid(vec![FieldError::new("company_id", "is required")])
        })?;

        let courier = self
            .courier_repo
            .find_by_id(request.courier_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or(ManifestError::CourierNotFound)?;

        let now = Utc::now();
        let manifest = Manifest {
            id: Uuid::now_v7(),
            company_id,
            courier_id: courier.id,
            manifest_number: self.unused_number(now.date_naive()).await?,
            status: ManifestStatus::Open,
            pickup_date: None,
            shipment_count: 0,
            created_at: now,
            updated_at: now,
        };

        let created = self.manifest_repo.create(&manifest).await?;
        tracing::info!(
            manifest_id = %created.id,
            number = %created.manifest_number,
            courier = %courier.code,
            "Manifest opened"
        );
        Ok(created)
    }

    async fn get(&self, id: Uuid, scope: Option<Uuid>) -> Result<ManifestDetails, ManifestError> {
        let manifest = self.load(id, scope).await?;
        let shipment_ids = self
            .shipment_repo
            .list_by_manifest(id)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        Ok(ManifestDetails {
            manifest,
            shipment_ids,
        })
    }

    async fn list(
        &self,
        filter: ManifestFilter,
        pagination: Pagination,
    ) -> Result<Paginated<Manifest>, ManifestError> {
        let (manifests, total) = self.manifest_repo.list(&filter, pagination).await?;
        Ok(Paginated::new(manifests, total, pagination))
    }

    #[tracing::instrument(skip(self, shipment_ids), fields(count = shipment_ids.len()))]
    async fn add_shipments(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        shipment_ids: Vec<Uuid>,
    ) -> Result<Manifest, ManifestError> {
        let manifest = self.load_in(id, scope, &[ManifestStatus::Open]).await?;

        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = shipment_ids.into_iter().filter(|id| seen.insert(*id)).collect();

        let shipments = self.shipment_repo.find_by_ids(&ids).await?;
        for shipment_id in &ids {
            let reason = match shipments.iter().find(|s| s.id == *shipment_id) {
                None => Some("not found"),
                Some(s) if s.company_id != manifest.company_id => Some("not found"),
                Some(s) if s.courier_id != manifest.courier_id => Some("booked with another courier"),
                Some(s) if s.manifest_id.is_some() => Some("already on a manifest"),
                Some(s) if s.status != ShipmentStatus::AwbAssigned => Some("not awaiting pickup"),
                Some(_) => None,
            };
            if let Some(reason) = reason {
                return Err(ManifestError::Ineligible {
                    id: *shipment_id,
                    reason,
                });
            }
        }

        // The repository re-checks eligibility inside its transaction.
        let updated = self.manifest_repo.add_shipments(id, &ids).await?;

        tracing::info!(manifest_id = %id, total = updated.shipment_count, "Shipments manifested");
        Ok(updated)
    }

    async fn remove_shipment(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        shipment_id: Uuid,
    ) -> Result<Manifest, ManifestError> {
        self.load_in(id, scope, &[ManifestStatus::Open]).await?;

        let on_manifest = self
            .shipment_repo
            .find_by_id(shipment_id)
            .await?
            .is_some_and(|s| s.manifest_id == Some(id));
        if !on_manifest {
            return Err(ManifestError::NotOnManifest);
        }

        Ok(self.manifest_repo.remove_shipment(id, shipment_id).await?)
    }

    async fn close(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
        pickup_date: Option<NaiveDate>,
    ) -> Result<Manifest, ManifestError> {
        let manifest = self.load_in(id, scope, &[ManifestStatus::Open]).await?;
        if manifest.shipment_count == 0 {
            return Err(ManifestError::Empty);
        }

        let pickup_date = pickup_date.unwrap_or_else(|| Utc::now().date_naive());
        let closed = self.manifest_repo.close(id, pickup_date).await?;

        tracing::info!(manifest_id = %id, %pickup_date, shipments = closed.shipment_count, "Manifest closed");
        Ok(closed)
    }

    async fn mark_picked_up(
        &self,
        id: Uuid,
        scope: Option<Uuid>,
    ) -> Result<Manifest, ManifestError> {
        self.load_in(id, scope, &[ManifestStatus::Closed]).await?;
        let picked = self.manifest_repo.mark_picked_up(id).await?;

        tracing::info!(manifest_id = %id, shipments = picked.shipment_count, "Manifest picked up");
        Ok(picked)
    }

    async fn cancel(&self, id: Uuid, scope: Option<Uuid>) -> Result<Manifest, ManifestError> {
        let manifest = self.load(id, scope).await?;
        if !manifest.status.is_cancellable() {
            return Err(ManifestError::WrongState(manifest.status));
        }
        let cancelled = self.manifest_repo.cancel(id).await?;

        tracing::info!(manifest_id = %id, "Manifest cancelled");
        Ok(cancelled)
    }
}

/// Concrete implementation using PostgreSQL repositories.
pub type PgManifestService =
    ManifestServiceImpl<PgManifestRepository, PgShipmentRepository, PgCourierRepository>;
