//! Pickup manifest entity and repository trait.
//!
//! Maps to the `manifests` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

const NUMBER_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    #[default]
    Open,
    Closed,
    PickedUp,
    Cancelled,
}

impl ManifestStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "closed" => Self::Closed,
            "picked_up" => Self::PickedUp,
            "cancelled" => Self::Cancelled,
            _ => Self::Open,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::PickedUp => "picked_up",
            Self::Cancelled => "cancelled",
        }
    }

    /// Open and closed manifests can still be cancelled.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Open | Self::Closed)
    }
}

impl std::fmt::Display for ManifestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A batch of shipments handed to one courier at pickup.
///
/// Maps to the `manifests` table:
/// - id: UUID PRIMARY KEY
/// - company_id: UUID NOT NULL REFERENCES companies(id)
/// - courier_id: UUID NOT NULL REFERENCES couriers(id)
/// - manifest_number: TEXT NOT NULL UNIQUE (MAN-YYYYMMDD-XXXXXX)
/// - status: TEXT NOT NULL DEFAULT 'open'
/// - pickup_date: DATE NULL
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub courier_id: Uuid,
    pub manifest_number: String,
    pub status: ManifestStatus,
    pub pickup_date: Option<NaiveDate>,
    /// Derived from `shipments.manifest_id`.
    pub shipment_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    /// Generate a manifest number for the given day.
    pub fn generate_number(date: NaiveDate) -> String {
        let mut rng = rand::rng();
        let suffix: String = (0..6)
            .map(|_| NUMBER_CHARSET[rng.random_range(0..NUMBER_CHARSET.len())] as char)
            .collect();
        format!("MAN-{}-{}", date.format("%Y%m%d"), suffix)
    }
}

/// Filters for listing manifests.
#[derive(Debug, Clone, Default)]
pub struct ManifestFilter {
    pub company_id: Option<Uuid>,
    pub courier_id: Option<Uuid>,
    pub status: Option<ManifestStatus>,
}

/// Repository trait for Manifest data access operations.
///
/// Methods that touch shipments run in one transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ManifestRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Manifest>, AppError>;

    async fn number_exists(&self, number: &str) -> Result<bool, AppError>;

    async fn create(&self, manifest: &Manifest) -> Result<Manifest, AppError>;

    async fn list(
        &self,
        filter: &ManifestFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Manifest>, i64), AppError>;

    /// Attach every shipment or none.
    ///
    /// Only `awb_assigned` shipments of the manifest's company and courier
    /// that are not on another manifest are eligible; `AppError::Conflict`
    /// if any id is not.
    async fn add_shipments(&self, manifest_id: Uuid, shipment_ids: &[Uuid])
        -> Result<Manifest, AppError>;

    async fn remove_shipment(&self, manifest_id: Uuid, shipment_id: Uuid)
        -> Result<Manifest, AppError>;

    /// Open -> Closed, shipments -> manifested.
    async fn close(&self, manifest_id: Uuid, pickup_date: NaiveDate) -> Result<Manifest, AppError>;

    /// Closed -> PickedUp, shipments -> picked_up.
    async fn mark_picked_up(&self, manifest_id: Uuid) -> Result<Manifest, AppError>;

    /// -> Cancelled, shipments released back to awb_assigned.
    async fn cancel(&self, manifest_id: Uuid) -> Result<Manifest, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let number = Manifest::generate_number(date);
        assert!(number.starts_with("MAN-20260309-"));
        assert_eq!(number.len(), "MAN-20260309-".len() + 6);
        assert!(number[13..].bytes().all(|b| NUMBER_CHARSET.contains(&b)));
    }

    #[test]
    fn cancellable_states() {
        assert!(ManifestStatus::Open.is_cancellable());
        assert!(ManifestStatus::Closed.is_cancellable());
        assert!(!ManifestStatus::PickedUp.is_cancellable());
        assert!(!ManifestStatus::Cancelled.is_cancellable());
    }
}
