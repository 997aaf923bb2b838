//! Shipment entity, tracking state machine and repository trait.
//!
//! Maps to the `shipments` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::PaymentMode;
use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

/// Tracking status of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[default]
    Created,
    AwbAssigned,
    Manifested,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    Rto,
    Cancelled,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 9] = [
        Self::Created,
        Self::AwbAssigned,
        Self::Manifested,
        Self::PickedUp,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Rto,
        Self::Cancelled,
    ];

    /// Parse a stored or client-supplied status; unknown values are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AwbAssigned => "awb_assigned",
            Self::Manifested => "manifested",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Rto => "rto",
            Self::Cancelled => "cancelled",
        }
    }

    /// States reachable in one step.
    pub fn next_states(&self) -> &'static [ShipmentStatus] {
        use ShipmentStatus::*;
        match self {
            Created => &[AwbAssigned, Cancelled],
            AwbAssigned => &[Manifested, Cancelled],
            Manifested => &[PickedUp, AwbAssigned, Cancelled],
            PickedUp => &[InTransit],
            InTransit => &[OutForDelivery, Rto],
            OutForDelivery => &[Delivered, Rto, InTransit],
            Delivered | Rto | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: ShipmentStatus) -> bool {
        self.next_states().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A consignment booked with a courier for one order.
///
/// Maps to the `shipments` table:
/// - id: UUID PRIMARY KEY
/// - company_id: UUID NOT NULL REFERENCES companies(id)
/// - order_id: UUID NOT NULL REFERENCES orders(id)
/// - courier_id: UUID NOT NULL REFERENCES couriers(id)
/// - awb: TEXT NULL UNIQUE
/// - status: TEXT NOT NULL DEFAULT 'created'
/// - payment_mode: TEXT NOT NULL
/// - cod_amount: BIGINT NOT NULL DEFAULT 0
/// - weight_grams, length_cm, breadth_cm, height_cm: INTEGER
/// - freight_charge, cod_charge: BIGINT NOT NULL
/// - manifest_id: UUID NULL REFERENCES manifests(id)
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Uuid,
    pub awb: Option<String>,
    pub status: ShipmentStatus,
    pub payment_mode: PaymentMode,
    pub cod_amount: i64,
    pub weight_grams: i32,
    pub length_cm: Option<i32>,
    pub breadth_cm: Option<i32>,
    pub height_cm: Option<i32>,
    pub freight_charge: i64,
    pub cod_charge: i64,
    pub manifest_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub fn total_charge(&self) -> i64 {
        self.freight_charge + self.cod_charge
    }
}

/// Filters for listing shipments.
#[derive(Debug, Clone, Default)]
pub struct ShipmentFilter {
    pub company_id: Option<Uuid>,
    pub status: Option<ShipmentStatus>,
    pub courier_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
}

/// Repository trait for Shipment data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Shipment>, AppError>;

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Shipment>, AppError>;

    /// Whether the order already has a shipment that is not cancelled.
    async fn has_live_shipment(&self, order_id: Uuid) -> Result<bool, AppError>;

    /// Live shipments of an order (used when the storefront cancels it).
    async fn find_live_by_order(&self, order_id: Uuid) -> Result<Vec<Shipment>, AppError>;

    async fn awb_exists(&self, awb: &str) -> Result<bool, AppError>;

    async fn create(&self, shipment: &Shipment) -> Result<Shipment, AppError>;

    async fn list(
        &self,
        filter: &ShipmentFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Shipment>, i64), AppError>;

    /// Move to `next` only if the row is still in `expected`.
    ///
    /// Returns false when a concurrent update changed the status first.
    async fn update_status(
        &self,
        id: Uuid,
        expected: ShipmentStatus,
        next: ShipmentStatus,
    ) -> Result<bool, AppError>;

    async fn list_by_manifest(&self, manifest_id: Uuid) -> Result<Vec<Shipment>, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use ShipmentStatus::*;

    #[test_case(Created, AwbAssigned => true)]
    #[test_case(Created, Cancelled => true)]
    #[test_case(Created, Manifested => false)]
    #[test_case(AwbAssigned, Manifested => true)]
    #[test_case(Manifested, AwbAssigned => true)]
    #[test_case(Manifested, PickedUp => true)]
    #[test_case(PickedUp, InTransit => true)]
    #[test_case(PickedUp, Cancelled => false)]
    #[test_case(InTransit, Rto => true)]
    #[test_case(OutForDelivery, InTransit => true)]
    #[test_case(OutForDelivery, Delivered => true)]
    #[test_case(Delivered, Rto => false)]
    #[test_case(Cancelled, AwbAssigned => false)]
    fn transitions(from: ShipmentStatus, to: ShipmentStatus) -> bool {
        from.can_transition_to(to)
    }

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = ShipmentStatus::ALL
            .into_iter()
            .filter(ShipmentStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![Delivered, Rto, Cancelled]);
    }

    #[test]
    fn parse_is_strict() {
        assert_eq!(ShipmentStatus::parse("OUT_FOR_DELIVERY"), Some(OutForDelivery));
        assert_eq!(ShipmentStatus::parse("lost"), None);
        for status in ShipmentStatus::ALL {
            assert_eq!(ShipmentStatus::from_str(status.as_str()), status);
        }
    }
}
