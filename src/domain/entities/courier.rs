//! Courier partner entity and repository trait.
//!
//! Maps to the `couriers` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::PaymentMode;
use crate::shared::error::AppError;

/// Default cm³ per kg used for volumetric weight.
pub const DEFAULT_VOLUMETRIC_DIVISOR: i32 = 5000;

/// Why a courier cannot take a consignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NonServiceableReason {
    Inactive,
    PickupNotCovered,
    DeliveryNotCovered,
    CodUnsupported,
    OverweightLimit,
}

impl NonServiceableReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Inactive => "courier is inactive",
            Self::PickupNotCovered => "pickup pincode not serviceable",
            Self::DeliveryNotCovered => "delivery pincode not serviceable",
            Self::CodUnsupported => "cash on delivery not supported",
            Self::OverweightLimit => "weight exceeds courier limit",
        }
    }
}

impl std::fmt::Display for NonServiceableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// A courier partner and its tariff.
///
/// Maps to the `couriers` table:
/// - id: UUID PRIMARY KEY
/// - name: TEXT NOT NULL
/// - code: TEXT NOT NULL UNIQUE (slug)
/// - awb_prefix: TEXT NOT NULL
/// - supports_cod: BOOLEAN NOT NULL
/// - max_weight_grams: INTEGER NOT NULL
/// - serviceable_prefixes: TEXT[] NOT NULL DEFAULT '{}' (empty = nationwide)
/// - base_rate: BIGINT NOT NULL (paise, first 500 g)
/// - additional_rate: BIGINT NOT NULL (paise, each further 500 g)
/// - cod_charge_percent: INTEGER NOT NULL (basis points)
/// - cod_min_charge: BIGINT NOT NULL (paise)
/// - volumetric_divisor: INTEGER NOT NULL DEFAULT 5000
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub awb_prefix: String,
    pub supports_cod: bool,
    pub max_weight_grams: i32,
    pub serviceable_prefixes: Vec<String>,
    pub base_rate: i64,
    pub additional_rate: i64,
    pub cod_charge_percent: i32,
    pub cod_min_charge: i64,
    pub volumetric_divisor: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Courier {
    /// Whether the courier operates at `pincode`.
    pub fn covers_pincode(&self, pincode: &str) -> bool {
        self.serviceable_prefixes.is_empty()
            || self
                .serviceable_prefixes
                .iter()
                .any(|prefix| pincode.starts_with(prefix.as_str()))
    }

    /// Check whether this courier can carry the consignment.
    pub fn check_serviceability(
        &self,
        pickup_pincode: &str,
        delivery_pincode: &str,
        payment_mode: PaymentMode,
        weight_grams: i32,
    ) -> Result<(), NonServiceableReason> {
        if !self.is_active {
            return Err(NonServiceableReason::Inactive);
        }
        if !self.covers_pincode(pickup_pincode) {
            return Err(NonServiceableReason::PickupNotCovered);
        }
        if !self.covers_pincode(delivery_pincode) {
            return Err(NonServiceableReason::DeliveryNotCovered);
        }
        if payment_mode.is_cod() && !self.supports_cod {
            return Err(NonServiceableReason::CodUnsupported);
        }
        if weight_grams > self.max_weight_grams {
            return Err(NonServiceableReason::OverweightLimit);
        }
        Ok(())
    }
}

/// Repository trait for Courier data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourierRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Courier>, AppError>;

    async fn code_exists(&self, code: &str) -> Result<bool, AppError>;

    /// All couriers, or only active ones, ordered by name.
    async fn list(&self, active_only: bool) -> Result<Vec<Courier>, AppError>;

    async fn create(&self, courier: &Courier) -> Result<Courier, AppError>;

    async fn update(&self, courier: &Courier) -> Result<Courier, AppError>;

    /// Soft delete (`is_active = false`).
    async fn deactivate(&self, id: Uuid) -> Result<(), AppError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn courier() -> Courier {
        let now = Utc::now();
        Courier {
            id: Uuid::now_v7(),
            name: "Blue Dart".into(),
            code: "bluedart".into(),
            awb_prefix: "BD".into(),
            supports_cod: true,
            max_weight_grams: 10_000,
            serviceable_prefixes: vec!["56".into(), "110".into()],
            base_rate: 4_000,
            additional_rate: 3_000,
            cod_charge_percent: 200,
            cod_min_charge: 3_500,
            volumetric_divisor: DEFAULT_VOLUMETRIC_DIVISOR,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_prefix_list_is_nationwide() {
        let mut c = courier();
        c.serviceable_prefixes.clear();
        assert!(c.covers_pincode("799001"));
    }

    #[test]
    fn serviceability_rules() {
        let c = courier();
        assert_eq!(c.check_serviceability("560001", "110020", PaymentMode::Cod, 500), Ok(()));
        assert_eq!(
            c.check_serviceability("400001", "110020", PaymentMode::Prepaid, 500),
            Err(NonServiceableReason::PickupNotCovered)
        );
        assert_eq!(
            c.check_serviceability("560001", "400001", PaymentMode::Prepaid, 500),
            Err(NonServiceableReason::DeliveryNotCovered)
        );
        assert_eq!(
            c.check_serviceability("560001", "560002", PaymentMode::Prepaid, 10_001),
            Err(NonServiceableReason::OverweightLimit)
        );

        let mut no_cod = courier();
        no_cod.supports_cod = false;
        assert_eq!(
            no_cod.check_serviceability("560001", "560002", PaymentMode::Cod, 500),
            Err(NonServiceableReason::CodUnsupported)
        );

        let mut inactive = courier();
        inactive.is_active = false;
        assert_eq!(
            inactive.check_serviceability("560001", "560002", PaymentMode::Prepaid, 500),
            Err(NonServiceableReason::Inactive)
        );
    }
}
