//! Order entity and repository trait.
//!
//! Maps to the `orders` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Address, PaymentMode};
use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

pub const DEFAULT_CURRENCY: &str = "INR";

/// Lifecycle status of an order, aligned with the storefront vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "processing" => Self::Processing,
            "on_hold" => Self::OnHold,
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Failed => "failed",
        }
    }

    /// Orders in these states can no longer be shipped.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded | Self::Failed)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderChannel {
    #[default]
    Manual,
    #[serde(rename = "woocommerce")]
    WooCommerce,
}

impl OrderChannel {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "woocommerce" => Self::WooCommerce,
            _ => Self::Manual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::WooCommerce => "woocommerce",
        }
    }
}

impl std::fmt::Display for OrderChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One order line, stored inside the order's `items` JSONB column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    pub quantity: i32,
    /// Paise per unit.
    pub unit_price: i64,
    /// Per-unit weight when known.
    #[serde(default)]
    pub weight_grams: Option<i32>,
    /// Storefront product (or variation) id for synced orders.
    #[serde(default)]
    pub external_product_id: Option<i64>,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.unit_price.saturating_mul(self.quantity as i64)
    }
}

/// A customer order, entered manually or synced from a storefront.
///
/// Maps to the `orders` table:
/// - id: UUID PRIMARY KEY
/// - company_id: UUID NOT NULL REFERENCES companies(id)
/// - channel: TEXT NOT NULL ('manual' | 'woocommerce')
/// - store_id: UUID NULL REFERENCES woocommerce_stores(id)
/// - external_id: BIGINT NULL, UNIQUE (store_id, external_id)
/// - order_number: TEXT NOT NULL
/// - status, payment_mode: TEXT NOT NULL
/// - customer_name, customer_phone: TEXT NOT NULL; customer_email: TEXT NULL
/// - shipping_address, items: JSONB NOT NULL
/// - subtotal, discount, shipping, total: BIGINT NOT NULL (paise)
/// - currency: TEXT NOT NULL DEFAULT 'INR'
/// - weight_grams: INTEGER NOT NULL
/// - promo_code: TEXT NULL
/// - external_updated_at: TIMESTAMPTZ NULL (last-write-wins clock)
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub company_id: Uuid,
    pub channel: OrderChannel,
    pub store_id: Option<Uuid>,
    pub external_id: Option<i64>,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_mode: PaymentMode,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub shipping_address: Address,
    pub items: Vec<OrderItem>,
    pub subtotal: i64,
    pub discount: i64,
    pub shipping: i64,
    pub total: i64,
    pub currency: String,
    pub weight_grams: i32,
    pub promo_code: Option<String>,
    pub external_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Amount to collect from the consignee.
    pub fn collectable_amount(&self) -> i64 {
        if self.payment_mode.is_cod() {
            self.total
        } else {
            0
        }
    }
}

/// Result of writing a storefront order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// No row existed for `(store_id, external_id)`.
    Created,
    /// Incoming data was newer and replaced the external fields.
    Updated,
    /// Stored copy is as new or newer; nothing written.
    Skipped,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
        }
    }

    /// Last-write-wins decision for an incoming copy of an existing row.
    pub fn decide(
        existing: Option<DateTime<Utc>>,
        incoming: Option<DateTime<Utc>>,
    ) -> UpsertOutcome {
        match (existing, incoming) {
            (Some(stored), Some(new)) if stored >= new => Self::Skipped,
            (Some(_), None) => Self::Skipped,
            _ => Self::Updated,
        }
    }
}

/// Filters for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub company_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub channel: Option<OrderChannel>,
    pub store_id: Option<Uuid>,
}

/// Repository trait for Order data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError>;

    async fn find_by_external_id(
        &self,
        store_id: Uuid,
        external_id: i64,
    ) -> Result<Option<Order>, AppError>;

    async fn create(&self, order: &Order) -> Result<Order, AppError>;

    async fn list(
        &self,
        filter: &OrderFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Order>, i64), AppError>;

    /// Insert or last-write-wins update keyed by `(store_id, external_id)`.
    ///
    /// Internal columns (id, company, created_at) are never overwritten.
    async fn upsert_external(&self, order: &Order) -> Result<UpsertOutcome, AppError>;

    async fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_case::test_case;

    #[test_case(OrderStatus::Pending, false)]
    #[test_case(OrderStatus::Processing, false)]
    #[test_case(OrderStatus::OnHold, false)]
    #[test_case(OrderStatus::Completed, false)]
    #[test_case(OrderStatus::Cancelled, true)]
    #[test_case(OrderStatus::Refunded, true)]
    #[test_case(OrderStatus::Failed, true)]
    fn closed_statuses(status: OrderStatus, closed: bool) {
        assert_eq!(status.is_closed(), closed);
        assert_eq!(OrderStatus::from_str(status.as_str()), status);
    }

    #[test]
    fn last_write_wins() {
        let t = Utc::now();
        assert_eq!(UpsertOutcome::decide(Some(t), Some(t)), UpsertOutcome::Skipped);
        assert_eq!(
            UpsertOutcome::decide(Some(t), Some(t - Duration::seconds(1))),
            UpsertOutcome::Skipped
        );
        assert_eq!(
            UpsertOutcome::decide(Some(t), Some(t + Duration::seconds(1))),
            UpsertOutcome::Updated
        );
        assert_eq!(UpsertOutcome::decide(None, Some(t)), UpsertOutcome::Updated);
    }

    #[test]
    fn channel_serializes_as_stored() {
        assert_eq!(
            serde_json::to_string(&OrderChannel::WooCommerce).unwrap(),
            "\"woocommerce\""
        );
        assert_eq!(OrderChannel::from_str("woocommerce"), OrderChannel::WooCommerce);
    }

    #[test]
    fn line_totals() {
        let item = OrderItem {
            sku: None,
            name: "Mug".into(),
            quantity: 3,
            unit_price: 19_900,
            weight_grams: None,
            external_product_id: None,
        };
        assert_eq!(item.line_total(), 59_700);
    }
}
