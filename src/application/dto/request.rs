//! Request DTOs
//!
//! Data structures for API request bodies and query strings.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::application::services::woocommerce::SyncMode;
use crate::domain::{
    Address, CompanyStatus, DiscountType, ManifestStatus, OrderChannel, OrderStatus, PaymentMode,
    ShipmentStatus,
};
use crate::shared::pagination::Pagination;

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

/// Onboard company request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 2, max = 120, message = "Name must be 2-120 characters"))]
    pub name: String,

    #[validate(length(min = 2, max = 200, message = "Legal name must be 2-200 characters"))]
    pub legal_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub phone: String,

    pub gstin: Option<String>,

    pub billing_address: Address,
}

/// Partial company update
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 2, max = 120, message = "Name must be 2-120 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 2, max = 200, message = "Legal name must be 2-200 characters"))]
    pub legal_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub phone: Option<String>,

    pub gstin: Option<String>,

    pub billing_address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
    pub status: Option<CompanyStatus>,
}

// ---------------------------------------------------------------------------
// Coupons
// ---------------------------------------------------------------------------

/// Create coupon request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCouponRequest {
    pub code: String,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    pub discount_type: DiscountType,

    #[validate(range(min = 1i64, max = 10000000000i64, message = "Discount value must be between 1 and 10000000000"))]
    pub discount_value: i64,

    #[validate(range(min = 1i64, max = 10000000000i64, message = "Max discount must be between 1 and 10000000000"))]
    pub max_discount: Option<i64>,

    #[serde(default)]
    #[validate(range(min = 0i64, max = 10000000000i64, message = "Minimum order value must be between 0 and 10000000000"))]
    pub min_order_value: i64,

    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,

    /// Restrict to one company; global when absent.
    pub company_id: Option<Uuid>,

    pub valid_from: Option<DateTime<Utc>>,

    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCouponRequest {
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1i64, max = 10000000000i64, message = "Max discount must be between 1 and 10000000000"))]
    pub max_discount: Option<i64>,

    #[validate(range(min = 0i64, max = 10000000000i64, message = "Minimum order value must be between 0 and 10000000000"))]
    pub min_order_value: Option<i64>,

    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,

    pub valid_until: Option<DateTime<Utc>>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub active_only: bool,
}

/// Check a coupon against an order value
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,

    pub company_id: Option<Uuid>,

    #[validate(range(min = 0i64, max = 10000000000i64, message = "Order value must be between 0 and 10000000000"))]
    pub order_value: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RedeemCouponRequest {
    pub company_id: Option<Uuid>,

    #[validate(range(min = 0i64, max = 10000000000i64, message = "Order value must be between 0 and 10000000000"))]
    pub order_value: i64,
}

// ---------------------------------------------------------------------------
// Couriers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourierRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,

    pub code: String,

    pub awb_prefix: String,

    #[serde(default)]
    pub supports_cod: bool,

    #[validate(range(min = 1, max = 1000000, message = "Max weight must be 1-1000000 grams"))]
    pub max_weight_grams: i32,

    #[serde(default)]
    pub serviceable_prefixes: Vec<String>,

    #[validate(range(min = 0i64, max = 10000000000i64, message = "Base rate must be between 0 and 10000000000"))]
    pub base_rate: i64,

    #[validate(range(min = 0i64, max = 10000000000i64, message = "Additional rate must be between 0 and 10000000000"))]
    pub additional_rate: i64,

    #[serde(default)]
    #[validate(range(min = 0, max = 10000, message = "COD charge must be 0-10000 basis points"))]
    pub cod_charge_percent: i32,

    #[serde(default)]
    #[validate(range(min = 0i64, max = 10000000000i64, message = "COD minimum must be between 0 and 10000000000"))]
    pub cod_min_charge: i64,

    #[validate(range(min = 1, max = 100000, message = "Volumetric divisor must be 1-100000"))]
    pub volumetric_divisor: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCourierRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,

    pub awb_prefix: Option<String>,

    pub supports_cod: Option<bool>,

    #[validate(range(min = 1, max = 1000000, message = "Max weight must be 1-1000000 grams"))]
    pub max_weight_grams: Option<i32>,

    pub serviceable_prefixes: Option<Vec<String>>,

    #[validate(range(min = 0i64, max = 10000000000i64, message = "Base rate must be between 0 and 10000000000"))]
    pub base_rate: Option<i64>,

    #[validate(range(min = 0i64, max = 10000000000i64, message = "Additional rate must be between 0 and 10000000000"))]
    pub additional_rate: Option<i64>,

    #[validate(range(min = 0, max = 10000, message = "COD charge must be 0-10000 basis points"))]
    pub cod_charge_percent: Option<i32>,

    #[validate(range(min = 0i64, max = 10000000000i64, message = "COD minimum must be between 0 and 10000000000"))]
    pub cod_min_charge: Option<i64>,

    #[validate(range(min = 1, max = 100000, message = "Volumetric divisor must be 1-100000"))]
    pub volumetric_divisor: Option<i32>,

    pub is_active: Option<bool>,
}

/// Which couriers can carry a parcel, and at what price
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ServiceabilityRequest {
    pub pickup_pincode: String,

    pub delivery_pincode: String,

    #[serde(default)]
    pub payment_mode: PaymentMode,

    #[validate(range(min = 1, max = 1000000, message = "Weight must be 1-1000000 grams"))]
    pub weight_grams: i32,

    #[validate(range(min = 1, max = 1000, message = "Length must be 1-1000 cm"))]
    pub length_cm: Option<i32>,

    #[validate(range(min = 1, max = 1000, message = "Breadth must be 1-1000 cm"))]
    pub breadth_cm: Option<i32>,

    #[validate(range(min = 1, max = 1000, message = "Height must be 1-1000 cm"))]
    pub height_cm: Option<i32>,

    /// Amount to collect for COD quotes, in paise.
    #[serde(default)]
    #[validate(range(min = 0i64, max = 10000000000i64, message = "COD amount must be between 0 and 10000000000"))]
    pub cod_amount: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourierListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemRequest {
    pub sku: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Item name must be 1-200 characters"))]
    pub name: String,

    #[validate(range(min = 1, max = 10000, message = "Quantity must be 1-10000"))]
    pub quantity: i32,

    #[validate(range(min = 0i64, max = 10000000000i64, message = "Unit price must be between 0 and 10000000000"))]
    pub unit_price: i64,

    #[validate(range(min = 1, max = 1000000, message = "Item weight must be 1-1000000 grams"))]
    pub weight_grams: Option<i32>,
}

/// Manual order entry
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderRequest {
    /// Required for admins; sellers always use their own company.
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, max = 64, message = "Order number must be 1-64 characters"))]
    pub order_number: Option<String>,

    #[serde(default)]
    pub payment_mode: PaymentMode,

    #[validate(length(min = 1, max = 120, message = "Customer name must be 1-120 characters"))]
    pub customer_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub customer_email: Option<String>,

    pub customer_phone: String,

    pub shipping_address: Address,

    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Vec<OrderItemRequest>,

    #[serde(default)]
    #[validate(range(min = 0i64, max = 10000000000i64, message = "Shipping must be between 0 and 10000000000"))]
    pub shipping: i64,

    /// Overrides the weight derived from the items.
    #[validate(range(min = 1, max = 1000000, message = "Weight must be 1-1000000 grams"))]
    pub weight_grams: Option<i32>,

    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub company_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
    pub channel: Option<OrderChannel>,
    pub store_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Shipments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateShipmentRequest {
    pub order_id: Uuid,

    pub courier_id: Uuid,

    /// Defaults to the company's billing pincode.
    pub pickup_pincode: Option<String>,

    /// Defaults to the order weight.
    #[validate(range(min = 1, max = 1000000, message = "Weight must be 1-1000000 grams"))]
    pub weight_grams: Option<i32>,

    #[validate(range(min = 1, max = 1000, message = "Length must be 1-1000 cm"))]
    pub length_cm: Option<i32>,

    #[validate(range(min = 1, max = 1000, message = "Breadth must be 1-1000 cm"))]
    pub breadth_cm: Option<i32>,

    #[validate(range(min = 1, max = 1000, message = "Height must be 1-1000 cm"))]
    pub height_cm: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateShipmentStatusRequest {
    pub status: ShipmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShipmentListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub company_id: Option<Uuid>,
    pub status: Option<ShipmentStatus>,
    pub courier_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
}

// ---------------------------------------------------------------------------
// Manifests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateManifestRequest {
    pub company_id: Option<Uuid>,
    pub courier_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ManifestShipmentsRequest {
    #[validate(length(min = 1, max = 500, message = "Provide 1-500 shipment ids"))]
    pub shipment_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloseManifestRequest {
    /// Defaults to today.
    pub pickup_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub company_id: Option<Uuid>,
    pub courier_id: Option<Uuid>,
    pub status: Option<ManifestStatus>,
}

// ---------------------------------------------------------------------------
// WooCommerce
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConnectStoreRequest {
    pub company_id: Option<Uuid>,

    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,

    pub store_url: String,

    #[validate(length(min = 1, message = "Consumer key is required"))]
    pub consumer_key: String,

    #[validate(length(min = 1, message = "Consumer secret is required"))]
    pub consumer_secret: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreListQuery {
    pub company_id: Option<Uuid>,
}

/// `?mode=full|incremental`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SyncStoreQuery {
    #[serde(default)]
    pub mode: SyncMode,
}

/// Manual shipping attributes for a product mapping
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMappingRequest {
    #[validate(range(min = 1, max = 1000000, message = "Weight must be 1-1000000 grams"))]
    pub weight_grams: Option<i32>,

    #[validate(range(min = 1, max = 1000, message = "Length must be 1-1000 cm"))]
    pub length_cm: Option<i32>,

    #[validate(range(min = 1, max = 1000, message = "Breadth must be 1-1000 cm"))]
    pub breadth_cm: Option<i32>,

    #[validate(range(min = 1, max = 1000, message = "Height must be 1-1000 cm"))]
    pub height_cm: Option<i32>,
}

macro_rules! impl_pagination {
    ($($query:ty),*) => {
        $(impl $query {
            pub fn pagination(&self) -> Pagination {
                Pagination::new(self.page, self.per_page)
            }
        })*
    };
}

impl_pagination!(
    CompanyListQuery,
    CouponListQuery,
    OrderListQuery,
    ShipmentListQuery,
    ManifestListQuery
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serviceability_rejects_oversized_parcel() {
        let request: ServiceabilityRequest = serde_json::from_value(json!({
            "pickup_pincode": "560034",
            "delivery_pincode": "110001",
            "weight_grams": 1200,
            "length_cm": i32::MAX,
            "breadth_cm": i32::MAX,
            "height_cm": 2,
            "cod_amount": i64::MAX,
        }))
        .unwrap();

        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("length_cm"));
        assert!(fields.contains_key("breadth_cm"));
        assert!(fields.contains_key("cod_amount"));
        assert!(!fields.contains_key("height_cm"));
    }

    #[test]
    fn coupon_check_rejects_huge_order_value() {
        let request: ValidateCouponRequest =
            serde_json::from_value(json!({ "code": "SAVE10", "order_value": i64::MAX })).unwrap();
        assert!(request.validate().unwrap_err().field_errors().contains_key("order_value"));

        let request: ValidateCouponRequest =
            serde_json::from_value(json!({ "code": "SAVE10", "order_value": 250_000 })).unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn order_item_quantity_is_bounded() {
        let item: OrderItemRequest = serde_json::from_value(json!({
            "name": "Masala Chai",
            "quantity": 5_000_000,
            "unit_price": 24_900,
        }))
        .unwrap();
        assert!(item.validate().unwrap_err().field_errors().contains_key("quantity"));
    }
}
