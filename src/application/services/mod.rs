//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **CompanyService**: Seller onboarding and lifecycle
//! - **CouponService**: Promo codes, evaluation and redemption
//! - **CourierService**: Courier partners, rate cards, serviceability
//! - **OrderService**: Manual order entry and order queries
//! - **ShipmentService**: Booking, AWB assignment, tracking transitions
//! - **ManifestService**: Pickup manifests per courier
//! - **woocommerce**: Store connection, order sync, webhooks

pub mod company_service;
pub mod coupon_service;
pub mod courier_service;
pub mod manifest_service;
pub mod order_service;
pub mod shipment_service;
pub mod woocommerce;

// Re-export company service types
pub use company_service::{
    is_valid_gstin, CompanyError, CompanyService, CompanyServiceImpl, PgCompanyService,
};

// Re-export coupon service types
pub use coupon_service::{
    CouponError, CouponService, CouponServiceImpl, PgCouponService,
};

// Re-export courier service types
pub use courier_service::{
    check_couriers, CourierError, CourierQuote, CourierService, CourierServiceImpl,
    PgCourierService, ServiceabilityResult, UnavailableCourier,
};

// Re-export order service types
pub use order_service::{
    items_weight, OrderError, OrderService, OrderServiceImpl, PgOrderService,
    DEFAULT_ITEM_WEIGHT_GRAMS,
};

// Re-export shipment service types
pub use shipment_service::{
    generate_awb, PgShipmentService, ShipmentError, ShipmentService, ShipmentServiceImpl,
};

// Re-export manifest service types
pub use manifest_service::{
    ManifestDetails, ManifestError, ManifestService, ManifestServiceImpl, PgManifestService,
};
