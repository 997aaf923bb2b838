//! # Domain Entities
//!
//! Core business objects of the shipping platform. All entities map
//! directly to their corresponding database tables.
//!
//! ## Tenancy and catalogue
//!
//! - **Company**: A seller onboarded onto the platform
//! - **PromoCode**: Global or company-scoped discount code
//! - **Courier**: Courier partner with coverage and tariff
//!
//! ## Fulfilment
//!
//! - **Order**: Manual or storefront order
//! - **Shipment**: A consignment booked for an order, with its tracking state machine
//! - **Manifest**: Shipments batched for one courier pickup
//!
//! ## Storefront integration
//!
//! - **WooCommerceStore**: Connected WooCommerce shop and its credentials
//! - **WooCommerceProductMapping**: Per-product shipping attributes
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access
//! operations, implemented in the infrastructure layer.

mod company;
mod courier;
mod manifest;
mod order;
mod promo_code;
mod shipment;
mod woo_store;

pub use company::*;
pub use courier::*;
pub use manifest::*;
pub use order::*;
pub use promo_code::*;
pub use shipment::*;
pub use woo_store::*;

#[cfg(test)]
pub(crate) use courier::tests::courier as sample_courier;
