//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod addresses;
pub mod companies;
pub mod coupons;
pub mod couriers;
pub mod health;
pub mod manifests;
pub mod orders;
pub mod shipments;
pub mod stores;
pub mod webhooks;
