//! # Domain Layer
//!
//! Core business rules of the shipping platform, independent of HTTP,
//! storage and the storefront API.
//!
//! ## Structure
//!
//! - **entities**: Company, PromoCode, Courier, Order, Shipment, Manifest, WooCommerce store
//! - **value_objects**: Address, Parcel, PaymentMode
//! - **services**: Rate calculation
//!
//! Repository traits live next to their entities; implementations are in
//! the infrastructure layer.

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
