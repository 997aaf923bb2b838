//! WooCommerce Integration
//!
//! REST client for the `wc/v3` API and the payload types it returns.

mod client;
mod types;

pub use client::{
    HttpWooClientFactory, WooClientError, WooClientFactory, WooCommerceApi, WooCommerceClient,
};
pub use types::{
    parse_gmt, Page, WooAddress, WooDeleted, WooDimensions, WooLineItem, WooOrder, WooProduct,
};

#[cfg(test)]
pub use client::{MockWooClientFactory, MockWooCommerceApi};
