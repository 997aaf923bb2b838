//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL)
//! - Job queues (Redis, in-memory)
//! - WooCommerce REST client
//! - Prometheus metrics

pub mod database;
pub mod metrics;
pub mod queue;
pub mod repositories;
pub mod woocommerce;
