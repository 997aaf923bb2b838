//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, logging::track_metrics};
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Protected routes (require a bearer token)
        .merge(protected_routes(state))
        // Storefront deliveries authenticate by signature, not JWT
        .route(
            "/webhooks/woocommerce/{store_id}",
            post(handlers::webhooks::receive_webhook),
        )
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/companies", company_routes())
        .nest("/coupons", coupon_routes())
        .nest("/couriers", courier_routes())
        .route(
            "/addresses/validate",
            post(handlers::addresses::validate_address),
        )
        .nest("/orders", order_routes())
        .nest("/shipments", shipment_routes())
        .nest("/manifests", manifest_routes())
        .nest("/integrations/woocommerce/stores", store_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Company onboarding routes (admin, sellers may read their own)
fn company_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::companies::create_company).get(handlers::companies::list_companies),
        )
        .route("/{id}", get(handlers::companies::get_company))
        .route("/{id}", patch(handlers::companies::update_company))
        .route("/{id}", delete(handlers::companies::delete_company))
        .route("/{id}/activate", post(handlers::companies::activate_company))
        .route("/{id}/suspend", post(handlers::companies::suspend_company))
}

fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::coupons::create_coupon).get(handlers::coupons::list_coupons),
        )
        .route("/validate", post(handlers::coupons::validate_coupon))
        .route("/{id}", get(handlers::coupons::get_coupon))
        .route("/{id}", patch(handlers::coupons::update_coupon))
        .route("/{id}", delete(handlers::coupons::deactivate_coupon))
        // The segment carries the coupon code here
        .route("/{id}/redeem", post(handlers::coupons::redeem_coupon))
}

fn courier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::couriers::create_courier).get(handlers::couriers::list_couriers),
        )
        .route(
            "/serviceability",
            post(handlers::couriers::check_serviceability),
        )
        .route("/{id}", get(handlers::couriers::get_courier))
        .route("/{id}", patch(handlers::couriers::update_courier))
        .route("/{id}", delete(handlers::couriers::deactivate_courier))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::orders::create_order).get(handlers::orders::list_orders),
        )
        .route("/{id}", get(handlers::orders::get_order))
}

fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::shipments::create_shipment).get(handlers::shipments::list_shipments),
        )
        .route("/{id}", get(handlers::shipments::get_shipment))
        .route(
            "/{id}/status",
            post(handlers::shipments::update_shipment_status),
        )
        .route("/{id}/cancel", post(handlers::shipments::cancel_shipment))
}

fn manifest_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::manifests::create_manifest).get(handlers::manifests::list_manifests),
        )
        .route("/{id}", get(handlers::manifests::get_manifest))
        .route("/{id}/shipments", post(handlers::manifests::add_shipments))
        .route(
            "/{id}/shipments/{shipment_id}",
            delete(handlers::manifests::remove_shipment),
        )
        .route("/{id}/close", post(handlers::manifests::close_manifest))
        .route("/{id}/pickup", post(handlers::manifests::mark_picked_up))
        .route("/{id}/cancel", post(handlers::manifests::cancel_manifest))
}

/// WooCommerce store connection and sync routes
fn store_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(handlers::stores::connect_store).get(handlers::stores::list_stores),
        )
        .route("/{id}", get(handlers::stores::get_store))
        .route("/{id}", delete(handlers::stores::disconnect_store))
        .route("/{id}/sync", post(handlers::stores::sync_orders))
        .route("/{id}/products/sync", post(handlers::stores::sync_products))
        .route("/{id}/mappings", get(handlers::stores::list_mappings))
        .route(
            "/{id}/mappings/{mapping_id}",
            patch(handlers::stores::update_mapping),
        )
}
