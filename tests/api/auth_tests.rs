//! Bearer Token Guard Tests

use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use serde_json::{json, Value};

use parcel_hub::presentation::middleware::Role;

use crate::common::{seller_token, token, valid_address, TestApp};

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new();

    let response = app.server.get("/api/v1/orders").await;

    response.assert_status_unauthorized();
    assert_eq!(
        response.json::<Value>()["message"],
        "Missing authorization header"
    );
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .server
        .get("/api/v1/shipments")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let app = TestApp::new();
    let expired = token(Role::Admin, None, -3600);

    let response = app
        .server
        .get("/api/v1/manifests")
        .authorization_bearer(expired)
        .await;

    response.assert_status_unauthorized();
    assert_eq!(response.json::<Value>()["message"], "Token expired");
}

#[tokio::test]
async fn test_seller_token_without_company_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/addresses/validate")
        .authorization_bearer(token(Role::Seller, None, 600))
        .json(&valid_address())
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_seller_cannot_onboard_company() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/companies")
        .authorization_bearer(seller_token())
        .json(&json!({
            "name": "Acme",
            "legal_name": "Acme Pvt Ltd",
            "email": "ops@acme.in",
            "phone": "9876543210",
            "billing_address": valid_address()
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_seller_cannot_create_courier() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/couriers")
        .authorization_bearer(seller_token())
        .json(&json!({
            "name": "Fast Couriers",
            "code": "fast",
            "awb_prefix": "FS",
            "max_weight_grams": 20000,
            "base_rate": 4000,
            "additional_rate": 2500
        }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}
