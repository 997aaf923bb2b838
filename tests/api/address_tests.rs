//! Address Validation API Tests

use serde_json::Value;

use crate::common::{seller_token, valid_address, TestApp};

#[tokio::test]
async fn test_valid_address_is_normalized() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/addresses/validate")
        .authorization_bearer(seller_token())
        .json(&valid_address())
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["valid"], true);
    assert_eq!(json["normalized"]["name"], "Asha Rao");
    assert_eq!(json["normalized"]["phone"], "9876543210");
    assert_eq!(json["normalized"]["state"], "KA");
    assert_eq!(json["normalized"]["country"], "IN");
    assert_eq!(json["errors"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_invalid_address_lists_every_field() {
    let app = TestApp::new();
    let mut address = valid_address();
    address["pincode"] = "012345".into();
    address["phone"] = "12345".into();
    address["city"] = " ".into();

    let response = app
        .server
        .post("/api/v1/addresses/validate")
        .authorization_bearer(seller_token())
        .json(&address)
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["valid"], false);
    assert!(json.get("normalized").map_or(true, Value::is_null));

    let fields: Vec<&str> = json["errors"]
        .as_array()
        .expect("errors array")
        .iter()
        .filter_map(|e| e["field"].as_str())
        .collect();
    assert!(fields.contains(&"pincode"));
    assert!(fields.contains(&"phone"));
    assert!(fields.contains(&"city"));
}
