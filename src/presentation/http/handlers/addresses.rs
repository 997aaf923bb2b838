//! Address Handlers

use axum::Json;

use crate::application::dto::response::AddressValidationResponse;
use crate::domain::Address;

/// Normalize and validate an address.
///
/// Always 200; the verdict is in the body.
pub async fn validate_address(Json(address): Json<Address>) -> Json<AddressValidationResponse> {
    Json(AddressValidationResponse::check(address))
}
