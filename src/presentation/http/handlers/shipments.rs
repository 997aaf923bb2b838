//! Shipment Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{
    CreateShipmentRequest, ShipmentListQuery, UpdateShipmentStatusRequest,
};
use crate::application::services::{PgShipmentService, ShipmentService, ShipmentServiceImpl};
use crate::domain::{Shipment, ShipmentFilter};
use crate::infrastructure::repositories::{
    PgCompanyRepository, PgCourierRepository, PgOrderRepository, PgShipmentRepository,
    PgWooStoreRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::Paginated;
use crate::shared::validation::validate_body;
use crate::startup::AppState;

fn service(state: &AppState) -> PgShipmentService {
    ShipmentServiceImpl::new(
        Arc::new(PgShipmentRepository::new(state.db.clone())),
        Arc::new(PgOrderRepository::new(state.db.clone())),
        Arc::new(PgCourierRepository::new(state.db.clone())),
        Arc::new(PgCompanyRepository::new(state.db.clone())),
        Arc::new(PgWooStoreRepository::new(state.db.clone())),
        state.woo.clone(),
    )
}

/// Book a shipment for an order; the AWB is assigned immediately
pub async fn create_shipment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<Shipment>), AppError> {
    validate_body(&body)?;

    let shipment = service(&state).create(auth.scope(), body).await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

pub async fn list_shipments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ShipmentListQuery>,
) -> Result<Json<Paginated<Shipment>>, AppError> {
    let filter = ShipmentFilter {
        company_id: auth.company_filter(query.company_id),
        status: query.status,
        courier_id: query.courier_id,
        order_id: query.order_id,
    };
    Ok(Json(
        service(&state).list(filter, query.pagination()).await?,
    ))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Shipment>, AppError> {
    Ok(Json(service(&state).get(id, auth.scope()).await?))
}

/// Tracking update
pub async fn update_shipment_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateShipmentStatusRequest>,
) -> Result<Json<Shipment>, AppError> {
    Ok(Json(
        service(&state)
            .update_status(id, auth.scope(), body.status)
            .await?,
    ))
}

pub async fn cancel_shipment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Shipment>, AppError> {
    Ok(Json(service(&state).cancel(id, auth.scope()).await?))
}
