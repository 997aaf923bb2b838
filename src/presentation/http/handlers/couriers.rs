//! Courier Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{
    CourierListQuery, CreateCourierRequest, ServiceabilityRequest, UpdateCourierRequest,
};
use crate::application::services::{
    CourierService, CourierServiceImpl, PgCourierService, ServiceabilityResult,
};
use crate::domain::Courier;
use crate::infrastructure::repositories::PgCourierRepository;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validate_body;
use crate::startup::AppState;

fn service(state: &AppState) -> PgCourierService {
    CourierServiceImpl::new(Arc::new(PgCourierRepository::new(state.db.clone())))
}

pub async fn create_courier(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateCourierRequest>,
) -> Result<(StatusCode, Json<Courier>), AppError> {
    auth.require_admin()?;
    validate_body(&body)?;

    let courier = service(&state).create(body).await?;
    Ok((StatusCode::CREATED, Json(courier)))
}

/// Sellers only ever see active couriers
pub async fn list_couriers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<CourierListQuery>,
) -> Result<Json<Vec<Courier>>, AppError> {
    let active_only = !(auth.is_admin() && query.include_inactive);
    Ok(Json(service(&state).list(active_only).await?))
}

pub async fn get_courier(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Courier>, AppError> {
    let courier = service(&state).get(id).await?;
    if !courier.is_active && !auth.is_admin() {
        return Err(AppError::NotFound("Courier not found".into()));
    }
    Ok(Json(courier))
}

pub async fn update_courier(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCourierRequest>,
) -> Result<Json<Courier>, AppError> {
    auth.require_admin()?;
    validate_body(&body)?;

    Ok(Json(service(&state).update(id, body).await?))
}

pub async fn deactivate_courier(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    service(&state).deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Couriers able to carry a parcel, cheapest first
pub async fn check_serviceability(
    State(state): State<AppState>,
    Json(body): Json<ServiceabilityRequest>,
) -> Result<Json<ServiceabilityResult>, AppError> {
    validate_body(&body)?;
    Ok(Json(service(&state).serviceability(body).await?))
}
