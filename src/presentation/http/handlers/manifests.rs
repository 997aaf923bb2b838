//! Manifest Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{
    CloseManifestRequest, CreateManifestRequest, ManifestListQuery, ManifestShipmentsRequest,
};
use crate::application::dto::response::ManifestResponse;
use crate::application::services::{ManifestService, ManifestServiceImpl, PgManifestService};
use crate::domain::ManifestFilter;
use crate::infrastructure::repositories::{
    PgCourierRepository, PgManifestRepository, PgShipmentRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::Paginated;
use crate::shared::validation::validate_body;
use crate::startup::AppState;

fn service(state: &AppState) -> PgManifestService {
    ManifestServiceImpl::new(
        Arc::new(PgManifestRepository::new(state.db.clone())),
        Arc::new(PgShipmentRepository::new(state.db.clone())),
        Arc::new(PgCourierRepository::new(state.db.clone())),
    )
}

pub async fn create_manifest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(mut body): Json<CreateManifestRequest>,
) -> Result<(StatusCode, Json<ManifestResponse>), AppError> {
    body.company_id = Some(auth.company_for(body.company_id)?);

    let manifest = service(&state).create(auth.scope(), body).await?;
    Ok((StatusCode::CREATED, Json(manifest.into())))
}

pub async fn list_manifests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ManifestListQuery>,
) -> Result<Json<Paginated<ManifestResponse>>, AppError> {
    let filter = ManifestFilter {
        company_id: auth.company_filter(query.company_id),
        courier_id: query.courier_id,
        status: query.status,
    };
    let page = service(&state).list(filter, query.pagination()).await?;
    Ok(Json(page.map(ManifestResponse::from)))
}

/// Manifest with the ids of its shipments
pub async fn get_manifest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ManifestResponse>, AppError> {
    let details = service(&state).get(id, auth.scope()).await?;
    Ok(Json(details.into()))
}

/// Add shipments; all or nothing
pub async fn add_shipments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<ManifestShipmentsRequest>,
) -> Result<Json<ManifestResponse>, AppError> {
    validate_body(&body)?;

    let manifest = service(&state)
        .add_shipments(id, auth.scope(), body.shipment_ids)
        .await?;
    Ok(Json(manifest.into()))
}

pub async fn remove_shipment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((id, shipment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ManifestResponse>, AppError> {
    let manifest = service(&state)
        .remove_shipment(id, auth.scope(), shipment_id)
        .await?;
    Ok(Json(manifest.into()))
}

/// Close for pickup, `?pickup_date=YYYY-MM-DD` (defaults to today)
pub async fn close_manifest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<CloseManifestRequest>,
) -> Result<Json<ManifestResponse>, AppError> {
    let manifest = service(&state)
        .close(id, auth.scope(), query.pickup_date)
        .await?;
    Ok(Json(manifest.into()))
}

pub async fn mark_picked_up(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ManifestResponse>, AppError> {
    let manifest = service(&state).mark_picked_up(id, auth.scope()).await?;
    Ok(Json(manifest.into()))
}

pub async fn cancel_manifest(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ManifestResponse>, AppError> {
    let manifest = service(&state).cancel(id, auth.scope()).await?;
    Ok(Json(manifest.into()))
}
