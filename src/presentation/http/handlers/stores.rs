//! WooCommerce Store Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{
    ConnectStoreRequest, StoreListQuery, SyncStoreQuery, UpdateMappingRequest,
};
use crate::application::dto::response::{ConnectStoreResponse, StoreResponse};
use crate::application::services::woocommerce::{
    OrderSyncService, OrderSyncServiceImpl, PgOrderSyncService, PgStoreService,
    ProductSyncReport, StoreService, StoreServiceImpl, SyncReport,
};
use crate::domain::WooCommerceProductMapping;
use crate::infrastructure::repositories::{
    PgCompanyRepository, PgOrderRepository, PgProductMappingRepository, PgShipmentRepository,
    PgWooStoreRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validate_body;
use crate::startup::AppState;

fn store_service(state: &AppState) -> PgStoreService {
    StoreServiceImpl::new(
        Arc::new(PgWooStoreRepository::new(state.db.clone())),
        Arc::new(PgProductMappingRepository::new(state.db.clone())),
        Arc::new(PgCompanyRepository::new(state.db.clone())),
        state.woo.clone(),
        state.settings.woocommerce.clone(),
    )
}

/// Shared with the webhook worker started in `startup`.
pub fn sync_service(state: &AppState) -> PgOrderSyncService {
    OrderSyncServiceImpl::new(
        Arc::new(PgWooStoreRepository::new(state.db.clone())),
        Arc::new(PgOrderRepository::new(state.db.clone())),
        Arc::new(PgProductMappingRepository::new(state.db.clone())),
        Arc::new(PgShipmentRepository::new(state.db.clone())),
        state.woo.clone(),
        state.settings.woocommerce.clone(),
    )
}

/// Verify credentials and connect a store
pub async fn connect_store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(mut body): Json<ConnectStoreRequest>,
) -> Result<(StatusCode, Json<ConnectStoreResponse>), AppError> {
    validate_body(&body)?;
    body.company_id = Some(auth.company_for(body.company_id)?);

    let store = store_service(&state).connect(auth.scope(), body).await?;
    Ok((StatusCode::CREATED, Json(store.into())))
}

pub async fn list_stores(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<StoreListQuery>,
) -> Result<Json<Vec<StoreResponse>>, AppError> {
    let company_id = auth.company_for(query.company_id)?;

    let stores = store_service(&state).list(company_id).await?;
    Ok(Json(stores.into_iter().map(StoreResponse::from).collect()))
}

pub async fn get_store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoreResponse>, AppError> {
    let store = store_service(&state).get(id, auth.scope()).await?;
    Ok(Json(store.into()))
}

/// Soft disconnect; synced orders stay
pub async fn disconnect_store(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    store_service(&state).disconnect(id, auth.scope()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pull orders, `?mode=full|incremental`
pub async fn sync_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<SyncStoreQuery>,
) -> Result<Json<SyncReport>, AppError> {
    let report = sync_service(&state)
        .sync_store(id, auth.scope(), query.mode)
        .await?;
    Ok(Json(report))
}

pub async fn sync_products(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductSyncReport>, AppError> {
    Ok(Json(
        store_service(&state).sync_products(id, auth.scope()).await?,
    ))
}

pub async fn list_mappings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<WooCommerceProductMapping>>, AppError> {
    Ok(Json(
        store_service(&state).list_mappings(id, auth.scope()).await?,
    ))
}

/// Manual weight and dimensions for a product
pub async fn update_mapping(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((id, mapping_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateMappingRequest>,
) -> Result<Json<WooCommerceProductMapping>, AppError> {
    validate_body(&body)?;

    let mapping = store_service(&state)
        .update_mapping(id, auth.scope(), mapping_id, body)
        .await?;
    Ok(Json(mapping))
}
