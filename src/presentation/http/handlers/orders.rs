//! Order Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{CreateOrderRequest, OrderListQuery};
use crate::application::services::{
    CouponServiceImpl, OrderService, OrderServiceImpl, PgOrderService,
};
use crate::domain::{Order, OrderFilter};
use crate::infrastructure::repositories::{
    PgCompanyRepository, PgOrderRepository, PgPromoCodeRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::Paginated;
use crate::shared::validation::validate_body;
use crate::startup::AppState;

fn service(state: &AppState) -> PgOrderService {
    let coupons = CouponServiceImpl::new(Arc::new(PgPromoCodeRepository::new(state.db.clone())));
    OrderServiceImpl::new(
        Arc::new(PgOrderRepository::new(state.db.clone())),
        Arc::new(PgCompanyRepository::new(state.db.clone())),
        Arc::new(coupons),
    )
}

/// Manual order entry
pub async fn create_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    validate_body(&body)?;
    if let (Some(own), Some(requested)) = (auth.scope(), body.company_id) {
        if own != requested {
            return Err(AppError::Forbidden(
                "Sellers can only create orders for their own company".into(),
            ));
        }
    }

    let order = service(&state).create(auth.scope(), body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Paginated<Order>>, AppError> {
    let filter = OrderFilter {
        company_id: auth.company_filter(query.company_id),
        status: query.status,
        channel: query.channel,
        store_id: query.store_id,
    };
    Ok(Json(
        service(&state).list(filter, query.pagination()).await?,
    ))
}

pub async fn get_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(service(&state).get(id, auth.scope()).await?))
}
