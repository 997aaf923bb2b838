//! Coupon Handlers
//!
//! Admins manage every code; sellers manage codes scoped to their own
//! company and can use global ones.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{
    CouponListQuery, CreateCouponRequest, RedeemCouponRequest, UpdateCouponRequest,
    ValidateCouponRequest,
};
use crate::application::dto::response::CouponValidationResponse;
use crate::application::services::{
    CouponError, CouponService, CouponServiceImpl, PgCouponService,
};
use crate::domain::{AppliedDiscount, PromoCode, PromoCodeFilter};
use crate::infrastructure::repositories::PgPromoCodeRepository;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::Paginated;
use crate::shared::validation::validate_body;
use crate::startup::AppState;

fn service(state: &AppState) -> PgCouponService {
    CouponServiceImpl::new(Arc::new(PgPromoCodeRepository::new(state.db.clone())))
}

/// Sellers may only touch codes owned by their company.
fn check_owner(auth: &AuthUser, coupon: &PromoCode) -> Result<(), AppError> {
    match (auth.scope(), coupon.company_id) {
        (None, _) => Ok(()),
        (Some(own), Some(owner)) if own == owner => Ok(()),
        _ => Err(AppError::Forbidden(
            "Coupon belongs to another company".into(),
        )),
    }
}

pub async fn create_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(mut body): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<PromoCode>), AppError> {
    validate_body(&body)?;
    if !auth.is_admin() {
        body.company_id = Some(auth.company_for(body.company_id)?);
    }

    let coupon = service(&state).create(body).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// Sellers see their own codes plus global ones
pub async fn list_coupons(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<CouponListQuery>,
) -> Result<Json<Paginated<PromoCode>>, AppError> {
    let filter = PromoCodeFilter {
        company_id: auth.company_filter(query.company_id),
        active_only: query.active_only,
    };
    Ok(Json(
        service(&state).list(filter, query.pagination()).await?,
    ))
}

pub async fn get_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PromoCode>, AppError> {
    let coupon = service(&state).get(id).await?;
    if coupon.company_id.is_some() {
        check_owner(&auth, &coupon)?;
    }
    Ok(Json(coupon))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCouponRequest>,
) -> Result<Json<PromoCode>, AppError> {
    validate_body(&body)?;
    let service = service(&state);
    check_owner(&auth, &service.get(id).await?)?;

    Ok(Json(service.update(id, body).await?))
}

/// Soft delete: the code stops applying but stays for reporting
pub async fn deactivate_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PromoCode>, AppError> {
    let service = service(&state);
    check_owner(&auth, &service.get(id).await?)?;

    Ok(Json(service.deactivate(id).await?))
}

/// Price an order with a code without consuming it
pub async fn validate_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<ValidateCouponRequest>,
) -> Result<Json<CouponValidationResponse>, AppError> {
    validate_body(&body)?;
    let company_id = auth.company_filter(body.company_id);
    let code = PromoCode::normalize_code(&body.code);

    match service(&state)
        .evaluate(&code, company_id, body.order_value)
        .await
    {
        Ok(applied) => Ok(Json(CouponValidationResponse::accepted(code, applied))),
        Err(CouponError::Rejected(reason)) => {
            Ok(Json(CouponValidationResponse::rejected(code, reason)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Consume one use of a code
pub async fn redeem_coupon(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(code): Path<String>,
    Json(body): Json<RedeemCouponRequest>,
) -> Result<Json<AppliedDiscount>, AppError> {
    validate_body(&body)?;
    let company_id = auth.company_filter(body.company_id);

    let applied = service(&state)
        .redeem(&PromoCode::normalize_code(&code), company_id, body.order_value)
        .await?;
    Ok(Json(applied))
}
