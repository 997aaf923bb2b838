//! Company Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::application::dto::request::{
    CompanyListQuery, CreateCompanyRequest, UpdateCompanyRequest,
};
use crate::application::services::{CompanyService, CompanyServiceImpl, PgCompanyService};
use crate::domain::{Company, CompanyFilter, CompanyStatus};
use crate::infrastructure::repositories::PgCompanyRepository;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::pagination::Paginated;
use crate::shared::validation::validate_body;
use crate::startup::AppState;

fn service(state: &AppState) -> PgCompanyService {
    CompanyServiceImpl::new(Arc::new(PgCompanyRepository::new(state.db.clone())))
}

/// Onboard a company
pub async fn create_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    auth.require_admin()?;
    validate_body(&body)?;

    let company = service(&state).create(body).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn list_companies(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<CompanyListQuery>,
) -> Result<Json<Paginated<Company>>, AppError> {
    auth.require_admin()?;

    let filter = CompanyFilter {
        search: query.search.clone(),
        status: query.status,
    };
    let page = service(&state).list(filter, query.pagination()).await?;
    Ok(Json(page))
}

/// Admins read any company, sellers their own
pub async fn get_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    auth.require_company(id)?;
    Ok(Json(service(&state).get(id).await?))
}

pub async fn update_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCompanyRequest>,
) -> Result<Json<Company>, AppError> {
    auth.require_admin()?;
    validate_body(&body)?;

    Ok(Json(service(&state).update(id, body).await?))
}

/// Soft delete
pub async fn delete_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.require_admin()?;
    service(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    auth.require_admin()?;
    Ok(Json(
        service(&state).set_status(id, CompanyStatus::Active).await?,
    ))
}

pub async fn suspend_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    auth.require_admin()?;
    Ok(Json(
        service(&state).set_status(id, CompanyStatus::Suspended).await?,
    ))
}
