//! Coupon Service
//!
//! Promo code administration, evaluation and redemption.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::application::dto::request::{CreateCouponRequest, UpdateCouponRequest};
use crate::domain::{
    AppliedDiscount, DiscountType, PromoCode, PromoCodeFilter, PromoCodeRepository, RejectReason,
};
use crate::infrastructure::repositories::PgPromoCodeRepository;
use crate::shared::error::{AppError, FieldError};
use crate::shared::pagination::{Paginated, Pagination};

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9_-]{4,20}$").expect("Invalid coupon code pattern"));

/// Coupon service trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CouponService: Send + Sync {
    async fn create(&self, request: CreateCouponRequest) -> Result<PromoCode, CouponError>;

    async fn get(&self, id: Uuid) -> Result<PromoCode, CouponError>;

    async fn list(
        &self,
        filter: PromoCodeFilter,
        pagination: Pagination,
    ) -> Result<Paginated<PromoCode>, CouponError>;

    async fn update(&self, id: Uuid, request: UpdateCouponRequest)
        -> Result<PromoCode, CouponError>;

    async fn deactivate(&self, id: Uuid) -> Result<PromoCode, CouponError>;

    /// Price an order with a coupon without consuming it.
    async fn evaluate(
        &self,
        code: &str,
        company_id: Option<Uuid>,
        order_value: i64,
    ) -> Result<AppliedDiscount, CouponError>;

    /// Evaluate and consume one use of the coupon.
    async fn redeem(
        &self,
        code: &str,
        company_id: Option<Uuid>,
        order_value: i64,
    ) -> Result<AppliedDiscount, CouponError>;
}

/// Coupon service errors.
#[derive(Debug, thiserror::Error)]
pub enum CouponError {
    #[error("Coupon not found")]
    NotFound,

    #[error("Coupon code already exists")]
    CodeTaken,

    #[error("{0}")]
    Rejected(RejectReason),

    #[error("Invalid coupon")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<CouponError> for AppError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::NotFound => AppError::NotFound(err.to_string()),
            CouponError::CodeTaken => AppError::Conflict(err.to_string()),
            CouponError::Rejected(RejectReason::NotFound) => AppError::NotFound(err.to_string()),
            CouponError::Rejected(reason) => AppError::Unprocessable(reason.to_string()),
            CouponError::Invalid(errors) => AppError::from_field_errors(errors),
            CouponError::Repository(e) => e,
        }
    }
}

/// Coupon service implementation.
pub struct CouponServiceImpl<R: PromoCodeRepository> {
    promo_repo: Arc<R>,
}

impl<R: PromoCodeRepository> CouponServiceImpl<R> {
    pub fn new(promo_repo: Arc<R>) -> Self {
        Self { promo_repo }
    }

    async fn load(&self, id: Uuid) -> Result<PromoCode, CouponError> {
        self.promo_repo
            .find_by_id(id)
            .await?
            .ok_or(CouponError::NotFound)
    }

    async fn find_code(&self, code: &str) -> Result<PromoCode, CouponError> {
        self.promo_repo
            .find_by_code(&PromoCode::normalize_code(code))
            .await?
            .ok_or(CouponError::Rejected(RejectReason::NotFound))
    }
}

/// Rules that must hold for every stored coupon.
fn check_rules(promo: &PromoCode) -> Result<(), CouponError> {
    let mut errors = Vec::new();

    if !CODE_PATTERN.is_match(&promo.code) {
        errors.push(FieldError::new(
            "code",
            "must be 4-20 characters of A-Z, 0-9, '_' or '-'",
        ));
    }
    match promo.discount_type {
        DiscountType::Percentage if !(1..=100).contains(&promo.discount_value) => {
            errors.push(FieldError::new("discount_value", "percentage must be 1-100"));
        }
        DiscountType::Flat if promo.discount_value <= 0 => {
            errors.push(FieldError::new("discount_value", "must be positive"));
        }
        _ => {}
    }
    if matches!(promo.valid_until, Some(until) if until <= promo.valid_from) {
        errors.push(FieldError::new("valid_until", "must be after valid_from"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CouponError::Invalid(errors))
    }
}

#[async_trait]
impl<R> CouponService for CouponServiceImpl<R>
where
    R: PromoCodeRepository + 'static,
{
    async fn create(&self, request: CreateCouponRequest) -> Result<PromoCode, CouponError> {
        let now = Utc::now();
        let promo = PromoCode {
            id: Uuid::now_v7(),
            code: PromoCode::normalize_code(&request.code),
            description: request.description,
            discount_type: request.discount_type,
            discount_value: request.discount_value,
            max_discount: request.max_discount,
            min_order_value: request.min_order_value,
            usage_limit: request.usage_limit,
            used_count: 0,
            company_id: request.company_id,
            valid_from: request.valid_from.unwrap_or(now),
            valid_until: request.valid_until,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        check_rules(&promo)?;

        if self.promo_repo.code_exists(&promo.code).await? {
            return Err(CouponError::CodeTaken);
        }

        let created = self.promo_repo.create(&promo).await.map_err(|e| match e {
            AppError::Conflict(_) => CouponError::CodeTaken,
            other => CouponError::Repository(other),
        })?;

        tracing::info!(coupon_id = %created.id, code = %created.code, "Coupon created");
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<PromoCode, CouponError> {
        self.load(id).await
    }

    async fn list(
        &self,
        filter: PromoCodeFilter,
        pagination: Pagination,
    ) -> Result<Paginated<PromoCode>, CouponError> {
        let (promos, total) = self.promo_repo.list(&filter, pagination).await?;
        Ok(Paginated::new(promos, total, pagination))
    }

    async fn update(
        &self,
        id: Uuid,
        request: UpdateCouponRequest,
    ) -> Result<PromoCode, CouponError> {
        let mut promo = self.load(id).await?;

        if let Some(description) = request.description {
            promo.description = Some(description);
        }
        if let Some(max_discount) = request.max_discount {
            promo.max_discount = Some(max_discount);
        }
        if let Some(min_order_value) = request.min_order_value {
            promo.min_order_value = min_order_value;
        }
        if let Some(usage_limit) = request.usage_limit {
            promo.usage_limit = Some(usage_limit);
        }
        if let Some(valid_until) = request.valid_until {
            promo.valid_until = Some(valid_until);
        }
        if let Some(is_active) = request.is_active {
            promo.is_active = is_active;
        }
        check_rules(&promo)?;

        promo.updated_at = Utc::now();
        Ok(self.promo_repo.update(&promo).await?)
    }

    async fn deactivate(&self, id: Uuid) -> Result<PromoCode, CouponError> {
        let mut promo = self.load(id).await?;
        if !promo.is_active {
            return Ok(promo);
        }

        promo.is_active = false;
        promo.updated_at = Utc::now();
        Ok(self.promo_repo.update(&promo).await?)
    }

    async fn evaluate(
        &self,
        code: &str,
        company_id: Option<Uuid>,
        order_value: i64,
    ) -> Result<AppliedDiscount, CouponError> {
        let promo = self.find_code(code).await?;
        promo
            .evaluate(company_id, order_value, Utc::now())
            .map_err(CouponError::Rejected)
    }

    #[tracing::instrument(skip(self))]
    async fn redeem(
        &self,
        code: &str,
        company_id: Option<Uuid>,
        order_value: i64,
    ) -> Result<AppliedDiscount, CouponError> {
        let promo = self.find_code(code).await?;
        let applied = promo
            .evaluate(company_id, order_value, Utc::now())
            .map_err(CouponError::Rejected)?;

        // The conditional increment loses against a concurrent last use.
        if !self.promo_repo.try_increment_usage(promo.id).await? {
            return Err(CouponError::Rejected(RejectReason::UsageExhausted));
        }

        tracing::info!(coupon_id = %promo.id, discount = applied.discount, "Coupon redeemed");
        Ok(applied)
    }
}

/// Concrete implementation using PostgreSQL repository.
pub type PgCouponService = CouponServiceImpl<PgPromoCodeRepository>;
