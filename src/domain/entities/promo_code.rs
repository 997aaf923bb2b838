//! Promo code (coupon) entity and repository trait.
//!
//! Maps to the `promo_codes` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

/// How the discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discount_value` is a whole percentage (1..=100).
    Percentage,
    /// `discount_value` is an amount in paise.
    Flat,
}

impl DiscountType {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "flat" => Self::Flat,
            _ => Self::Percentage,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Flat => "flat",
        }
    }
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a code cannot be applied to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotFound,
    Inactive,
    NotYetValid,
    Expired,
    UsageExhausted,
    BelowMinimum,
    WrongCompany,
}

impl RejectReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "Coupon not found",
            Self::Inactive => "Coupon is no longer active",
            Self::NotYetValid => "Coupon is not valid yet",
            Self::Expired => "Coupon has expired",
            Self::UsageExhausted => "Coupon usage limit reached",
            Self::BelowMinimum => "Order value is below the coupon minimum",
            Self::WrongCompany => "Coupon is not available for this company",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of applying a code to an order value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AppliedDiscount {
    pub discount: i64,
    pub final_amount: i64,
}

/// A discount code, global or scoped to one company.
///
/// Maps to the `promo_codes` table:
/// - id: UUID PRIMARY KEY
/// - code: TEXT NOT NULL UNIQUE (upper case)
/// - description: TEXT NULL
/// - discount_type: TEXT NOT NULL ('percentage' | 'flat')
/// - discount_value: BIGINT NOT NULL
/// - max_discount: BIGINT NULL (paise)
/// - min_order_value: BIGINT NOT NULL DEFAULT 0 (paise)
/// - usage_limit: INTEGER NULL (NULL = unlimited)
/// - used_count: INTEGER NOT NULL DEFAULT 0
/// - company_id: UUID NULL REFERENCES companies(id) (NULL = global)
/// - valid_from: TIMESTAMPTZ NOT NULL
/// - valid_until: TIMESTAMPTZ NULL
/// - is_active: BOOLEAN NOT NULL DEFAULT TRUE
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub max_discount: Option<i64>,
    pub min_order_value: i64,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub company_id: Option<Uuid>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PromoCode {
    /// Canonical form of a user-entered code.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_uppercase()
    }

    pub fn is_usage_exhausted(&self) -> bool {
        matches!(self.usage_limit, Some(limit) if self.used_count >= limit)
    }

    /// Discount this code grants on `order_value`, ignoring eligibility.
    pub fn discount_for(&self, order_value: i64) -> i64 {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let raw = order_value as i128 * self.discount_value as i128 / 100;
                raw.clamp(i64::MIN as i128, i64::MAX as i128) as i64
            }
            DiscountType::Flat => self.discount_value,
        };
        let capped = match self.max_discount {
            Some(max) => raw.min(max),
            None => raw,
        };
        capped.clamp(0, order_value.max(0))
    }

    /// Check eligibility and compute the discount.
    ///
    /// Checks run in a fixed order so the first failing rule is reported.
    pub fn evaluate(
        &self,
        company_id: Option<Uuid>,
        order_value: i64,
        now: DateTime<Utc>,
    ) -> Result<AppliedDiscount, RejectReason> {
        if !self.is_active {
            return Err(RejectReason::Inactive);
        }
        if let Some(owner) = self.company_id {
            if company_id != Some(owner) {
                return Err(RejectReason::WrongCompany);
            }
        }
        if now < self.valid_from {
            return Err(RejectReason::NotYetValid);
        }
        if matches!(self.valid_until, Some(until) if now > until) {
            return Err(RejectReason::Expired);
        }
        if self.is_usage_exhausted() {
            return Err(RejectReason::UsageExhausted);
        }
        if order_value < self.min_order_value {
            return Err(RejectReason::BelowMinimum);
        }

        let discount = self.discount_for(order_value);
        Ok(AppliedDiscount {
            discount,
            final_amount: order_value - discount,
        })
    }
}

/// Filters for listing promo codes.
#[derive(Debug, Clone, Default)]
pub struct PromoCodeFilter {
    /// Restrict to codes usable by this company (its own plus global ones).
    pub company_id: Option<Uuid>,
    pub active_only: bool,
}

/// Repository trait for PromoCode data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PromoCodeRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PromoCode>, AppError>;

    /// Look up by normalized (upper case) code.
    async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, AppError>;

    async fn code_exists(&self, code: &str) -> Result<bool, AppError>;

    async fn create(&self, promo: &PromoCode) -> Result<PromoCode, AppError>;

    async fn update(&self, promo: &PromoCode) -> Result<PromoCode, AppError>;

    async fn list(
        &self,
        filter: &PromoCodeFilter,
        pagination: Pagination,
    ) -> Result<(Vec<PromoCode>, i64), AppError>;

    /// Increment `used_count` unless the usage limit has been reached.
    ///
    /// Returns false when the conditional update matched no row.
    async fn try_increment_usage(&self, id: Uuid) -> Result<bool, AppError>;
}
