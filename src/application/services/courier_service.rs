//! Courier Service
//!
//! Courier partner configuration, serviceability checks and rate quotes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::application::dto::request::{
    CreateCourierRequest, ServiceabilityRequest, UpdateCourierRequest,
};
use crate::domain::services::{RateCalculator, RateQuote};
use crate::domain::{
    is_valid_pincode, Courier, CourierRepository, NonServiceableReason, Parcel, PaymentMode,
    DEFAULT_VOLUMETRIC_DIVISOR,
};
use crate::infrastructure::repositories::PgCourierRepository;
use crate::shared::error::{AppError, FieldError};

static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{1,31}$").expect("Invalid courier code pattern"));

static AWB_PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,4}$").expect("Invalid AWB prefix pattern"));

static PINCODE_PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]{0,5}$").expect("Invalid pincode prefix pattern"));

/// A courier that can take the parcel, with its price.
#[derive(Debug, Clone, Serialize)]
pub struct CourierQuote {
    pub courier_id: Uuid,
    pub courier_name: String,
    pub courier_code: String,
    pub quote: RateQuote,
}

/// A courier that cannot take the parcel.
#[derive(Debug, Clone, Serialize)]
pub struct UnavailableCourier {
    pub courier_id: Uuid,
    pub courier_name: String,
    pub reason: NonServiceableReason,
}

/// Result of a serviceability check across all active couriers.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceabilityResult {
    /// Sorted by total charge, cheapest first.
    pub available: Vec<CourierQuote>,
    pub unavailable: Vec<UnavailableCourier>,
}

/// Courier service trait.
#[async_trait]
pub trait CourierService: Send + Sync {
    async fn create(&self, request: CreateCourierRequest) -> Result<Courier, CourierError>;

    async fn get(&self, id: Uuid) -> Result<Courier, CourierError>;

    async fn list(&self, active_only: bool) -> Result<Vec<Courier>, CourierError>;

    async fn update(&self, id: Uuid, request: UpdateCourierRequest)
        -> Result<Courier, CourierError>;

    async fn deactivate(&self, id: Uuid) -> Result<(), CourierError>;

    async fn serviceability(
        &self,
        request: ServiceabilityRequest,
    ) -> Result<ServiceabilityResult, CourierError>;
}

/// Courier service errors.
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    #[error("Courier not found")]
    NotFound,

    #[error("Courier code already exists")]
    CodeTaken,

    #[error("Invalid courier")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<CourierError> for AppError {
    fn from(err: CourierError) -> Self {
        match err {
            CourierError::NotFound => AppError::NotFound(err.to_string()),
            CourierError::CodeTaken => AppError::Conflict(err.to_string()),
            CourierError::Invalid(errors) => AppError::from_field_errors(errors),
            CourierError::Repository(e) => e,
        }
    }
}

/// Courier service implementation.
pub struct CourierServiceImpl<R: CourierRepository> {
    courier_repo: Arc<R>,
}

impl<R: CourierRepository> CourierServiceImpl<R> {
    pub fn new(courier_repo: Arc<R>) -> Self {
        Self { courier_repo }
    }

    async fn load(&self, id: Uuid) -> Result<Courier, CourierError> {
        self.courier_repo
            .find_by_id(id)
            .await?
            .ok_or(CourierError::NotFound)
    }
}

fn normalize_prefixes(prefixes: Vec<String>) -> Vec<String> {
    let mut prefixes: Vec<String> = prefixes
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    prefixes.sort();
    prefixes.dedup();
    prefixes
}

fn check_rules(courier: &Courier) -> Result<(), CourierError> {
    let mut errors = Vec::new();

    if !CODE_PATTERN.is_match(&courier.code) {
        errors.push(FieldError::new(
            "code",
            "must be 2-32 lowercase letters, digits or '-'",
        ));
    }
    if !AWB_PREFIX_PATTERN.is_match(&courier.awb_prefix) {
        errors.push(FieldError::new("awb_prefix", "must be 2-4 uppercase letters"));
    }
    if let Some(bad) = courier
        .serviceable_prefixes
        .iter()
        .find(|p| !PINCODE_PREFIX_PATTERN.is_match(p))
    {
        errors.push(FieldError::new(
            "serviceable_prefixes",
            format!("'{}' is not a pincode prefix", bad),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CourierError::Invalid(errors))
    }
}

#[async_trait]
impl<R> CourierService for CourierServiceImpl<R>
where
    R: CourierRepository + 'static,
{
    async fn create(&self, request: CreateCourierRequest) -> Result<Courier, CourierError> {
        let now = Utc::now();
        let courier = Courier {
            id: Uuid::now_v7(),
            name: request.name.trim().to_string(),
            code: request.code.trim().to_lowercase(),
            awb_prefix: request.awb_prefix.trim().to_uppercase(),
            supports_cod: request.supports_cod,
            max_weight_grams: request.max_weight_grams,
            serviceable_prefixes: normalize_prefixes(request.serviceable_prefixes),
            base_rate: request.base_rate,
            additional_rate: request.additional_rate,
            cod_charge_percent: request.cod_charge_percent,
            cod_min_charge: request.cod_min_charge,
            volumetric_divisor: request
                .volumetric_divisor
                .unwrap_or(DEFAULT_VOLUMETRIC_DIVISOR),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        check_rules(&courier)?;

        if self.courier_repo.code_exists(&courier.code).await? {
            return Err(CourierError::CodeTaken);
        }

        let created = self.courier_repo.create(&courier).await.map_err(|e| match e {
            AppError::Conflict(_) => CourierError::CodeTaken,
            other => CourierError::Repository(other),
        })?;

        tracing::info!(courier_id = %created.id, code = %created.code, "Courier created");
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Courier, CourierError> {
        self.load(id).await
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Courier>, CourierError> {
        Ok(self.courier_repo.list(active_only).await?)
    }

    async fn update(
        &self,
        id: Uuid,
        request: UpdateCourierRequest,
    ) -> Result<Courier, CourierError> {
        let mut courier = self.load(id).await?;

        if let Some(name) = request.name {
            courier.name = name.trim().to_string();
        }
        if let Some(awb_prefix) = request.awb_prefix {
            courier.awb_prefix = awb_prefix.trim().to_uppercase();
        }
        if let Some(supports_cod) = request.supports_cod {
            courier.supports_cod = supports_cod;
        }
        if let Some(max_weight) = request.max_weight_grams {
            courier.max_weight_grams = max_weight;
        }
        if let Some(prefixes) = request.serviceable_prefixes {
            courier.serviceable_prefixes = normalize_prefixes(prefixes);
        }
        if let Some(base_rate) = request.base_rate {
            courier.base_rate = base_rate;
        }
        if let Some(additional_rate) = request.additional_rate {
            courier.additional_rate = additional_rate;
        }
        if let Some(percent) = request.cod_charge_percent {
            courier.cod_charge_percent = percent;
        }
        if let Some(min_charge) = request.cod_min_charge {
            courier.cod_min_charge = min_charge;
        }
        if let Some(divisor) = request.volumetric_divisor {
            courier.volumetric_divisor = divisor;
        }
        if let Some(is_active) = request.is_active {
            courier.is_active = is_active;
        }
        check_rules(&courier)?;

        courier.updated_at = Utc::now();
        Ok(self.courier_repo.update(&courier).await?)
    }

    async fn deactivate(&self, id: Uuid) -> Result<(), CourierError> {
        self.load(id).await?;
        self.courier_repo.deactivate(id).await?;

        tracing::info!(courier_id = %id, "Courier deactivated");
        Ok(())
    }

    async fn serviceability(
        &self,
        request: ServiceabilityRequest,
    ) -> Result<ServiceabilityResult, CourierError> {
        let pickup = request.pickup_pincode.trim();
        let delivery = request.delivery_pincode.trim();

        let mut errors = Vec::new();
        if !is_valid_pincode(pickup) {
            errors.push(FieldError::new("pickup_pincode", "must be a 6-digit pincode"));
        }
        if !is_valid_pincode(delivery) {
            errors.push(FieldError::new("delivery_pincode", "must be a 6-digit pincode"));
        }
        if !errors.is_empty() {
            return Err(CourierError::Invalid(errors));
        }

        let parcel = Parcel {
            weight_grams: request.weight_grams,
            length_cm: request.length_cm,
            breadth_cm: request.breadth_cm,
            height_cm: request.height_cm,
        };

        let couriers = self.courier_repo.list(true).await?;
        Ok(check_couriers(
            &couriers,
            pickup,
            delivery,
            request.payment_mode,
            &parcel,
            request.cod_amount,
        ))
    }
}

/// Split couriers into priced and unavailable ones.
pub fn check_couriers(
    couriers: &[Courier],
    pickup_pincode: &str,
    delivery_pincode: &str,
    payment_mode: PaymentMode,
    parcel: &Parcel,
    cod_amount: i64,
) -> ServiceabilityResult {
    let mut available = Vec::new();
    let mut unavailable = Vec::new();

    for courier in couriers {
        match courier.check_serviceability(
            pickup_pincode,
            delivery_pincode,
            payment_mode,
            parcel.weight_grams,
        ) {
            Ok(()) => available.push(CourierQuote {
                courier_id: courier.id,
                courier_name: courier.name.clone(),
                courier_code: courier.code.clone(),
                quote: RateCalculator::quote(courier, parcel, payment_mode, cod_amount),
            }),
            Err(reason) => unavailable.push(UnavailableCourier {
                courier_id: courier.id,
                courier_name: courier.name.clone(),
                reason,
            }),
        }
    }

    available.sort_by(|a, b| {
        a.quote
            .total
            .cmp(&b.quote.total)
            .then_with(|| a.courier_name.cmp(&b.courier_name))
    });

    ServiceabilityResult {
        available,
        unavailable,
    }
}

/// Concrete implementation using PostgreSQL repository.
pub type PgCourierService = CourierServiceImpl<PgCourierRepository>;
