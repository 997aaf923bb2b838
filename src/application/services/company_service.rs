//! Company Service
//!
//! Seller onboarding, profile updates and verification status.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::application::dto::request::{CreateCompanyRequest, UpdateCompanyRequest};
use crate::domain::{normalize_phone, Company, CompanyFilter, CompanyRepository, CompanyStatus};
use crate::infrastructure::repositories::PgCompanyRepository;
use crate::shared::error::{AppError, FieldError};
use crate::shared::pagination::{Paginated, Pagination};

static GSTIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{2}[A-Z]{5}\d{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").expect("Invalid GSTIN pattern")
});

/// Whether `gstin` looks like an Indian GST identification number.
pub fn is_valid_gstin(gstin: &str) -> bool {
    gstin.len() == 15 && GSTIN_PATTERN.is_match(gstin)
}

/// Company service trait.
#[async_trait]
pub trait CompanyService: Send + Sync {
    /// Onboard a company; it starts out pending verification.
    async fn create(&self, request: CreateCompanyRequest) -> Result<Company, CompanyError>;

    async fn get(&self, id: Uuid) -> Result<Company, CompanyError>;

    async fn list(
        &self,
        filter: CompanyFilter,
        pagination: Pagination,
    ) -> Result<Paginated<Company>, CompanyError>;

    async fn update(&self, id: Uuid, request: UpdateCompanyRequest)
        -> Result<Company, CompanyError>;

    /// Move the company to `next` if the transition is allowed.
    async fn set_status(&self, id: Uuid, next: CompanyStatus) -> Result<Company, CompanyError>;

    async fn delete(&self, id: Uuid) -> Result<(), CompanyError>;
}

/// Company service errors.
#[derive(Debug, thiserror::Error)]
pub enum CompanyError {
    #[error("Company not found")]
    NotFound,

    #[error("A company with this email already exists")]
    EmailTaken,

    #[error("Cannot change company status from {from} to {to}")]
    InvalidTransition {
        from: CompanyStatus,
        to: CompanyStatus,
    },

    #[error("Invalid company details")]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<CompanyError> for AppError {
    fn from(err: CompanyError) -> Self {
        match err {
            CompanyError::NotFound => AppError::NotFound(err.to_string()),
            CompanyError::EmailTaken | CompanyError::InvalidTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            CompanyError::Invalid(errors) => AppError::from_field_errors(errors),
            CompanyError::Repository(e) => e,
        }
    }
}

/// Company service implementation.
pub struct CompanyServiceImpl<R: CompanyRepository> {
    company_repo: Arc<R>,
}

impl<R: CompanyRepository> CompanyServiceImpl<R> {
    pub fn new(company_repo: Arc<R>) -> Self {
        Self { company_repo }
    }

    async fn load(&self, id: Uuid) -> Result<Company, CompanyError> {
        self.company_repo
            .find_by_id(id)
            .await?
            .filter(|c| !c.is_deleted)
            .ok_or(CompanyError::NotFound)
    }
}

/// Check and normalize the contact fields shared by create and update.
fn normalize_contact(company: &mut Company) -> Result<(), CompanyError> {
    let mut errors = Vec::new();

    company.name = company.name.trim().to_string();
    company.legal_name = company.legal_name.trim().to_string();
    company.email = company.email.trim().to_lowercase();

    match normalize_phone(&company.phone) {
        Some(phone) => company.phone = phone,
        None => errors.push(FieldError::new("phone", "must be a valid 10-digit mobile number")),
    }

    company.gstin = company
        .gstin
        .take()
        .map(|g| g.trim().to_uppercase())
        .filter(|g| !g.is_empty());
    if let Some(gstin) = &company.gstin {
        if !is_valid_gstin(gstin) {
            errors.push(FieldError::new("gstin", "is not a valid GSTIN"));
        }
    }

    if let Err(address_errors) = company.billing_address.validate() {
        errors.extend(address_errors.into_iter().map(|e| {
            FieldError::new(format!("billing_address.{}", e.field), e.message)
        }));
    } else {
        company.billing_address = std::mem::take(&mut company.billing_address).normalize();
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CompanyError::Invalid(errors))
    }
}

#[async_trait]
impl<R> CompanyService for CompanyServiceImpl<R>
where
    R: CompanyRepository + 'static,
{
    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    async fn create(&self, request: CreateCompanyRequest) -> Result<Company, CompanyError> {
        let now = Utc::now();
        let mut company = Company {
            id: Uuid::now_v7(),
            name: request.name,
            legal_name: request.legal_name,
            email: request.email,
            phone: request.phone,
            gstin: request.gstin,
            billing_address: request.billing_address,
            status: CompanyStatus::PendingVerification,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        normalize_contact(&mut company)?;

        if self.company_repo.email_exists(&company.email).await? {
            return Err(CompanyError::EmailTaken);
        }

        let created = self.company_repo.create(&company).await.map_err(|e| match e {
            AppError::Conflict(_) => CompanyError::EmailTaken,
            other => CompanyError::Repository(other),
        })?;

        tracing::info!(company_id = %created.id, "Company onboarded");
        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Company, CompanyError> {
        self.load(id).await
    }

    async fn list(
        &self,
        filter: CompanyFilter,
        pagination: Pagination,
    ) -> Result<Paginated<Company>, CompanyError> {
        let (companies, total) = self.company_repo.list(&filter, pagination).await?;
        Ok(Paginated::new(companies, total, pagination))
    }

    async fn update(
        &self,
        id: Uuid,
        request: UpdateCompanyRequest,
    ) -> Result<Company, CompanyError> {
        let mut company = self.load(id).await?;
        let previous_email = company.email.clone();

        if let Some(name) = request.name {
            company.name = name;
        }
        if let Some(legal_name) = request.legal_name {
            company.legal_name = legal_name;
        }
        if let Some(email) = request.email {
            company.email = email;
        }
        if let Some(phone) = request.phone {
            company.phone = phone;
        }
        if let Some(gstin) = request.gstin {
            company.gstin = Some(gstin);
        }
        if let Some(address) = request.billing_address {
            company.billing_address = address;
        }
        normalize_contact(&mut company)?;

        if company.email != previous_email && self.company_repo.email_exists(&company.email).await?
        {
            return Err(CompanyError::EmailTaken);
        }

        company.updated_at = Utc::now();
        self.company_repo.update(&company).await.map_err(|e| match e {
            AppError::Conflict(_) => CompanyError::EmailTaken,
            other => CompanyError::Repository(other),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn set_status(&self, id: Uuid, next: CompanyStatus) -> Result<Company, CompanyError> {
        let mut company = self.load(id).await?;

        if !company.status.can_transition_to(next) {
            return Err(CompanyError::InvalidTransition {
                from: company.status,
                to: next,
            });
        }

        self.company_repo.update_status(id, next).await?;
        tracing::info!(company_id = %id, from = %company.status, to = %next, "Company status changed");

        company.status = next;
        company.updated_at = Utc::now();
        Ok(company)
    }

    async fn delete(&self, id: Uuid) -> Result<(), CompanyError> {
        self.load(id).await?;
        self.company_repo.soft_delete(id).await?;
        Ok(())
    }
}

/// Concrete implementation using PostgreSQL repository.
pub type PgCompanyService = CompanyServiceImpl<PgCompanyRepository>;
