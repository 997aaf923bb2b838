//! Company (tenant) entity and repository trait.
//!
//! Maps to the `companies` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Address;
use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

/// Onboarding status matching the database TEXT constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    #[default]
    PendingVerification,
    Active,
    Suspended,
}

impl CompanyStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "active" => Self::Active,
            "suspended" => Self::Suspended,
            _ => Self::PendingVerification,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingVerification => "pending_verification",
            Self::Active => "active",
            Self::Suspended => "suspended",
        }
    }

    /// Allowed onboarding transitions.
    pub fn can_transition_to(&self, next: CompanyStatus) -> bool {
        matches!(
            (self, next),
            (Self::PendingVerification, Self::Active)
                | (Self::Active, Self::Suspended)
                | (Self::Suspended, Self::Active)
        )
    }
}

impl std::fmt::Display for CompanyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A seller company onboarded onto the platform.
///
/// Maps to the `companies` table:
/// - id: UUID PRIMARY KEY
/// - name: TEXT NOT NULL
/// - legal_name: TEXT NOT NULL
/// - email: TEXT NOT NULL (unique among non-deleted rows)
/// - phone: TEXT NOT NULL
/// - gstin: TEXT NULL
/// - billing_address: JSONB NOT NULL
/// - status: TEXT NOT NULL DEFAULT 'pending_verification'
/// - is_deleted: BOOLEAN NOT NULL DEFAULT FALSE
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub legal_name: String,
    pub email: String,
    pub phone: String,
    pub gstin: Option<String>,
    pub billing_address: Address,
    pub status: CompanyStatus,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Only active companies may create shipments.
    pub fn is_active(&self) -> bool {
        self.status == CompanyStatus::Active && !self.is_deleted
    }
}

/// Filters for listing companies.
#[derive(Debug, Clone, Default)]
pub struct CompanyFilter {
    /// Case-insensitive match on name or email.
    pub search: Option<String>,
    pub status: Option<CompanyStatus>,
}

/// Repository trait for Company data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Find a non-deleted company by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, AppError>;

    /// Whether a non-deleted company already uses this email.
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    async fn create(&self, company: &Company) -> Result<Company, AppError>;

    async fn update(&self, company: &Company) -> Result<Company, AppError>;

    /// Page through non-deleted companies, newest first.
    async fn list(
        &self,
        filter: &CompanyFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Company>, i64), AppError>;

    async fn update_status(&self, id: Uuid, status: CompanyStatus) -> Result<(), AppError>;

    async fn soft_delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            CompanyStatus::PendingVerification,
            CompanyStatus::Active,
            CompanyStatus::Suspended,
        ] {
            assert_eq!(CompanyStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn status_transitions() {
        use CompanyStatus::*;
        assert!(PendingVerification.can_transition_to(Active));
        assert!(Active.can_transition_to(Suspended));
        assert!(Suspended.can_transition_to(Active));

        assert!(!PendingVerification.can_transition_to(Suspended));
        assert!(!Active.can_transition_to(Active));
        assert!(!Suspended.can_transition_to(PendingVerification));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&CompanyStatus::PendingVerification).unwrap();
        assert_eq!(json, "\"pending_verification\"");
    }
}
