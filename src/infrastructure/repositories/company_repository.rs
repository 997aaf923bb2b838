//! Company Repository Implementation
//!
//! PostgreSQL implementation of the CompanyRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Address, Company, CompanyFilter, CompanyRepository, CompanyStatus};
use crate::infrastructure::database::map_write_error;
use crate::shared::error::AppError;
use crate::shared::pagination::Pagination;

const COLUMNS: &str = "id, name, legal_name, email, phone, gstin, billing_address, status, \
                       is_deleted, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    legal_name: String,
    email: String,
    phone: String,
    gstin: Option<String>,
    billing_address: Json<Address>,
    status: String,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_company(self) -> Company {
        Company {
            id: self.id,
            name: self.name,
            legal_name: self.legal_name,
            email: self.email,
            phone: self.phone,
            gstin: self.gstin,
            billing_address: self.billing_address.0,
            status: CompanyStatus::from_str(&self.status),
            is_deleted: self.is_deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL company repository implementation.
#[derive(Clone)]
pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Company>, AppError> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {COLUMNS} FROM companies WHERE id = $1 AND NOT is_deleted"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CompanyRow::into_company))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM companies WHERE LOWER(email) = LOWER($1) AND NOT is_deleted)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, company: &Company) -> Result<Company, AppError> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            r#"
            INSERT INTO companies (id, name, legal_name, email, phone, gstin, billing_address, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(company.id)
        .bind(&company.name)
        .bind(&company.legal_name)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(&company.gstin)
        .bind(Json(&company.billing_address))
        .bind(company.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Company with this email already exists"))?;

        Ok(row.into_company())
    }

    async fn update(&self, company: &Company) -> Result<Company, AppError> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            r#"
            UPDATE companies
            SET name = $2,
                legal_name = $3,
                email = $4,
                phone = $5,
                gstin = $6,
                billing_address = $7,
                updated_at = NOW()
            WHERE id = $1 AND NOT is_deleted
            RETURNING {COLUMNS}
            "#
        ))
        .bind(company.id)
        .bind(&company.name)
        .bind(&company.legal_name)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(&company.gstin)
        .bind(Json(&company.billing_address))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Company with this email already exists"))?
        .ok_or_else(|| AppError::NotFound(format!("Company {} not found", company.id)))?;

        Ok(row.into_company())
    }

    async fn list(
        &self,
        filter: &CompanyFilter,
        pagination: Pagination,
    ) -> Result<(Vec<Company>, i64), AppError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));
        let status = filter.status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, CompanyRow>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM companies
            WHERE NOT is_deleted
              AND ($1::TEXT IS NULL OR LOWER(name) LIKE $1 OR LOWER(email) LIKE $1)
              AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&search)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM companies
            WHERE NOT is_deleted
              AND ($1::TEXT IS NULL OR LOWER(name) LIKE $1 OR LOWER(email) LIKE $1)
              AND ($2::TEXT IS NULL OR status = $2)
            "#,
        )
        .bind(&search)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(CompanyRow::into_company).collect(), total))
    }

    async fn update_status(&self, id: Uuid, status: CompanyStatus) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE companies SET status = $2, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Company {} not found", id)));
        }

        Ok(())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE companies SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Company {} not found", id)));
        }

        Ok(())
    }
}
