//! Authentication Middleware
//!
//! JWT validation for protected routes. Tokens are issued by the identity
//! service; this service only verifies them.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;
use crate::startup::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Seller,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID in the identity service)
    pub sub: String,
    pub role: Role,
    /// Company a seller belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Authenticated caller extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
    pub role: Role,
    pub company_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".into()))
        }
    }

    /// Company restriction for queries: none for admins.
    pub fn scope(&self) -> Option<Uuid> {
        match self.role {
            Role::Admin => None,
            Role::Seller => self.company_id,
        }
    }

    /// Company filter for list endpoints.
    ///
    /// Sellers always see their own company; admins may narrow by query.
    pub fn company_filter(&self, requested: Option<Uuid>) -> Option<Uuid> {
        self.scope().or(requested)
    }

    /// Company a write acts on.
    pub fn company_for(&self, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        match (self.role, self.company_id, requested) {
            (Role::Seller, Some(own), Some(other)) if own != other => Err(AppError::Forbidden(
                "Sellers can only act on their own company".into(),
            )),
            (Role::Seller, Some(own), _) => Ok(own),
            (Role::Admin, _, Some(company)) => Ok(company),
            _ => Err(AppError::BadRequest("company_id is required".into())),
        }
    }

    /// Sellers may only read their own company.
    pub fn require_company(&self, company_id: Uuid) -> Result<(), AppError> {
        match self.scope() {
            Some(own) if own != company_id => {
                Err(AppError::Forbidden("Access to this company is not allowed".into()))
            }
            _ => Ok(()),
        }
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.role == Role::Seller && claims.company_id.is_none() {
            return Err(AppError::Unauthorized("Seller token without company".into()));
        }
        Ok(Self {
            subject: claims.sub,
            role: claims.role,
            company_id: claims.company_id,
        })
    }
}

/// Decode and validate an HS256 token.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".into())
        }
        _ => AppError::Unauthorized("Invalid token".into()),
    })
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))?;

    let claims = decode_token(token, &state.settings.jwt.secret)?;
    let user = AuthUser::try_from(claims)?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    fn token(role: Role, company_id: Option<Uuid>, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".into(),
            role,
            company_id,
            exp: now + exp_offset,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn seller(company: Uuid) -> AuthUser {
        AuthUser {
            subject: "u".into(),
            role: Role::Seller,
            company_id: Some(company),
        }
    }

    fn admin() -> AuthUser {
        AuthUser {
            subject: "a".into(),
            role: Role::Admin,
            company_id: None,
        }
    }

    #[test]
    fn decodes_valid_token() {
        let company = Uuid::now_v7();
        let claims = decode_token(&token(Role::Seller, Some(company), 600), SECRET).unwrap();
        assert_eq!(claims.role, Role::Seller);
        assert_eq!(claims.company_id, Some(company));
    }

    #[test]
    fn rejects_expired_and_foreign_tokens() {
        let expired = decode_token(&token(Role::Admin, None, -3600), SECRET).unwrap_err();
        assert!(matches!(expired, AppError::Unauthorized(m) if m == "Token expired"));

        let foreign = decode_token(&token(Role::Admin, None, 600), "another-secret").unwrap_err();
        assert!(matches!(foreign, AppError::Unauthorized(_)));
    }

    #[test]
    fn seller_token_needs_company() {
        let claims = decode_token(&token(Role::Seller, None, 600), SECRET).unwrap();
        assert!(AuthUser::try_from(claims).is_err());
    }

    #[test]
    fn sellers_are_scoped_to_their_company() {
        let own = Uuid::now_v7();
        let other = Uuid::now_v7();
        let user = seller(own);

        assert_eq!(user.scope(), Some(own));
        assert_eq!(user.company_filter(Some(other)), Some(own));
        assert_eq!(user.company_for(None).unwrap(), own);
        assert!(matches!(user.company_for(Some(other)), Err(AppError::Forbidden(_))));
        assert!(user.require_company(other).is_err());
        assert!(user.require_admin().is_err());
    }

    #[test]
    fn admins_pick_the_company() {
        let company = Uuid::now_v7();
        let user = admin();

        assert_eq!(user.scope(), None);
        assert_eq!(user.company_filter(Some(company)), Some(company));
        assert_eq!(user.company_for(Some(company)).unwrap(), company);
        assert!(matches!(user.company_for(None), Err(AppError::BadRequest(_))));
        assert!(user.require_company(company).is_ok());
    }
}
