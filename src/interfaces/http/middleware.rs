//! Authentication middleware for Axum
//!
//! [`auth_middleware`] is permissive: a valid `Bearer` token attaches an
//! [`AuthenticatedUser`] to the request, anything else passes through
//! anonymously. Handlers that need a caller take `AuthenticatedUser` as an
//! extractor, which rejects anonymous requests with `AccessDenied`.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::domain::{DomainError, UserRole};
use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig, TokenClaims};
use crate::interfaces::http::error::ApiError;

/// Caller identity taken from a verified JWT.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(forbidden())
        }
    }

    /// The caller must own the account `user_id`.
    pub fn require_self(&self, user_id: i64) -> Result<(), ApiError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(forbidden())
        }
    }

    pub fn require_self_or_admin(&self, user_id: i64) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(forbidden())
        }
    }
}

fn forbidden() -> ApiError {
    DomainError::AccessDenied("You are not allowed to access this resource".into()).into()
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| DomainError::AccessDenied("Authentication required".into()).into())
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Optional JWT authentication middleware
pub async fn auth_middleware(
    State(jwt_config): State<JwtConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_token);

    if let Some(token) = token {
        match verify_token(token, &jwt_config) {
            Ok(claims) => {
                let user = AuthenticatedUser::from_claims(claims);
                request.extensions_mut().insert(user);
            }
            Err(e) => debug!("Ignoring invalid bearer token: {}", e),
        }
    }

    next.run(request).await
}
