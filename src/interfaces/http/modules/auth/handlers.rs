//! Authentication API handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use super::dto::{LoginRequest, TokenResponse};
use crate::application::UserService;
use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
use crate::interfaces::http::common::ValidatedJson;
use crate::interfaces::http::error::{ApiError, ErrorMessage};

/// Auth state
#[derive(Clone)]
pub struct AuthHandlerState {
    pub user_service: Arc<UserService>,
    pub jwt_config: JwtConfig,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = TokenResponse),
        (status = 403, description = "Invalid credentials", body = ErrorMessage),
        (status = 422, description = "Invalid fields", body = ErrorMessage)
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(&request.username, &request.password)
        .await?;
    let role = state.user_service.get_role_by_username(&user.username).await?;

    let token = create_token(user.id, &user.username, role, &state.jwt_config)
        .map_err(|e| ApiError::Internal(format!("Failed to create token: {}", e)))?;

    info!(user_id = user.id, "User logged in");
    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt_config.expiration_hours * 3600,
    }))
}
