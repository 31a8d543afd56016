//! User management API handlers
//!
//! Delegates to `UserService` from the application/identity layer.
//! Failures are returned as `ApiError` and rendered by the error translator.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::dto::{ChangePasswordRequest, CreateUserRequest, UserResponse};
use crate::application::UserService;
use crate::domain::NewUser;
use crate::interfaces::http::common::ValidatedJson;
use crate::interfaces::http::error::{ApiError, ErrorMessage};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct UserHandlerState {
    pub user_service: Arc<UserService>,
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 409, description = "Username already registered", body = ErrorMessage),
        (status = 422, description = "Invalid fields", body = ErrorMessage)
    )
)]
pub async fn create_user(
    State(state): State<UserHandlerState>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state
        .user_service
        .create(NewUser::new(request.username, request.password))
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 403, description = "Caller is not an administrator", body = ErrorMessage)
    )
)]
pub async fn list_users(
    State(state): State<UserHandlerState>,
    caller: AuthenticatedUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    caller.require_admin()?;

    let users = state.user_service.get_all().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 403, description = "Not an administrator nor the account owner", body = ErrorMessage),
        (status = 404, description = "Not found", body = ErrorMessage)
    )
)]
pub async fn get_user(
    State(state): State<UserHandlerState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    caller.require_self_or_admin(id)?;

    let user = state.user_service.get_by_id(id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Password or confirmation mismatch", body = ErrorMessage),
        (status = 403, description = "Not the account owner", body = ErrorMessage),
        (status = 422, description = "Invalid fields", body = ErrorMessage)
    )
)]
pub async fn change_password(
    State(state): State<UserHandlerState>,
    caller: AuthenticatedUser,
    Path(id): Path<i64>,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    caller.require_self(id)?;

    state
        .user_service
        .change_password(
            id,
            &request.current_password,
            &request.new_password,
            &request.confirm_password,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
