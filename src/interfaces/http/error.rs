//! REST error translation
//!
//! Handlers return [`ApiError`]. Its `IntoResponse` impl only sets the status
//! and parks a [`PendingError`] in the response extensions; the
//! [`translate_api_errors`] middleware, which still knows the request path,
//! logs the failure and renders the [`ErrorMessage`] body.

use std::collections::BTreeMap;

use axum::extract::{OriginalUri, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::domain::DomainError;

const INVALID_FIELDS_MESSAGE: &str = "invalid field(s)";
const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorMessage {
    pub status: u16,
    pub message: String,
    pub path: String,
    /// Field name → validation message; only present for 422 responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("invalid field(s)")]
    Validation(BTreeMap<String, String>),

    #[error("{0}")]
    MalformedBody(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Domain(DomainError::AccessDenied(_)) => StatusCode::FORBIDDEN,
            Self::Domain(DomainError::InvalidPassword(_)) => StatusCode::BAD_REQUEST,
            Self::Domain(DomainError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Domain(DomainError::UsernameConflict(_)) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Domain(DomainError::Repository(_) | DomainError::Hashing(_))
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Server-side failures are not described.
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                errs.first().map(|e| {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    (field.to_string(), msg)
                })
            })
            .collect();
        Self::Validation(fields)
    }
}

/// An error waiting for [`translate_api_errors`] to render it.
#[derive(Debug, Clone)]
pub struct PendingError {
    pub status: StatusCode,
    pub message: String,
    pub errors: Option<BTreeMap<String, String>>,
    /// Full error text, logged but never sent to the client
    pub detail: String,
}

impl From<ApiError> for PendingError {
    fn from(err: ApiError) -> Self {
        Self {
            status: err.status(),
            message: err.public_message(),
            errors: err.field_errors().cloned(),
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let pending = PendingError::from(self);
        let mut response = pending.status.into_response();
        response.extensions_mut().insert(pending);
        response
    }
}

impl ErrorMessage {
    pub fn new(path: impl Into<String>, pending: PendingError) -> Self {
        Self {
            status: pending.status.as_u16(),
            message: pending.message,
            path: path.into(),
            errors: pending.errors,
        }
    }
}

/// Middleware rendering every [`ApiError`] raised below it.
pub async fn translate_api_errors(request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let mut response = next.run(request).await;
    let Some(pending) = response.extensions_mut().remove::<PendingError>() else {
        return response;
    };

    error!(
        path = %path,
        status = pending.status.as_u16(),
        detail = %pending.detail,
        "Api error - {}",
        pending.message
    );

    let status = pending.status;
    (status, Json(ErrorMessage::new(path, pending))).into_response()
}
