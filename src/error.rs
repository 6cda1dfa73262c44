//! Application error type and its HTTP mapping.
//!
//! Every magic-link rejection collapses to one user-visible message so the
//! response does not reveal which check failed; the precise reason is still
//! logged for telemetry.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

use crate::auth::magic_link::RejectReason;

/// Per-field validation messages, keyed by the offending field name.
pub type FieldErrors = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error(transparent)]
    MagicLink(#[from] RejectReason),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": message })),
            )
                .into_response(),
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::MagicLink(reason) => {
                tracing::warn!("magic link rejected: {}", reason);
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "message": "This link is invalid or has expired, please request a new one."
                    })),
                )
                    .into_response()
            }
            AppError::Internal(err) => {
                tracing::error!("internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.to_string());
        AppError::Validation(errors)
    }
}
