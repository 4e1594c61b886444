use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::users::RepoError;

/// Every outcome a handler can fail with. Rendered as `{success: false, message}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Phone or Email is already used.")]
    DuplicateAccount,

    #[error("You have exceeded the maximum number of attempts ({0}). Please try again later.")]
    TooManyAttempts(u64),

    #[error("{0}")]
    DispatchFailure(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid OTP.")]
    InvalidCode,

    #[error("OTP Expired.")]
    Expired,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Reset password token is invalid or has expired.")]
    InvalidOrExpiredResetToken,

    #[error("Password and confirm password do not match.")]
    PasswordMismatch,

    #[error("{0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DuplicateAccount
            | AppError::TooManyAttempts(_)
            | AppError::InvalidCode
            | AppError::Expired
            | AppError::InvalidCredentials
            | AppError::InvalidOrExpiredResetToken
            | AppError::PasswordMismatch => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::DispatchFailure(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(_) => AppError::DuplicateAccount,
            RepoError::LimitReached(limit) => AppError::TooManyAttempts(limit),
            RepoError::Backend(e) => AppError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(status = %rejection.status(), "request body rejected");
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                "Internal Server Error.".to_string()
            }
            AppError::DispatchFailure(reason) => {
                tracing::error!(%reason, "dispatch failed");
                reason.clone()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
