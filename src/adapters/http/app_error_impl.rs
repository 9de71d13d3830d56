use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app_error::AppError;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        let status = match &self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::TokenReuseDetected => StatusCode::UNAUTHORIZED,
            AppError::AccountNotActive | AppError::AccountBanned => StatusCode::FORBIDDEN,
            AppError::InvalidOrExpiredToken
            | AppError::OtpNotFound
            | AppError::InvalidOtp
            | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        };

        // Never echo internal detail; the code string is the contract.
        let message = match &self {
            AppError::Database(_) => "Database error".to_string(),
            AppError::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        (
            status,
            Json(serde_json::json!({
                "message": message,
                "code": self.code().as_str(),
            })),
        )
            .into_response()
    }
}
