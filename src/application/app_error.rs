use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is not active")]
    AccountNotActive,

    #[error("Account is banned")]
    AccountBanned,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Refresh token reuse detected")]
    TokenReuseDetected,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("OTP not found or expired")]
    OtpNotFound,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::NotFound => ErrorCode::NotFound,
            AppError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AppError::AccountNotActive => ErrorCode::AccountNotActive,
            AppError::AccountBanned => ErrorCode::AccountBanned,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::TokenExpired => ErrorCode::TokenExpired,
            AppError::TokenReuseDetected => ErrorCode::TokenReuseDetected,
            AppError::InvalidOrExpiredToken => ErrorCode::InvalidOrExpiredToken,
            AppError::OtpNotFound => ErrorCode::OtpNotFound,
            AppError::InvalidOtp => ErrorCode::InvalidOtp,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    NotFound,
    InvalidCredentials,
    AccountNotActive,
    AccountBanned,
    InvalidToken,
    TokenExpired,
    TokenReuseDetected,
    InvalidOrExpiredToken,
    OtpNotFound,
    InvalidOtp,
    InvalidInput,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::AccountNotActive => "ACCOUNT_NOT_ACTIVE",
            ErrorCode::AccountBanned => "ACCOUNT_BANNED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::TokenReuseDetected => "TOKEN_REUSE_DETECTED",
            ErrorCode::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            ErrorCode::OtpNotFound => "OTP_NOT_FOUND",
            ErrorCode::InvalidOtp => "INVALID_OTP",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
