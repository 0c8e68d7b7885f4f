//! Unified error handling.
//!
//! Provides a single error type for every crate in the workspace. Hosts that
//! mount the auth core behind HTTP get an Axum response conversion for free;
//! the status and message mapping never exposes hashes, tokens or internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication
    /// Wrong email or password; deliberately identical for unknown emails
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is temporarily locked")]
    AccountLocked,

    #[error("Account is deactivated")]
    AccountDeactivated,

    /// Current password mismatch on an already-identified account
    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    // Token issuer level (callers fold these into the kinds above)
    #[error("Token expired")]
    TokenExpired,

    #[error("Token invalid")]
    TokenInvalid,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    #[error("{0} already exists")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    /// Store, cache or broker did not answer in time; safe to retry reads
    #[error("{0} unavailable")]
    Transient(String),

    // External service errors
    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "jwt")]
    #[error("Token signing error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[cfg(feature = "cache")]
    #[error("Cache error")]
    Cache(#[from] redis::RedisError),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::AccountLocked => "ACCOUNT_LOCKED",
            AppError::AccountDeactivated => "ACCOUNT_DEACTIVATED",
            AppError::IncorrectPassword => "INCORRECT_PASSWORD",
            AppError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Transient(_) => "SERVICE_UNAVAILABLE",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => "AUTH_ERROR",
            #[cfg(feature = "cache")]
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is an infrastructure hiccup a caller may retry.
    ///
    /// Only idempotent reads should be retried blindly; a retried mutation
    /// must first check whether the original attempt landed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Transient(_) => true,
            #[cfg(feature = "database")]
            AppError::Database(e) => matches!(
                e,
                sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_)
            ),
            #[cfg(feature = "cache")]
            AppError::Cache(e) => {
                e.is_timeout()
                    || e.is_io_error()
                    || e.is_connection_dropped()
                    || e.is_connection_refusal()
            }
            _ => false,
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        if self.is_transient() {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        match self {
            AppError::InvalidCredentials
            | AppError::InvalidRefreshToken
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::TokenInvalid => StatusCode::UNAUTHORIZED,
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::AccountDeactivated => StatusCode::FORBIDDEN,
            AppError::AccountLocked => StatusCode::LOCKED,
            AppError::IncorrectPassword
            | AppError::InvalidOrExpiredToken
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::Validation(msg) => msg.clone(),
            AppError::Conflict(msg) => format!("{} already exists", msg),
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::AccountLocked => {
                "Account is temporarily locked due to multiple failed login attempts".to_string()
            }

            // Hide details for internal/security errors
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            #[cfg(feature = "jwt")]
            AppError::Jwt(e) => {
                tracing::error!("JWT error: {:?}", e);
                "An internal error occurred".to_string()
            }
            #[cfg(feature = "cache")]
            AppError::Cache(e) => {
                tracing::error!("Cache error: {:?}", e);
                "A cache error occurred".to_string()
            }
            AppError::Transient(dependency) => {
                tracing::warn!("Dependency unavailable: {}", dependency);
                "Service temporarily unavailable, please retry".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            // Use default message for others
            _ => self.to_string(),
        }
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::WeakPassword(msg) => AppError::Validation(msg),
            // A bad cost is an operator mistake, not the caller's
            DomainError::HashParams(_) | DomainError::Hashing(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn transient(dependency: impl Into<String>) -> Self {
        AppError::Transient(dependency.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_map_to_401() {
        for err in [
            AppError::InvalidCredentials,
            AppError::InvalidRefreshToken,
            AppError::InvalidToken,
            AppError::TokenExpired,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "{:?}", err);
        }
    }

    #[test]
    fn test_lock_and_deactivation_statuses() {
        assert_eq!(AppError::AccountLocked.status(), StatusCode::LOCKED);
        assert_eq!(AppError::AccountDeactivated.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::conflict("User").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_transient_is_retryable_and_503() {
        let err = AppError::transient("session cache");
        assert!(err.is_transient());
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!AppError::NotFound.is_transient());
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = AppError::internal("hash $argon2id$v=19$... failed");
        assert_eq!(err.user_message(), "An internal error occurred");
    }

    #[test]
    fn test_conflict_message() {
        assert_eq!(AppError::conflict("User").user_message(), "User already exists");
    }

    #[test]
    fn test_domain_conversion() {
        assert!(matches!(
            AppError::from(DomainError::WeakPassword("too short".into())),
            AppError::Validation(msg) if msg == "too short"
        ));
        assert!(matches!(
            AppError::from(DomainError::HashParams("memory cost is too small".into())),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn test_ok_or_not_found() {
        let missing: Option<u8> = None;
        assert!(matches!(missing.ok_or_not_found(), Err(AppError::NotFound)));
        assert_eq!(Some(7).ok_or_not_found().unwrap(), 7);
    }
}
