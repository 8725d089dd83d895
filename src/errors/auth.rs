//! Authentication and session error types
//!
//! # Examples
//!
//! ```rust
//! use storybook::errors::AuthError;
//!
//! let err = AuthError::AuthenticationRequired;
//! assert_eq!(err.http_status_code(), 401);
//!
//! let err = AuthError::UnsupportedProvider("kakao".to_string());
//! assert_eq!(err.http_status_code(), 404);
//! ```

use thiserror::Error;

use super::ProviderError;

/// Authentication and session errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing authentication
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Login requested for a provider we do not integrate with
    #[error("Unsupported login provider: {0}")]
    UnsupportedProvider(String),

    /// Callback arrived without a matching pending login
    #[error("Login state mismatch; please start the login again")]
    InvalidState,

    /// Callback arrived without an authorization code
    #[error("Authorization code missing from callback: {0}")]
    MissingCode(String),

    /// Provider profile lacked the fields we need
    #[error("Invalid provider profile: {0}")]
    InvalidProfile(String),

    /// Profile update rejected
    #[error("Invalid profile update: {0}")]
    InvalidUpdate(String),

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// OAuth provider call failed
    #[error("OAuth provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Session payload could not be (de)serialised
    #[error("Corrupt session payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthError {
    /// Check if this is an authentication error (401)
    pub fn is_authentication_error(&self) -> bool {
        matches!(self, AuthError::AuthenticationRequired)
    }

    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            AuthError::AuthenticationRequired => 401,
            AuthError::InvalidState | AuthError::MissingCode(_) | AuthError::InvalidUpdate(_) => {
                400
            }
            AuthError::UnsupportedProvider(_) | AuthError::UserNotFound => 404,
            AuthError::Provider(_) | AuthError::InvalidProfile(_) => 502,
            AuthError::Database(_) | AuthError::Serialization(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::AuthenticationRequired => "AUTHENTICATION_REQUIRED",
            AuthError::UnsupportedProvider(_) => "UNSUPPORTED_PROVIDER",
            AuthError::InvalidState => "INVALID_STATE",
            AuthError::MissingCode(_) => "MISSING_CODE",
            AuthError::InvalidProfile(_) => "INVALID_PROFILE",
            AuthError::InvalidUpdate(_) => "INVALID_UPDATE",
            AuthError::UserNotFound => "USER_NOT_FOUND",
            AuthError::Provider(_) => "OAUTH_PROVIDER_ERROR",
            AuthError::Database(_) => "DATABASE_ERROR",
            AuthError::Serialization(_) => "SESSION_CORRUPT",
        }
    }
}
