//! Errors raised by outbound provider clients
//!
//! Every external API (OAuth, LLM, image generation, text-to-speech) reports failures
//! through [`ProviderError`], so callers can decide uniformly whether a failure is worth
//! retrying, should be skipped, or must be surfaced to the client.
//!
//! # Examples
//!
//! ```rust
//! use storybook::errors::ProviderError;
//!
//! let err = ProviderError::Status {
//!     provider: "imagen",
//!     status: 429,
//!     message: "quota exceeded".to_string(),
//! };
//! assert!(err.is_transient());
//! ```

use thiserror::Error;

/// HTTP statuses that indicate the provider may succeed on a later attempt
pub const TRANSIENT_STATUSES: [u16; 3] = [429, 500, 503];

/// Outbound provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered with a non-success HTTP status
    #[error("{provider} returned HTTP {status}: {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// The request never produced a response (connect error, timeout)
    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    /// The provider answered 2xx but the payload was not what we expected
    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        ProviderError::Transport {
            provider,
            message: err.to_string(),
        }
    }

    pub fn invalid_response(provider: &'static str, message: impl Into<String>) -> Self {
        ProviderError::InvalidResponse {
            provider,
            message: message.into(),
        }
    }

    /// Rate limiting and server-side failures (429/500/503)
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Status { status, .. } if TRANSIENT_STATUSES.contains(status))
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ProviderError::Status { .. } => "PROVIDER_ERROR",
            ProviderError::Transport { .. } => "PROVIDER_UNREACHABLE",
            ProviderError::InvalidResponse { .. } => "PROVIDER_INVALID_RESPONSE",
        }
    }

    /// Get HTTP status code for this error when it reaches a client
    pub fn http_status_code(&self) -> u16 {
        match self {
            ProviderError::Transport { .. } => 504,
            ProviderError::Status { .. } | ProviderError::InvalidResponse { .. } => 502,
        }
    }
}
