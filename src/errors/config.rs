//! Configuration error types

use thiserror::Error;

/// Startup configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is absent or empty
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is present but unusable
    #[error("Invalid configuration for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
