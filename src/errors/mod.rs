//! Domain-specific error types for the storybook server
//!
//! # Error Categories
//!
//! - **ProviderError**: outbound calls to OAuth, LLM, image and TTS providers
//! - **AuthError**: login flow and session handling
//! - **StoryError**: story persistence and illustration
//! - **SpeechError**: text-to-speech requests
//! - **ConfigError**: startup configuration
//!
//! Each error knows its HTTP status and a stable error code; the server layer turns
//! them into JSON responses.

pub mod auth;
pub mod config;
pub mod provider;
pub mod speech;
pub mod story;

// Re-export all error types
pub use auth::AuthError;
pub use config::ConfigError;
pub use provider::ProviderError;
pub use speech::SpeechError;
pub use story::StoryError;

/// Result type alias for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type alias for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Result type alias for story operations
pub type StoryResult<T> = Result<T, StoryError>;

/// Result type alias for speech operations
pub type SpeechResult<T> = Result<T, SpeechError>;
