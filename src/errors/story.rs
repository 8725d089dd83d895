//! Story persistence and illustration error types

use thiserror::Error;

/// Story creation, lookup and illustration errors
#[derive(Error, Debug)]
pub enum StoryError {
    /// A provider key required for this operation is not configured
    #[error("Story illustration is disabled: {0} is not set")]
    MissingConfig(&'static str),

    /// Story not found (or not owned by the caller)
    #[error("Story {0} not found")]
    NotFound(i32),

    /// Request payload rejected before any work was done
    #[error("Invalid story request: {0}")]
    InvalidRequest(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Writing an image to the content directory failed
    #[error("Failed to write story asset: {0}")]
    Io(#[from] std::io::Error),

    /// Story content column could not be (de)serialised
    #[error("Story content is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoryError {
    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            StoryError::MissingConfig(_) => 503,
            StoryError::NotFound(_) => 404,
            StoryError::InvalidRequest(_) => 400,
            StoryError::Database(_) | StoryError::Io(_) | StoryError::Serialization(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            StoryError::MissingConfig(_) => "FEATURE_DISABLED",
            StoryError::NotFound(_) => "STORY_NOT_FOUND",
            StoryError::InvalidRequest(_) => "INVALID_STORY",
            StoryError::Database(_) => "DATABASE_ERROR",
            StoryError::Io(_) => "STORAGE_ERROR",
            StoryError::Serialization(_) => "STORY_CORRUPT",
        }
    }
}
