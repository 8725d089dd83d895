pub mod auth;
pub mod health;
pub mod llm;
pub mod pages;
pub mod profile;
pub mod story;
pub mod tts;
