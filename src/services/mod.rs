pub mod auth_service;
pub mod image_orchestrator;
pub mod session_service;
pub mod speech_service;
pub mod story_service;
pub mod text_generator;
pub mod user_service;

pub use auth_service::{AuthService, AuthenticatedSession, CallbackParams, LoginRedirect};
pub use image_orchestrator::{ImageOrchestrator, RetryPolicy};
pub use session_service::{SessionState, SessionStore, SessionUser};
pub use speech_service::{SpeechService, TtsRequest};
pub use story_service::{Paragraph, StoryDraft, StoryImageOut, StoryLoad, StoryService, StorySummary};
pub use text_generator::{StoryHints, StoryTextGenerator};
pub use user_service::{UserService, UserUpdate};
