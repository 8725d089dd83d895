use utoipa::OpenApi;

use super::handlers::{health, llm, profile, story, tts};
use crate::services::{
    Paragraph, StoryDraft, StoryHints, StoryImageOut, StoryLoad, StorySummary, TtsRequest,
    UserUpdate,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        profile::update_profile,
        story::make_story,
        story::resume_images,
        story::get_story,
        llm::make_draft,
        tts::synthesize,
    ),
    components(schemas(
        Paragraph,
        StoryDraft,
        StoryHints,
        StoryImageOut,
        StoryLoad,
        StorySummary,
        TtsRequest,
        UserUpdate,
        profile::ProfileResponse,
        story::MakeStoryResponse,
    )),
    tags((name = "storybook", description = "Illustrated story generation"))
)]
pub struct ApiDoc;
