use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::database::entities::{stories, story_images, Stories, StoryImages};
use crate::errors::{StoryError, StoryResult};

/// One scene of a story
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Paragraph {
    pub title: String,
    pub text: String,
}

/// Story title plus its ordered scenes; also the shape stored in `stories.content`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoryDraft {
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
}

impl StoryDraft {
    pub fn validate(&self) -> StoryResult<()> {
        if self.title.trim().is_empty() {
            return Err(StoryError::InvalidRequest("title must not be empty".to_string()));
        }
        if self.paragraphs.is_empty() {
            return Err(StoryError::InvalidRequest(
                "a story needs at least one paragraph".to_string(),
            ));
        }
        Ok(())
    }
}

/// Descriptor of one generated illustration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoryImageOut {
    pub idx: i32,
    pub file_path: String,
    pub prompt: String,
    /// Public URL under `/static`
    pub url: String,
}

impl StoryImageOut {
    pub fn public_url(story_id: i32, idx: i32) -> String {
        format!("/static/stories/{}/{}.png", story_id, idx)
    }
}

impl From<story_images::Model> for StoryImageOut {
    fn from(model: story_images::Model) -> Self {
        Self {
            url: Self::public_url(model.story_id, model.idx),
            idx: model.idx,
            file_path: model.file_path,
            prompt: model.prompt,
        }
    }
}

/// A persisted story with its paragraphs decoded
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StoryLoad {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub paragraphs: Vec<Paragraph>,
    pub images: Vec<StoryImageOut>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StorySummary {
    pub id: i32,
    pub title: String,
    pub scene_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Persistence gateway for stories and their illustrations
#[derive(Clone)]
pub struct StoryService {
    db: DatabaseConnection,
}

impl StoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Store a story and its paragraphs in one transaction.
    pub async fn create_story(&self, user_id: i32, draft: &StoryDraft) -> StoryResult<stories::Model> {
        draft.validate()?;
        let content = serde_json::to_string(draft)?;

        let txn = self.db.begin().await?;
        let story = stories::ActiveModel {
            user_id: Set(user_id),
            title: Set(draft.title.clone()),
            content: Set(content),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(
            story_id = story.id,
            user_id,
            scenes = draft.paragraphs.len(),
            "Created story"
        );
        Ok(story)
    }

    pub async fn get_story(&self, story_id: i32) -> StoryResult<Option<StoryLoad>> {
        let Some(story) = Stories::find_by_id(story_id).one(&self.db).await? else {
            return Ok(None);
        };

        let draft: StoryDraft = serde_json::from_str(&story.content)?;
        let images = self
            .images_for_story(story_id)
            .await?
            .into_iter()
            .map(StoryImageOut::from)
            .collect();

        Ok(Some(StoryLoad {
            id: story.id,
            user_id: story.user_id,
            title: story.title,
            paragraphs: draft.paragraphs,
            images,
            created_at: story.created_at,
        }))
    }

    /// Load a story only if `user_id` owns it.
    pub async fn get_story_for_user(&self, story_id: i32, user_id: i32) -> StoryResult<StoryLoad> {
        match self.get_story(story_id).await? {
            Some(story) if story.user_id == user_id => Ok(story),
            _ => Err(StoryError::NotFound(story_id)),
        }
    }

    pub async fn list_stories_for_user(&self, user_id: i32) -> StoryResult<Vec<StorySummary>> {
        let rows = Stories::find()
            .filter(stories::Column::UserId.eq(user_id))
            .order_by_desc(stories::Column::CreatedAt)
            .order_by_desc(stories::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|story| {
                let scene_count = serde_json::from_str::<StoryDraft>(&story.content)
                    .map(|draft| draft.paragraphs.len())
                    .unwrap_or(0);
                StorySummary {
                    id: story.id,
                    title: story.title,
                    scene_count,
                    created_at: story.created_at,
                }
            })
            .collect())
    }

    pub async fn existing_image_indices(&self, story_id: i32) -> StoryResult<BTreeSet<i32>> {
        Ok(StoryImages::find()
            .filter(story_images::Column::StoryId.eq(story_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|image| image.idx)
            .collect())
    }

    pub async fn images_for_story(&self, story_id: i32) -> StoryResult<Vec<story_images::Model>> {
        Ok(StoryImages::find()
            .filter(story_images::Column::StoryId.eq(story_id))
            .order_by_asc(story_images::Column::Idx)
            .all(&self.db)
            .await?)
    }
}
