//! Per-scene illustration of a persisted story.
//!
//! One pass walks the story's paragraphs in order, skips indices that already have
//! an image, and calls the image provider for the rest. Transient provider failures
//! (429/500/503) are retried with linear backoff; any other failure drops only that
//! scene. Images are written to `<stories_dir>/<story_id>/<idx>.png` as they arrive
//! and all new rows are committed together at the end of the pass.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{debug, info, instrument, warn};

use super::story_service::{Paragraph, StoryImageOut, StoryService};
use crate::database::entities::{story_images, StoryImages};
use crate::errors::{ProviderResult, StoryResult};
use crate::providers::{GeneratedImage, ImageGenerator};

/// Bounded retry for transient image-provider failures
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

pub const DEFAULT_SCENE_PAUSE: Duration = Duration::from_millis(500);

/// Visual constraints shared by every scene of one story
pub fn style_directive(title: &str) -> String {
    format!(
        "[동화책 삽화 / Children's picture-book illustration]\n\
         책 제목 / Book title: {title}\n\
         스타일: 파스텔톤, 따뜻하고 부드러운 수채화 그림체, 어린이 친화적, 고해상도, 페이지 전체 삽화\n\
         Style: soft pastel palette, warm watercolor look, child-friendly, full-page illustration.\n\
         일관성: 모든 장면에서 주인공의 얼굴, 머리 모양, 옷, 색상을 동일하게 유지할 것\n\
         Consistency: keep every recurring character's face, hair, outfit and colors identical across all scenes of this book.\n\
         주의: 이미지 안에 글자, 자막, 말풍선, 워터마크를 넣지 말 것\n\
         Do not draw any text, letters, captions, speech bubbles or watermarks in the image."
    )
}

pub fn scene_prompt(style: &str, idx: usize, total: usize, paragraph: &Paragraph) -> String {
    format!(
        "{style}\n\n\
         장면 {n}/{total}: {title}\n\
         Scene {n} of {total}: {title}\n\
         장면 설명 / Scene description: {text}\n\n\
         구도: 중심 인물과 핵심 사건이 명확히 보이도록\n\
         Depict only what this scene describes; do not add events from other scenes.",
        n = idx + 1,
        title = paragraph.title,
        text = paragraph.text,
    )
}

/// A generated image written to disk and waiting for its row
struct PendingImage {
    idx: i32,
    prompt: String,
    file_path: String,
}

#[derive(Clone)]
pub struct ImageOrchestrator {
    db: DatabaseConnection,
    stories: StoryService,
    generator: Arc<dyn ImageGenerator>,
    stories_dir: PathBuf,
    retry: RetryPolicy,
    scene_pause: Duration,
}

impl ImageOrchestrator {
    pub fn new(db: DatabaseConnection, generator: Arc<dyn ImageGenerator>, stories_dir: PathBuf) -> Self {
        Self {
            stories: StoryService::new(db.clone()),
            db,
            generator,
            stories_dir,
            retry: RetryPolicy::default(),
            scene_pause: DEFAULT_SCENE_PAUSE,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_scene_pause(mut self, scene_pause: Duration) -> Self {
        self.scene_pause = scene_pause;
        self
    }

    pub fn story_dir(&self, story_id: i32) -> PathBuf {
        self.stories_dir.join(story_id.to_string())
    }

    /// Illustrate every scene of a story that has no image yet.
    ///
    /// Returns descriptors only for images created by this call, in scene order.
    #[instrument(skip(self, title, paragraphs), fields(scenes = paragraphs.len()))]
    pub async fn illustrate(
        &self,
        story_id: i32,
        title: &str,
        paragraphs: &[Paragraph],
    ) -> StoryResult<Vec<StoryImageOut>> {
        let existing = self.stories.existing_image_indices(story_id).await?;
        let pending_indices = pending_scene_indices(paragraphs.len(), &existing);
        if pending_indices.is_empty() {
            info!(story_id, "All scenes already illustrated");
            return Ok(Vec::new());
        }

        let dir = self.story_dir(story_id);
        tokio::fs::create_dir_all(&dir).await?;

        let style = style_directive(title);
        let total = paragraphs.len();
        let mut generated = Vec::new();

        for (position, &idx) in pending_indices.iter().enumerate() {
            let prompt = scene_prompt(&style, idx, total, &paragraphs[idx]);

            let image = match self.generate_with_retry(idx, &prompt).await {
                Ok(image) => image,
                Err(err) => {
                    warn!(story_id, idx, error = %err, "Skipping scene without image");
                    continue;
                }
            };

            if image.mime_type != story_images::DEFAULT_MIME_TYPE {
                warn!(story_id, idx, mime_type = %image.mime_type, "Provider returned a non-PNG image type");
            }
            let path = dir.join(format!("{}.png", idx));
            if let Err(err) = write_image(&path, &image).await {
                warn!(story_id, idx, error = %err, "Failed to store scene image");
                continue;
            }
            debug!(story_id, idx, bytes = image.bytes.len(), "Stored scene image");

            generated.push(PendingImage {
                idx: idx as i32,
                prompt,
                file_path: path.to_string_lossy().into_owned(),
            });

            if position + 1 < pending_indices.len() && !self.scene_pause.is_zero() {
                tokio::time::sleep(self.scene_pause).await;
            }
        }

        let created = self.persist(story_id, generated).await?;
        info!(
            story_id,
            created = created.len(),
            skipped = existing.len(),
            failed = pending_indices.len() - created.len(),
            "Illustration pass finished"
        );
        Ok(created)
    }

    async fn generate_with_retry(&self, idx: usize, prompt: &str) -> ProviderResult<GeneratedImage> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.generator.generate(prompt).await {
                Ok(image) => return Ok(image),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        idx,
                        attempt,
                        delay_secs = delay.as_secs_f32(),
                        error = %err,
                        "Transient image error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Insert all rows of one pass in a single transaction.
    ///
    /// A row that collides with an existing (story_id, idx) was written by a
    /// concurrent pass and yields no descriptor.
    async fn persist(&self, story_id: i32, generated: Vec<PendingImage>) -> StoryResult<Vec<StoryImageOut>> {
        if generated.is_empty() {
            return Ok(Vec::new());
        }

        let txn = self.db.begin().await?;
        let mut created = Vec::with_capacity(generated.len());
        for image in generated {
            let row = story_images::ActiveModel::new(
                story_id,
                image.idx,
                image.prompt.clone(),
                image.file_path.clone(),
            );

            let inserted = StoryImages::insert(row)
                .on_conflict(
                    OnConflict::columns([story_images::Column::StoryId, story_images::Column::Idx])
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
            if inserted == 0 {
                debug!(story_id, idx = image.idx, "Scene image already recorded");
                continue;
            }

            created.push(StoryImageOut {
                url: StoryImageOut::public_url(story_id, image.idx),
                idx: image.idx,
                file_path: image.file_path,
                prompt: image.prompt,
            });
        }
        txn.commit().await?;
        Ok(created)
    }
}

async fn write_image(path: &Path, image: &GeneratedImage) -> std::io::Result<()> {
    tokio::fs::write(path, &image.bytes).await
}

/// Indices of `paragraphs` not yet present in `existing`
pub fn pending_scene_indices(paragraph_count: usize, existing: &BTreeSet<i32>) -> Vec<usize> {
    (0..paragraph_count)
        .filter(|idx| !existing.contains(&(*idx as i32)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::{users, Stories};
    use crate::database::test_utils::setup_test_db;
    use crate::errors::{ProviderError, ProviderResult};
    use crate::services::story_service::StoryDraft;
    use async_trait::async_trait;
    use sea_orm::ActiveModelTrait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted generator: per-prompt-marker responses, default success
    #[derive(Default)]
    struct ScriptedImages {
        calls: Mutex<Vec<String>>,
        failures: Mutex<HashMap<String, Vec<u16>>>,
    }

    impl ScriptedImages {
        fn fail_scene(&self, marker: &str, statuses: Vec<u16>) {
            self.failures
                .lock()
                .unwrap()
                .insert(marker.to_string(), statuses);
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedImages {
        async fn generate(&self, prompt: &str) -> ProviderResult<GeneratedImage> {
            self.calls.lock().unwrap().push(prompt.to_string());
            let mut failures = self.failures.lock().unwrap();
            for (marker, statuses) in failures.iter_mut() {
                if prompt.contains(marker.as_str()) && !statuses.is_empty() {
                    let status = statuses.remove(0);
                    return Err(ProviderError::Status {
                        provider: "imagen",
                        status,
                        message: "scripted failure".to_string(),
                    });
                }
            }
            Ok(GeneratedImage {
                bytes: vec![0x89, b'P', b'N', b'G'],
                mime_type: "image/png".to_string(),
            })
        }
    }

    fn draft(titles: &[&str]) -> StoryDraft {
        StoryDraft {
            title: "달님과 토끼".to_string(),
            paragraphs: titles
                .iter()
                .map(|title| Paragraph {
                    title: title.to_string(),
                    text: format!("{} 장면의 이야기", title),
                })
                .collect(),
        }
    }

    async fn story_fixture(db: &DatabaseConnection, draft: &StoryDraft) -> i32 {
        let user = users::ActiveModel::new("naver-1".to_string(), "홍길동".to_string())
            .insert(db)
            .await
            .expect("user");
        StoryService::new(db.clone())
            .create_story(user.id, draft)
            .await
            .expect("story")
            .id
    }

    fn orchestrator(
        db: &DatabaseConnection,
        images: Arc<ScriptedImages>,
        dir: &Path,
    ) -> ImageOrchestrator {
        ImageOrchestrator::new(db.clone(), images, dir.to_path_buf())
            .with_retry_policy(RetryPolicy {
                max_attempts: 3,
                backoff_base: Duration::ZERO,
            })
            .with_scene_pause(Duration::ZERO)
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
    }

    #[test]
    fn test_scene_prompt_embeds_style_and_position() {
        let style = style_directive("달님과 토끼");
        let paragraph = Paragraph {
            title: "출발".to_string(),
            text: "토끼가 달을 향해 뛰었어요.".to_string(),
        };
        let prompt = scene_prompt(&style, 1, 3, &paragraph);

        assert!(prompt.starts_with(&style));
        assert!(prompt.contains("Scene 2 of 3: 출발"));
        assert!(prompt.contains("토끼가 달을 향해 뛰었어요."));
        assert!(prompt.contains("Depict only what this scene describes"));
        assert!(style.contains("Do not draw any text"));
    }

    #[test]
    fn test_pending_scene_indices() {
        let existing: BTreeSet<i32> = [0, 2].into_iter().collect();
        assert_eq!(pending_scene_indices(4, &existing), vec![1, 3]);
        assert!(pending_scene_indices(0, &existing).is_empty());
    }

    #[tokio::test]
    async fn test_illustrates_every_scene() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let story = draft(&["시작", "모험", "마무리"]);
        let story_id = story_fixture(&db, &story).await;
        let images = Arc::new(ScriptedImages::default());

        let created = orchestrator(&db, images.clone(), dir.path())
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("illustrate");

        assert_eq!(created.iter().map(|c| c.idx).collect::<Vec<_>>(), vec![0, 1, 2]);
        for image in &created {
            assert!(Path::new(&image.file_path).exists());
            assert!(image.file_path.ends_with(&format!("{}.png", image.idx)));
        }
        assert_eq!(images.call_count(), 3);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let story = draft(&["시작", "모험"]);
        let story_id = story_fixture(&db, &story).await;
        let images = Arc::new(ScriptedImages::default());
        let orchestrator = orchestrator(&db, images.clone(), dir.path());

        orchestrator
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("first pass");
        let second = orchestrator
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("second pass");

        assert!(second.is_empty());
        assert_eq!(images.call_count(), 2);
        assert_eq!(StoryImages::find().all(&db).await.expect("rows").len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_skips_only_that_scene() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let story = draft(&["시작", "모험", "마무리"]);
        let story_id = story_fixture(&db, &story).await;
        let images = Arc::new(ScriptedImages::default());
        images.fail_scene("Scene 2 of 3", vec![400]);

        let created = orchestrator(&db, images.clone(), dir.path())
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("illustrate");

        assert_eq!(created.iter().map(|c| c.idx).collect::<Vec<_>>(), vec![0, 2]);
        assert!(!dir.path().join(story_id.to_string()).join("1.png").exists());
        assert_eq!(images.call_count(), 3);

        // a later pass only retries the missing scene
        let retried = orchestrator(&db, images.clone(), dir.path())
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("retry pass");
        assert_eq!(retried.iter().map(|c| c.idx).collect::<Vec<_>>(), vec![1]);
        assert_eq!(images.call_count(), 4);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let story = draft(&["시작"]);
        let story_id = story_fixture(&db, &story).await;
        let images = Arc::new(ScriptedImages::default());
        images.fail_scene("Scene 1 of 1", vec![429, 503]);

        let created = orchestrator(&db, images.clone(), dir.path())
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("illustrate");

        assert_eq!(created.len(), 1);
        assert_eq!(images.call_count(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let story = draft(&["시작"]);
        let story_id = story_fixture(&db, &story).await;
        let images = Arc::new(ScriptedImages::default());
        images.fail_scene("Scene 1 of 1", vec![500, 500, 500, 500]);

        let created = orchestrator(&db, images.clone(), dir.path())
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("illustrate");

        assert!(created.is_empty());
        assert_eq!(images.call_count(), 3);
        assert!(StoryImages::find().all(&db).await.expect("rows").is_empty());
    }

    /// Records the scene's row itself before answering, as a concurrent pass would
    struct RacingImages {
        db: DatabaseConnection,
        story_id: i32,
    }

    #[async_trait]
    impl ImageGenerator for RacingImages {
        async fn generate(&self, prompt: &str) -> ProviderResult<GeneratedImage> {
            story_images::ActiveModel::new(
                self.story_id,
                0,
                prompt.to_string(),
                "other-pass/0.png".to_string(),
            )
            .insert(&self.db)
            .await
            .expect("concurrent row");
            Ok(GeneratedImage {
                bytes: vec![0x89, b'P', b'N', b'G'],
                mime_type: "image/jpeg".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_row_written_by_concurrent_pass_yields_no_descriptor() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let story = draft(&["시작"]);
        let story_id = story_fixture(&db, &story).await;
        let images = Arc::new(RacingImages {
            db: db.clone(),
            story_id,
        });

        let created = ImageOrchestrator::new(db.clone(), images, dir.path().to_path_buf())
            .with_scene_pause(Duration::ZERO)
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("illustrate");

        assert!(created.is_empty());
        let rows = StoryImages::find().all(&db).await.expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_path, "other-pass/0.png");
    }

    #[tokio::test]
    async fn test_rows_record_png_regardless_of_reported_type() {
        struct JpegImages;

        #[async_trait]
        impl ImageGenerator for JpegImages {
            async fn generate(&self, _prompt: &str) -> ProviderResult<GeneratedImage> {
                Ok(GeneratedImage {
                    bytes: vec![0xff, 0xd8, 0xff],
                    mime_type: "image/jpeg".to_string(),
                })
            }
        }

        let db = setup_test_db().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let story = draft(&["시작"]);
        let story_id = story_fixture(&db, &story).await;

        let created = ImageOrchestrator::new(db.clone(), Arc::new(JpegImages), dir.path().to_path_buf())
            .with_scene_pause(Duration::ZERO)
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("illustrate");

        assert!(created[0].file_path.ends_with("0.png"));
        let rows = StoryImages::find().all(&db).await.expect("rows");
        assert_eq!(rows[0].mime_type, story_images::DEFAULT_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_deleting_story_cascades_to_images() {
        let db = setup_test_db().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let story = draft(&["시작", "모험"]);
        let story_id = story_fixture(&db, &story).await;

        orchestrator(&db, Arc::new(ScriptedImages::default()), dir.path())
            .illustrate(story_id, &story.title, &story.paragraphs)
            .await
            .expect("illustrate");
        Stories::delete_by_id(story_id).exec(&db).await.expect("delete");

        assert!(StoryImages::find().all(&db).await.expect("rows").is_empty());
    }
}
