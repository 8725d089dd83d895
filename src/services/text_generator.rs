//! Story text generation through the chat LLM.
//!
//! `StoryTextGenerator::generate` always yields a usable [`StoryDraft`]: a missing
//! client or a failed request falls back to a fixed three-scene story, and a reply
//! that is not valid JSON becomes a single scene holding the raw text.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::story_service::{Paragraph, StoryDraft};
use crate::providers::ChatCompletion;

pub const DEFAULT_HERO: &str = "아이";
pub const DEFAULT_AGE: u32 = 6;
pub const DEFAULT_THEME: &str = "우정";

/// Optional hints for a new story
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct StoryHints {
    pub title: Option<String>,
    pub hero: Option<String>,
    pub age: Option<u32>,
    pub theme: Option<String>,
    pub extra: Option<String>,
}

/// Hints with defaults applied
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedHints {
    pub title: String,
    pub hero: String,
    pub age: u32,
    pub theme: String,
    pub extra: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl StoryHints {
    pub fn resolve(&self) -> ResolvedHints {
        let hero = non_blank(&self.hero).unwrap_or_else(|| DEFAULT_HERO.to_string());
        let theme = non_blank(&self.theme).unwrap_or_else(|| DEFAULT_THEME.to_string());
        let title =
            non_blank(&self.title).unwrap_or_else(|| format!("{}의 {} 이야기", hero, theme));
        ResolvedHints {
            title,
            hero,
            age: self.age.filter(|age| *age > 0).unwrap_or(DEFAULT_AGE),
            theme,
            extra: non_blank(&self.extra),
        }
    }
}

pub fn system_instruction() -> &'static str {
    "당신은 유아와 어린이를 위한 동화 작가입니다. \
     3~5개의 장면으로 이루어진 짧은 동화를 한국어로 씁니다. \
     각 장면은 짧은 제목과 2~3문장의 본문으로 구성합니다. \
     폭력적이거나 무서운 내용은 피하고 따뜻한 결말로 마무리합니다. \
     반드시 다른 설명 없이 다음 형식의 JSON 객체 하나만 출력하세요: \
     {\"title\": \"동화 제목\", \"paragraphs\": [{\"title\": \"장면 제목\", \"text\": \"장면 본문\"}]}"
}

pub fn user_prompt(hints: &ResolvedHints) -> String {
    let mut prompt = format!(
        "제목: {}\n주인공: {}\n대상 나이: {}살\n주제: {}\n",
        hints.title, hints.hero, hints.age, hints.theme
    );
    if let Some(extra) = &hints.extra {
        prompt.push_str(&format!("추가 요청: {}\n", extra));
    }
    prompt.push_str("위 조건에 맞는 동화를 JSON으로 작성해 주세요.");
    prompt
}

/// Fixed story used when the LLM cannot be reached.
pub fn fallback_story(hints: &ResolvedHints) -> StoryDraft {
    let hero = &hints.hero;
    let theme = &hints.theme;
    StoryDraft {
        title: hints.title.clone(),
        paragraphs: vec![
            Paragraph {
                title: "시작".to_string(),
                text: format!(
                    "어느 맑은 아침, {}는 {}에 대해 궁금한 마음을 안고 집을 나섰어요. \
                     햇살이 반짝이는 길 위에서 새로운 하루가 시작되었답니다.",
                    hero, theme
                ),
            },
            Paragraph {
                title: "모험".to_string(),
                text: format!(
                    "숲속에서 {}는 도움이 필요한 친구를 만났어요. \
                     {}는 용기를 내어 친구에게 손을 내밀었고, 둘은 함께 길을 찾아 나섰어요.",
                    hero, hero
                ),
            },
            Paragraph {
                title: "마무리".to_string(),
                text: format!(
                    "해가 질 무렵, {}는 {}의 소중함을 마음 깊이 깨달았어요. \
                     집으로 돌아오는 길, {}의 얼굴에는 환한 미소가 가득했답니다.",
                    hero, theme, hero
                ),
            },
        ],
    }
}

static CODE_FENCE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").ok());

/// Find the first JSON-looking object in a model reply.
///
/// Fenced code blocks are tried first, then the whole text.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let fenced = CODE_FENCE
        .as_ref()
        .into_iter()
        .flat_map(|fence| fence.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .find_map(|m| first_balanced_object(m.as_str()));

    fenced.or_else(|| first_balanced_object(text))
}

/// First balanced `{...}` in `haystack`, ignoring braces inside string literals.
fn first_balanced_object(haystack: &str) -> Option<&str> {
    let start = haystack.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in haystack[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&haystack[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn paragraphs_from(value: &Value) -> Option<Vec<Paragraph>> {
    let paragraphs: Vec<Paragraph> = value
        .get("paragraphs")?
        .as_array()?
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(Paragraph {
                title: String::new(),
                text: text.clone(),
            }),
            Value::Object(_) => Some(Paragraph {
                title: item.get("title").and_then(Value::as_str).unwrap_or_default().to_string(),
                text: item.get("text").and_then(Value::as_str)?.to_string(),
            }),
            _ => None,
        })
        .filter(|p| !p.text.trim().is_empty())
        .enumerate()
        .map(|(idx, mut p)| {
            if p.title.trim().is_empty() {
                p.title = format!("Scene {}", idx + 1);
            }
            p
        })
        .collect();

    (!paragraphs.is_empty()).then_some(paragraphs)
}

/// Turn a raw LLM reply into a draft, keeping the raw text when it is not parseable.
pub fn parse_story_response(raw: &str, default_title: &str) -> StoryDraft {
    let parsed = extract_json_object(raw)
        .and_then(|json| serde_json::from_str::<Value>(json).ok())
        .and_then(|value| {
            let paragraphs = paragraphs_from(&value)?;
            let title = value
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .unwrap_or(default_title)
                .to_string();
            Some(StoryDraft { title, paragraphs })
        });

    parsed.unwrap_or_else(|| StoryDraft {
        title: default_title.to_string(),
        paragraphs: vec![Paragraph {
            title: "Scene 1".to_string(),
            text: raw.trim().to_string(),
        }],
    })
}

#[derive(Clone)]
pub struct StoryTextGenerator {
    client: Option<Arc<dyn ChatCompletion>>,
}

impl StoryTextGenerator {
    pub fn new(client: Option<Arc<dyn ChatCompletion>>) -> Self {
        Self { client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    #[instrument(skip_all)]
    pub async fn generate(&self, hints: &StoryHints) -> StoryDraft {
        let hints = hints.resolve();

        let Some(client) = &self.client else {
            warn!("LLM key not configured; using fallback story");
            return fallback_story(&hints);
        };

        match client.complete(system_instruction(), &user_prompt(&hints)).await {
            Ok(raw) if !raw.trim().is_empty() => {
                let draft = parse_story_response(&raw, &hints.title);
                info!(scenes = draft.paragraphs.len(), "Generated story text");
                draft
            }
            Ok(_) => {
                warn!("LLM returned an empty reply; using fallback story");
                fallback_story(&hints)
            }
            Err(err) => {
                warn!(error = %err, "LLM request failed; using fallback story");
                fallback_story(&hints)
            }
        }
    }
}
