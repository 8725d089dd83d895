use handlebars::{handlebars_helper, Handlebars, RenderError, TemplateError};
use include_dir::{include_dir, Dir};
use serde_json::{Map, Value};

static TEMPLATE_DIR: Dir = include_dir!("templates");

pub fn get_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();

    handlebars_helper!(exists: |v: Value| !v.is_null());
    handlebars.register_helper("exists", Box::new(exists));

    handlebars
}

/// HTML pages compiled from the embedded `templates/` directory.
///
/// Files named `_*.hbs` are registered as partials, everything else as a page
/// named after its file stem.
pub struct Views {
    registry: Handlebars<'static>,
}

impl Views {
    pub fn load() -> Result<Self, TemplateError> {
        let mut registry = get_handlebars();

        for file in TEMPLATE_DIR.files() {
            let path = file.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("hbs") {
                continue;
            }
            let (Some(name), Some(source)) = (
                path.file_stem().and_then(|stem| stem.to_str()),
                file.contents_utf8(),
            ) else {
                continue;
            };

            if name.starts_with('_') {
                registry.register_partial(name, source)?;
            } else {
                registry.register_template_string(name, source)?;
            }
        }

        Ok(Self { registry })
    }

    /// Partials are registered as templates too, so `_*` names never count as pages.
    pub fn has_page(&self, name: &str) -> bool {
        !name.starts_with('_') && self.registry.has_template(name)
    }

    /// Render a page; `page_title` and `version` are filled in when absent.
    pub fn render(&self, name: &str, data: Value) -> Result<String, RenderError> {
        let mut context = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        context
            .entry("page_title")
            .or_insert_with(|| Value::String(name.to_string()));
        context
            .entry("version")
            .or_insert_with(|| Value::String(env!("CARGO_PKG_VERSION").to_string()));

        self.registry.render(name, &Value::Object(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handlebars_can_iterate_objects() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                r#"{{#each scenes as |scene|}}
{{scene.title}}
{{/each}}"#,
                &json!({"scenes": [{"title": "시작"}, {"title": "모험"}]}),
            )
            .expect("This to render");
        assert_eq!(res, "시작\n모험\n");
    }

    #[test]
    fn handlebars_helper_exists_can_render() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                r#"{{#if (exists scene.image_url)}}img{{else}}none{{/if}}"#,
                &json!({"scene": {"image_url": null}}),
            )
            .expect("This to render");
        assert_eq!(res, "none");
    }

    #[test]
    fn storybook_hides_illustration_when_disabled() {
        let views = Views::load().expect("templates compile");
        let user = json!({"name": "홍길동"});

        let enabled = views
            .render("storybook", json!({"user": user, "images_enabled": true}))
            .expect("render");
        assert!(enabled.contains("id=\"illustrate\""));

        let disabled = views
            .render("storybook", json!({"user": user, "images_enabled": false}))
            .expect("render");
        assert!(!disabled.contains("id=\"illustrate\""));
        assert!(disabled.contains("그림 그리기 기능이 설정되지 않았어요"));
    }

    #[test]
    fn all_pages_are_embedded() {
        let views = Views::load().expect("templates compile");
        for page in ["index", "profile", "stories", "storybook"] {
            assert!(views.has_page(page), "missing page {}", page);
        }
        assert!(!views.has_page("_header"));
    }

    #[test]
    fn index_switches_on_login() {
        let views = Views::load().expect("templates compile");

        let anonymous = views.render("index", json!({})).expect("render");
        assert!(anonymous.contains("/login/naver"));
        assert!(!anonymous.contains("/logout"));

        let logged_in = views
            .render("index", json!({"user": {"name": "홍길동"}}))
            .expect("render");
        assert!(logged_in.contains("홍길동"));
        assert!(logged_in.contains("/logout"));
    }

    #[test]
    fn story_page_shows_only_existing_images() {
        let views = Views::load().expect("templates compile");
        let html = views
            .render(
                "stories",
                json!({
                    "user": {"name": "홍길동"},
                    "story": {"title": "달님과 토끼"},
                    "scenes": [
                        {"title": "시작", "text": "옛날에", "image_url": "/static/stories/1/0.png"},
                        {"title": "끝", "text": "행복하게", "image_url": null}
                    ]
                }),
            )
            .expect("render");

        assert!(html.contains("/static/stories/1/0.png"));
        assert_eq!(html.matches("<img").count(), 1);
        assert!(html.contains("행복하게"));
    }
}
