use scraper::node::Text;
use scraper::{Html, Node, Selector};
use serde::Serialize;

use super::rewrite::{inline_script_texts, parse_selector};
use crate::config::Markup;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptStatus {
    Installed,
    AlreadyPresent,
    NoThumbnails,
    NoScript,
    /// The page could not be read or written.
    Error,
}

impl ScriptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::AlreadyPresent => "already-present",
            Self::NoThumbnails => "no-thumbnails",
            Self::NoScript => "no-script",
            Self::Error => "error",
        }
    }
}

/// Adds the thumbnail click handler to pages whose thumbnails call it but
/// never define it.
pub struct ScriptInstaller {
    function: String,
    onclick: String,
    thumbnail_class: String,
    main_id: Option<String>,
    clickable: Selector,
    script: Selector,
}

impl ScriptInstaller {
    pub fn new(markup: &Markup) -> Result<Self> {
        Ok(Self {
            function: markup.gallery_function.clone(),
            onclick: markup.thumbnail_onclick.clone(),
            thumbnail_class: markup.thumbnail_class.clone(),
            main_id: main_image_id(&markup.main_image),
            clickable: parse_selector("[onclick]")?,
            script: parse_selector("script")?,
        })
    }

    /// JavaScript appended to the page's last inline script.
    pub fn snippet(&self) -> String {
        let main_lookup = match &self.main_id {
            Some(id) => format!("document.getElementById('{id}')"),
            None => "null".to_string(),
        };
        format!(
            r#"
            // Thumbnail gallery
            function {function}(src) {{
                const mainImage = {main_lookup};
                if (!mainImage) return;
                const thumbnails = document.querySelectorAll('.{class}');
                thumbnails.forEach(thumb => thumb.classList.remove('active'));
                const clicked = window.event && window.event.target;
                if (clicked && clicked.classList.contains('{class}')) {{
                    clicked.classList.add('active');
                }}
                mainImage.style.opacity = '0';
                setTimeout(() => {{
                    mainImage.src = src;
                    mainImage.style.opacity = '1';
                }}, 150);
            }}

            document.addEventListener('DOMContentLoaded', function() {{
                const first = document.querySelector('.{class}');
                if (first) first.classList.add('active');
            }});
        "#,
            function = self.function,
            class = self.thumbnail_class,
        )
    }

    /// Install the handler into `html`. Returns the new markup when
    /// installed, `None` otherwise.
    pub fn install(&self, html: &str) -> (ScriptStatus, Option<String>) {
        let mut doc = Html::parse_document(html);
        let texts = inline_script_texts(&doc, &self.script);

        let definition = format!("function {}", self.function);
        let defined = texts.iter().any(|&id| {
            doc.tree
                .get(id)
                .and_then(|n| n.value().as_text())
                .is_some_and(|t| t.text.contains(definition.as_str()))
        });
        if defined {
            return (ScriptStatus::AlreadyPresent, None);
        }

        let calls_handler = doc
            .select(&self.clickable)
            .any(|el| el.value().attr("onclick") == Some(self.onclick.as_str()));
        if !calls_handler {
            return (ScriptStatus::NoThumbnails, None);
        }

        let Some(script_id) = doc
            .select(&self.script)
            .filter(|el| el.value().attr("src").is_none())
            .last()
            .map(|el| el.id())
        else {
            return (ScriptStatus::NoScript, None);
        };

        let snippet = self.snippet();
        let Some(mut script) = doc.tree.get_mut(script_id) else {
            return (ScriptStatus::NoScript, None);
        };
        let appended = match script.last_child() {
            Some(mut last) => match last.value() {
                Node::Text(Text { text }) => {
                    let joined = format!("{}{snippet}", &**text);
                    *text = joined.into();
                    true
                }
                _ => false,
            },
            None => false,
        };
        if !appended {
            script.append(Node::Text(Text {
                text: snippet.into(),
            }));
        }

        (ScriptStatus::Installed, Some(doc.html()))
    }
}

/// `mainImage` from selectors such as `img#mainImage`.
fn main_image_id(selector: &str) -> Option<String> {
    let (_, rest) = selector.split_once('#')?;
    let id: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installer() -> ScriptInstaller {
        ScriptInstaller::new(&Markup::default()).unwrap()
    }

    const THUMBS: &str = r#"<img id="mainImage" src="a.png"><div class="thumbnail-gallery"><img src="a.png" class="thumbnail-image" onclick="updateMainImage(this.src)"></div>"#;

    fn page(body: &str, scripts: &str) -> String {
        format!("<!DOCTYPE html><html><head></head><body>{body}{scripts}</body></html>")
    }

    #[test]
    fn installs_into_last_inline_script() {
        let html = page(
            THUMBS,
            "<script>var first = 1;</script><script>var last = 2;</script><script src=\"x.js\"></script>",
        );
        let (status, out) = installer().install(&html);
        assert_eq!(status, ScriptStatus::Installed);
        let out = out.unwrap();
        let def = out.find("function updateMainImage(src)").unwrap();
        assert!(out.find("var last = 2;").unwrap() < def);
        assert!(def < out.find("x.js").unwrap());
        assert!(out.contains("document.getElementById('mainImage')"));
    }

    #[test]
    fn second_install_is_a_no_op() {
        let html = page(THUMBS, "<script>var x = 1;</script>");
        let (_, out) = installer().install(&html);
        let (status, again) = installer().install(&out.unwrap());
        assert_eq!(status, ScriptStatus::AlreadyPresent);
        assert!(again.is_none());
    }

    #[test]
    fn page_without_thumbnails_untouched() {
        let html = page("<img id=\"mainImage\">", "<script>var x = 1;</script>");
        assert_eq!(installer().install(&html), (ScriptStatus::NoThumbnails, None));
    }

    #[test]
    fn page_without_inline_script() {
        let html = page(THUMBS, "<script src=\"app.js\"></script>");
        assert_eq!(installer().install(&html), (ScriptStatus::NoScript, None));
    }

    #[test]
    fn empty_inline_script_gets_text() {
        let html = page(THUMBS, "<script></script>");
        let (status, out) = installer().install(&html);
        assert_eq!(status, ScriptStatus::Installed);
        assert!(out.unwrap().contains("function updateMainImage(src)"));
    }

    #[test]
    fn main_image_id_from_selector() {
        assert_eq!(main_image_id("img#mainImage").as_deref(), Some("mainImage"));
        assert_eq!(main_image_id("#hero-img.big").as_deref(), Some("hero-img"));
        assert_eq!(main_image_id("img.main"), None);
    }
}
