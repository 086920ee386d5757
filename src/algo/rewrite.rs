//! Structural page edits: main image, thumbnail gallery and preload hint.
//!
//! Pages are parsed into an html5ever tree, the target nodes are located with
//! CSS selectors, mutated in place, and the whole document is serialized back.
//! Nothing here touches the filesystem.

use ego_tree::{NodeId, NodeMut, NodeRef};
use regex::{NoExpand, Regex};
use scraper::node::Text;
use scraper::{Html, Node, Selector};
use serde::Serialize;

use crate::config::Markup;
use crate::error::{GalleryError, Result};

const GALLERY_INDENT: &str = "                        ";
const THUMBNAIL_INDENT: &str = "                            ";

/// Ordered image URLs for one page. The first is the main image.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteTarget {
    pub images: Vec<String>,
}

impl RewriteTarget {
    pub fn new(images: Vec<String>) -> Self {
        Self { images }
    }

    pub fn main(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GalleryEdit {
    Replaced,
    Inserted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    pub html: String,
    pub gallery: GalleryEdit,
    /// Whether a preload hint was found and pointed at the main image.
    pub preload: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RewriteOutcome {
    Rewritten(Rewritten),
    MissingMainImage,
}

/// Compiled selectors and patterns for one [`Markup`] configuration.
pub struct PageRewriter {
    markup: Markup,
    marker: Selector,
    main_image: Selector,
    gallery: Selector,
    script: Selector,
    preload: Regex,
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| GalleryError::Selector(format!("{selector}: {e}")))
}

pub(crate) fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Append deep copies of `source`'s children under `target`.
pub(crate) fn append_subtree(target: &mut NodeMut<'_, Node>, source: NodeRef<'_, Node>) {
    for child in source.children() {
        let mut copy = target.append(child.value().clone());
        append_subtree(&mut copy, child);
    }
}

/// Child of `container` that is `target` or one of its ancestors.
fn holding_child(doc: &Html, container: NodeId, target: NodeId) -> Option<NodeId> {
    let target = doc.tree.get(target)?;
    std::iter::once(target)
        .chain(target.ancestors())
        .find(|n| n.parent().map(|p| p.id()) == Some(container))
        .map(|n| n.id())
}

/// Ids of text nodes directly inside inline (no `src`) script elements,
/// in document order.
pub(crate) fn inline_script_texts(doc: &Html, script: &Selector) -> Vec<NodeId> {
    let mut ids = Vec::new();
    for element in doc.select(script) {
        if element.value().attr("src").is_some() {
            continue;
        }
        for child in element.children() {
            if child.value().is_text() {
                ids.push(child.id());
            }
        }
    }
    ids
}

impl PageRewriter {
    pub fn new(markup: &Markup) -> Result<Self> {
        let preload = Regex::new(&format!(
            r#"{}\(["'][^"']+["']\)"#,
            regex::escape(&markup.preload_function)
        ))
        .map_err(|e| GalleryError::Config(format!("preload_function: {e}")))?;
        Ok(Self {
            markup: markup.clone(),
            marker: parse_selector(&markup.page_marker)?,
            main_image: parse_selector(&markup.main_image)?,
            gallery: parse_selector(&markup.gallery)?,
            script: parse_selector("script")?,
            preload,
        })
    }

    /// Whether `html` is a product page this tool should touch at all.
    pub fn is_product_page(&self, html: &str) -> bool {
        Html::parse_document(html).select(&self.marker).next().is_some()
    }

    /// Gallery container markup for `images`, one thumbnail per line.
    pub fn gallery_markup(&self, images: &[String]) -> String {
        let m = &self.markup;
        let mut out = format!(
            "<div class=\"{}\">\n",
            escape_attr(&m.gallery_class)
        );
        for (i, src) in images.iter().enumerate() {
            out.push_str(&format!(
                "{THUMBNAIL_INDENT}<img src=\"{}\" alt=\"{} {}\" class=\"{}\" onclick=\"{}\" loading=\"lazy\" decoding=\"async\">\n",
                escape_attr(src),
                escape_attr(&m.thumbnail_alt),
                i + 1,
                escape_attr(&m.thumbnail_class),
                escape_attr(&m.thumbnail_onclick),
            ));
        }
        out.push_str(GALLERY_INDENT);
        out.push_str("</div>");
        out
    }

    /// Point the page's main image, thumbnail gallery and preload hint at
    /// `target`'s images.
    pub fn rewrite(&self, html: &str, target: &RewriteTarget) -> Result<RewriteOutcome> {
        let Some(main_src) = target.main() else {
            return Err(GalleryError::Config("rewrite target has no images".into()));
        };

        let mut doc = Html::parse_document(html);
        let Some(main_id) = doc.select(&self.main_image).next().map(|el| el.id()) else {
            return Ok(RewriteOutcome::MissingMainImage);
        };

        self.set_main_src(&mut doc, main_id, main_src);
        let gallery = self.replace_gallery(&mut doc, main_id, &target.images);
        let preload = self.update_preload(&mut doc, main_src);

        Ok(RewriteOutcome::Rewritten(Rewritten {
            html: doc.html(),
            gallery,
            preload,
        }))
    }

    /// Swap the element for a copy with `src` replaced (or prepended),
    /// keeping its other attributes in order. Children are untouched.
    fn set_main_src(&self, doc: &mut Html, main_id: NodeId, src: &str) {
        let Some(element) = doc.tree.get(main_id).and_then(|n| n.value().as_element()) else {
            return;
        };
        let name = element.name().to_string();

        let mut tag = format!("<{name}");
        if element.attr("src").is_none() {
            tag.push_str(&format!(" src=\"{}\"", escape_attr(src)));
        }
        for (attr, value) in element.attrs() {
            let value = if attr == "src" { src } else { value };
            tag.push_str(&format!(" {attr}=\"{}\"", escape_attr(value)));
        }
        tag.push('>');

        let fragment = Html::parse_fragment(&tag);
        let Some(replacement) = fragment
            .root_element()
            .children()
            .find_map(|n| n.value().as_element().cloned())
        else {
            return;
        };
        if let Some(mut node) = doc.tree.get_mut(main_id) {
            *node.value() = Node::Element(replacement);
        }
    }

    fn replace_gallery(&self, doc: &mut Html, main_id: NodeId, images: &[String]) -> GalleryEdit {
        let fragment = Html::parse_fragment(&format!(
            "\n{GALLERY_INDENT}{}",
            self.gallery_markup(images)
        ));
        let existing = doc.select(&self.gallery).next().map(|el| el.id());

        match existing {
            Some(container_id) => {
                // The main image may live inside the gallery container; the
                // child holding it stays, everything else is replaced.
                let keep = holding_child(doc, container_id, main_id);
                let children: Vec<NodeId> = doc
                    .tree
                    .get(container_id)
                    .map(|c| c.children().map(|n| n.id()).collect())
                    .unwrap_or_default();
                for id in children {
                    if Some(id) == keep {
                        continue;
                    }
                    if let Some(mut child) = doc.tree.get_mut(id) {
                        child.detach();
                    }
                }
                let div = fragment
                    .root_element()
                    .children()
                    .find(|n| n.value().is_element());
                if let (Some(mut container), Some(div)) = (doc.tree.get_mut(container_id), div) {
                    append_subtree(&mut container, div);
                }
                GalleryEdit::Replaced
            }
            None => {
                let mut anchor = main_id;
                for top in fragment.root_element().children() {
                    let Some(mut at) = doc.tree.get_mut(anchor) else {
                        break;
                    };
                    let mut copy = at.insert_after(top.value().clone());
                    append_subtree(&mut copy, top);
                    anchor = copy.id();
                }
                GalleryEdit::Inserted
            }
        }
    }

    /// Whether a gallery built from this markup is found again by the
    /// gallery selector. If not, every run would insert another gallery.
    pub fn finds_own_gallery(&self) -> bool {
        let fragment = Html::parse_fragment(&self.gallery_markup(&["x.png".to_string()]));
        fragment.select(&self.gallery).next().is_some()
    }

    /// Rewrite the first preload call found in inline script text.
    fn update_preload(&self, doc: &mut Html, src: &str) -> bool {
        let call = format!("{}('{}')", self.markup.preload_function, src);
        for id in inline_script_texts(doc, &self.script) {
            let Some(mut node) = doc.tree.get_mut(id) else {
                continue;
            };
            if let Node::Text(Text { text }) = node.value() {
                if self.preload.is_match(&**text) {
                    let replaced = self.preload.replace(&**text, NoExpand(&call)).into_owned();
                    *text = replaced.into();
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN: &str = "assets/images/products/All-Products/mug/a.png";
    const SECOND: &str = "assets/images/products/All-Products/mug/b.png";

    fn rewriter() -> PageRewriter {
        PageRewriter::new(&Markup::default()).unwrap()
    }

    fn target() -> RewriteTarget {
        RewriteTarget::new(vec![MAIN.into(), SECOND.into()])
    }

    fn page(body: &str) -> String {
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<title>Mugs</title>\n</head>\n<body>\n<div class=\"main-product-image\">\n{body}\n</div>\n<script>\nfunction preloadImage(src) {{ new Image().src = src; }}\npreloadImage('placeholder.svg');\n</script>\n</body>\n</html>\n"
        )
    }

    fn rewritten(html: &str) -> Rewritten {
        match rewriter().rewrite(html, &target()).unwrap() {
            RewriteOutcome::Rewritten(r) => r,
            RewriteOutcome::MissingMainImage => panic!("main image not found"),
        }
    }

    fn srcs(html: &str, selector: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        let sel = Selector::parse(selector).unwrap();
        doc.select(&sel)
            .filter_map(|el| el.value().attr("src").map(String::from))
            .collect()
    }

    #[test]
    fn replaces_main_src_keeping_other_attributes() {
        let html = page(r#"<img id="mainImage" class="hero" src="/placeholder.svg" alt="Mug" width="400">"#);
        let out = rewritten(&html).html;
        assert!(out.contains(&format!(
            r#"<img id="mainImage" class="hero" src="{MAIN}" alt="Mug" width="400">"#
        )));
    }

    #[test]
    fn inserts_missing_src_first() {
        let html = page(r#"<img id="mainImage" alt="Mug">"#);
        let out = rewritten(&html).html;
        assert!(out.contains(&format!(r#"<img src="{MAIN}" id="mainImage" alt="Mug">"#)));
    }

    #[test]
    fn missing_main_image_is_reported() {
        let html = page(r#"<img id="other" src="x.png">"#);
        let outcome = rewriter().rewrite(&html, &target()).unwrap();
        assert_eq!(outcome, RewriteOutcome::MissingMainImage);
    }

    #[test]
    fn replaces_existing_gallery_contents() {
        let html = page(
            r#"<img id="mainImage" src="old.png">
<div class="thumbnail-gallery" data-keep="yes"><img src="old1.png"><img src="old2.png"><img src="old3.png"><p>stray</p></div>"#,
        );
        let r = rewritten(&html);
        assert_eq!(r.gallery, GalleryEdit::Replaced);
        assert_eq!(srcs(&r.html, ".thumbnail-gallery img"), vec![MAIN, SECOND]);
        assert!(r.html.contains(r#"data-keep="yes""#));
        assert!(!r.html.contains("stray"));
        assert_eq!(r.html.matches("thumbnail-gallery").count(), 1);
    }

    #[test]
    fn main_image_inside_gallery_survives() {
        let html = page(
            r#"<div class="thumbnail-gallery"><img id="mainImage" src="old.png"><img src="old1.png"></div>"#,
        );
        let r = rewritten(&html);
        assert_eq!(r.gallery, GalleryEdit::Replaced);
        assert_eq!(srcs(&r.html, "img#mainImage"), vec![MAIN]);
        assert_eq!(srcs(&r.html, "img.thumbnail-image"), vec![MAIN, SECOND]);
        assert!(!r.html.contains("old1.png"));

        let again = rewritten(&r.html);
        assert_eq!(again.html, r.html);
    }

    #[test]
    fn main_image_nested_deeper_in_gallery_survives() {
        let html = page(
            r#"<div class="thumbnail-gallery"><figure><img id="mainImage" src="old.png"></figure><img src="old1.png"></div>"#,
        );
        let r = rewritten(&html);
        assert_eq!(srcs(&r.html, "figure img#mainImage"), vec![MAIN]);
        assert_eq!(srcs(&r.html, "img.thumbnail-image").len(), 2);
    }

    #[test]
    fn gallery_selector_must_find_generated_gallery() {
        assert!(rewriter().finds_own_gallery());
        let markup = Markup {
            gallery: "div.thumbs".into(),
            ..Markup::default()
        };
        assert!(!PageRewriter::new(&markup).unwrap().finds_own_gallery());
    }

    #[test]
    fn inserts_gallery_after_main_image() {
        let html = page(r#"<img id="mainImage" src="old.png"><span id="after"></span>"#);
        let r = rewritten(&html);
        assert_eq!(r.gallery, GalleryEdit::Inserted);
        let main_at = r.html.find("mainImage").unwrap();
        let gallery_at = r.html.find("thumbnail-gallery").unwrap();
        let after_at = r.html.find(r#"id="after""#).unwrap();
        assert!(main_at < gallery_at && gallery_at < after_at);
        assert_eq!(srcs(&r.html, ".thumbnail-gallery img"), vec![MAIN, SECOND]);
    }

    #[test]
    fn thumbnails_carry_handler_lazy_loading_and_labels() {
        let r = rewritten(&page(r#"<img id="mainImage" src="old.png">"#));
        assert!(r.html.contains(&format!(
            r#"<img src="{SECOND}" alt="Product image 2" class="thumbnail-image" onclick="updateMainImage(this.src)" loading="lazy" decoding="async">"#
        )));
        assert!(r.html.contains(r#"alt="Product image 1""#));
    }

    #[test]
    fn preload_points_at_main_image() {
        let r = rewritten(&page(r#"<img id="mainImage" src="old.png">"#));
        assert!(r.preload);
        assert!(r.html.contains(&format!("preloadImage('{MAIN}');")));
        assert!(!r.html.contains("placeholder.svg"));
        // Function definition takes an identifier, not a literal; untouched.
        assert!(r.html.contains("function preloadImage(src)"));
    }

    #[test]
    fn page_without_preload_is_fine() {
        let html = "<html><body><img id=\"mainImage\" src=\"x.png\"></body></html>";
        let r = rewritten(html);
        assert!(!r.preload);
        assert_eq!(srcs(&r.html, "#mainImage"), vec![MAIN]);
    }

    #[test]
    fn external_script_is_not_searched() {
        let html = "<html><body><img id=\"mainImage\" src=\"x.png\"><script src=\"app.js\">preloadImage('x.png')</script></body></html>";
        assert!(!rewritten(html).preload);
    }

    #[test]
    fn three_regions_agree() {
        let r = rewritten(&page(r#"<img id="mainImage" src="old.png">"#));
        let main = srcs(&r.html, "#mainImage");
        let thumbs = srcs(&r.html, ".thumbnail-gallery img");
        assert_eq!(main[0], thumbs[0]);
        assert!(r.html.contains(&format!("preloadImage('{}')", main[0])));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let html = page(r#"<img id="mainImage" src="old.png" alt="Mug">"#);
        let first = rewritten(&html).html;
        let second = rewritten(&first);
        assert_eq!(second.gallery, GalleryEdit::Replaced);
        assert_eq!(first, second.html);
    }

    #[test]
    fn attribute_values_escaped() {
        let target = RewriteTarget::new(vec!["a/b/c\"d.png".into()]);
        let html = page(r#"<img id="mainImage" src="old.png">"#);
        let RewriteOutcome::Rewritten(r) = rewriter().rewrite(&html, &target).unwrap() else {
            panic!("main image not found");
        };
        assert_eq!(srcs(&r.html, "#mainImage"), vec!["a/b/c\"d.png"]);
    }

    #[test]
    fn empty_target_is_an_error() {
        let html = page(r#"<img id="mainImage" src="old.png">"#);
        assert!(rewriter().rewrite(&html, &RewriteTarget::new(vec![])).is_err());
    }

    #[test]
    fn product_page_detection() {
        let r = rewriter();
        assert!(r.is_product_page(&page("")));
        assert!(!r.is_product_page("<html><body><p>About us</p></body></html>"));
    }

    #[test]
    fn invalid_selector_rejected() {
        let markup = Markup {
            main_image: "img[".into(),
            ..Markup::default()
        };
        assert!(matches!(
            PageRewriter::new(&markup),
            Err(GalleryError::Selector(_))
        ));
    }
}
