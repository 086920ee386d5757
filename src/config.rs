use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::algo::rewrite::PageRewriter;
use crate::error::{GalleryError, Result};

/// Environment variable naming a config file to use when `--config` is absent.
pub const CONFIG_ENV: &str = "GALLERY_CONFIG";

/// Everything the matcher, selector and rewriter treat as policy.
///
/// Every section has defaults, so a config file only needs the keys it
/// changes. `overrides` is usually the only site-specific part.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    pub matching: Matching,
    /// Stop words grouped by category. Categories are only for readability;
    /// matching uses the union.
    pub stop_words: BTreeMap<String, Vec<String>>,
    pub selection: Selection,
    pub catalog: CatalogConfig,
    pub markup: Markup,
    pub assets: Assets,
    pub pages: Pages,
    /// Page file name → folder name, consulted before any scoring.
    pub overrides: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Matching {
    pub threshold: f64,
    pub exact_slug_bonus: f64,
    pub partial_slug_bonus: f64,
}

impl Default for Matching {
    fn default() -> Self {
        Self {
            threshold: 0.25,
            exact_slug_bonus: 0.6,
            partial_slug_bonus: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Selection {
    /// Bucket sizes, largest first. A folder with at least `b` images
    /// contributes exactly its first `b`.
    pub buckets: Vec<usize>,
    /// Take every image when the folder is smaller than the smallest bucket.
    pub take_remainder: bool,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            buckets: vec![6, 3],
            take_remainder: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Lowercase extensions without the dot.
    pub extensions: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            extensions: ["png", "jpg", "jpeg", "webp"].map(String::from).to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Markup {
    /// Pages without an element matching this selector are not product pages.
    pub page_marker: String,
    pub main_image: String,
    pub gallery: String,
    pub gallery_class: String,
    pub thumbnail_class: String,
    pub thumbnail_onclick: String,
    /// Thumbnails get `alt="{thumbnail_alt} N"`.
    pub thumbnail_alt: String,
    pub preload_function: String,
    /// Name of the JavaScript function the thumbnails call.
    pub gallery_function: String,
}

impl Default for Markup {
    fn default() -> Self {
        Self {
            page_marker: ".main-product-image".into(),
            main_image: "img#mainImage".into(),
            gallery: "div.thumbnail-gallery".into(),
            gallery_class: "thumbnail-gallery".into(),
            thumbnail_class: "thumbnail-image".into(),
            thumbnail_onclick: "updateMainImage(this.src)".into(),
            thumbnail_alt: "Product image".into(),
            preload_function: "preloadImage".into(),
            gallery_function: "updateMainImage".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Assets {
    /// Site-relative URL of the catalog root, `/`-separated. Also the default
    /// on-disk location of the catalog under the site root.
    pub url_prefix: String,
}

impl Default for Assets {
    fn default() -> Self {
        Self {
            url_prefix: "assets/images/products/All-Products".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Pages {
    /// Directory names never descended into during recursive discovery.
    /// Hidden directories are always skipped.
    pub skip_dirs: Vec<String>,
}

impl Default for Pages {
    fn default() -> Self {
        Self {
            skip_dirs: vec!["node_modules".into(), "backend".into()],
        }
    }
}

impl GalleryConfig {
    /// Built-in configuration: default policy plus the stop-word table the
    /// site's page names were written against.
    pub fn builtin() -> Self {
        let mut stop_words = BTreeMap::new();
        stop_words.insert(
            "filler".into(),
            ["and", "of", "the", "a", "an", "with"].map(String::from).to_vec(),
        );
        stop_words.insert(
            "business".into(),
            ["custom", "company", "profile"].map(String::from).to_vec(),
        );
        stop_words.insert(
            "location".into(),
            ["near", "me", "in", "lagos", "nigeria"].map(String::from).to_vec(),
        );
        Self {
            stop_words,
            ..Self::default()
        }
    }

    /// Union of every stop-word category, lowercased.
    pub fn stop_word_set(&self) -> BTreeSet<String> {
        self.stop_words
            .values()
            .flatten()
            .map(|w| w.to_lowercase())
            .collect()
    }

    /// Reject values that would make matching or selection meaningless.
    pub fn validate(&self) -> Result<()> {
        let m = &self.matching;
        for (name, v) in [
            ("matching.threshold", m.threshold),
            ("matching.exact_slug_bonus", m.exact_slug_bonus),
            ("matching.partial_slug_bonus", m.partial_slug_bonus),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(GalleryError::Config(format!(
                    "{name} must be a non-negative number, got {v}"
                )));
            }
        }
        if self.selection.buckets.contains(&0) {
            return Err(GalleryError::Config(
                "selection.buckets must not contain 0".into(),
            ));
        }
        if self.selection.buckets.windows(2).any(|w| w[0] <= w[1]) {
            return Err(GalleryError::Config(
                "selection.buckets must be strictly descending".into(),
            ));
        }
        if self.assets.url_prefix.trim_matches('/').is_empty() {
            return Err(GalleryError::Config("assets.url_prefix is empty".into()));
        }
        if !PageRewriter::new(&self.markup)?.finds_own_gallery() {
            return Err(GalleryError::Config(format!(
                "markup.gallery '{}' does not match a gallery built with markup.gallery_class '{}'",
                self.markup.gallery, self.markup.gallery_class
            )));
        }
        Ok(())
    }

    /// Catalog location on disk for a site rooted at `site`.
    pub fn catalog_dir(&self, site: &Path) -> PathBuf {
        self.assets
            .url_prefix
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(site.to_path_buf(), |p, seg| p.join(seg))
    }
}

/// Parse a config from a JSON string. Missing keys take defaults; the
/// built-in stop words apply only when the file has no `stop_words` key.
pub fn parse_config(json: &str) -> Result<GalleryConfig> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let has_stop_words = value.get("stop_words").is_some();
    let mut config: GalleryConfig = serde_json::from_value(value)?;
    if !has_stop_words {
        config.stop_words = GalleryConfig::builtin().stop_words;
    }
    config.validate()?;
    Ok(config)
}

/// Load a config from a file path.
pub fn load_config(path: &Path) -> Result<GalleryConfig> {
    let json = std::fs::read_to_string(path).map_err(|e| GalleryError::io(path, e))?;
    parse_config(&json).map_err(|e| match e {
        GalleryError::Io { .. } => e,
        other => GalleryError::Config(format!("{}: {other}", path.display())),
    })
}

/// Resolve the effective configuration:
///
/// 1. `explicit` path (errors are returned)
/// 2. `$GALLERY_CONFIG`
/// 3. `$XDG_DATA_HOME/gallery/config.json` (or `~/.local/share/...`)
/// 4. [`GalleryConfig::builtin`]
///
/// Failures in steps 2 and 3 are logged and fall through.
pub fn resolve_config(explicit: Option<&Path>) -> Result<GalleryConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        match load_config(Path::new(&path)) {
            Ok(config) => {
                debug!(path = %path, "config from {CONFIG_ENV}");
                return Ok(config);
            }
            Err(e) => warn!("ignoring {CONFIG_ENV}: {e}"),
        }
    }

    if let Some(path) = xdg_config_path() {
        if path.exists() {
            match load_config(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "config from data dir");
                    return Ok(config);
                }
                Err(e) => warn!("ignoring {}: {e}", path.display()),
            }
        }
    }

    Ok(GalleryConfig::builtin())
}

fn xdg_config_path() -> Option<PathBuf> {
    let data_home = std::env::var("XDG_DATA_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".local/share"))
        })?;
    Some(data_home.join("gallery/config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_stop_words_cover_site_vocabulary() {
        let set = GalleryConfig::builtin().stop_word_set();
        for w in [
            "custom", "company", "profile", "near", "me", "in", "lagos", "nigeria", "and", "of",
            "the", "a", "an", "with",
        ] {
            assert!(set.contains(w), "missing stop word {w}");
        }
        assert_eq!(set.len(), 14);
    }

    #[test]
    fn builtin_is_valid() {
        GalleryConfig::builtin().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(r#"{"matching": {"threshold": 0.5}}"#).unwrap();
        assert_eq!(config.matching.threshold, 0.5);
        assert_eq!(config.matching.exact_slug_bonus, 0.6);
        assert_eq!(config.selection.buckets, vec![6, 3]);
        assert_eq!(config.stop_word_set().len(), 14);
    }

    #[test]
    fn explicit_stop_words_replace_builtin() {
        let config = parse_config(r#"{"stop_words": {"site": ["Printing"]}}"#).unwrap();
        let set = config.stop_word_set();
        assert_eq!(set.len(), 1);
        assert!(set.contains("printing"));
    }

    #[test]
    fn overrides_parse() {
        let config = parse_config(r#"{"overrides": {"mugs.html": "mug"}}"#).unwrap();
        assert_eq!(config.overrides.get("mugs.html").map(String::as_str), Some("mug"));
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(parse_config(r#"{"threshold": 0.3}"#).is_err());
    }

    #[test]
    fn ascending_buckets_rejected() {
        let err = parse_config(r#"{"selection": {"buckets": [3, 6]}}"#).unwrap_err();
        assert!(err.to_string().contains("descending"));
    }

    #[test]
    fn gallery_selector_disagreeing_with_class_rejected() {
        let json = r#"{"markup": {"gallery": "div.thumbs"}}"#;
        let err = parse_config(json).unwrap_err();
        assert!(err.to_string().contains("div.thumbs"));

        let json = r#"{"markup": {"gallery": "div.thumbs", "gallery_class": "thumbs"}}"#;
        assert!(parse_config(json).is_ok());
    }

    #[test]
    fn negative_threshold_rejected() {
        assert!(parse_config(r#"{"matching": {"threshold": -1}}"#).is_err());
    }

    #[test]
    fn config_roundtrip() {
        let config = GalleryConfig::builtin();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(parse_config(&json).unwrap(), config);
    }

    #[test]
    fn catalog_dir_joins_prefix_segments() {
        let config = GalleryConfig::builtin();
        let dir = config.catalog_dir(Path::new("site"));
        assert_eq!(
            dir,
            Path::new("site")
                .join("assets")
                .join("images")
                .join("products")
                .join("All-Products")
        );
    }

    #[test]
    fn shipped_site_profile_is_valid() {
        let json = include_str!("../config/inksnap.json");
        let config = parse_config(json).unwrap();
        assert_eq!(config.overrides.get("mugs.html").map(String::as_str), Some("mug"));
        assert_eq!(config.overrides.len(), 17);
    }
}
