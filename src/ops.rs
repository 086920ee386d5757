//! Shared operation wrappers for both interfaces (CLI and plugin).
//!
//! Each `op_*` function wraps one or more `algo`/`pipeline` calls and returns
//! a `serde_json::Value`, so neither clap nor nu-plugin leaks in here.

use std::path::Path;

use serde_json::{json, Value};

use crate::algo::catalog::Catalog;
use crate::algo::matcher::Match;
use crate::algo::similarity::{score_keys, Key};
use crate::algo::string_distance::Metric;
use crate::config::GalleryConfig;
use crate::error::{GalleryError, Result};
use crate::pipeline::{self, Gallery, RunOptions};

/// Folder table of the catalog at `root`.
pub fn op_catalog(root: &Path, config: &GalleryConfig) -> Result<Value> {
    let catalog = Catalog::build(root, &config.catalog.extensions)?;
    let folders: Vec<Value> = catalog
        .iter()
        .map(|(folder, images)| {
            json!({
                "folder": folder,
                "count": images.len(),
                "images": images,
            })
        })
        .collect();
    Ok(json!({
        "root": catalog.root().display().to_string(),
        "folders": folders,
    }))
}

/// Score one page name against one folder name, with the intermediate keys.
pub fn op_score(page: &str, folder: &str, config: &GalleryConfig) -> Value {
    let stop_words = config.stop_word_set();
    let page_key = Key::new(page, &stop_words);
    let folder_key = Key::new(folder, &stop_words);
    let score = score_keys(&page_key, &folder_key, &config.matching);
    json!({
        "page": page,
        "folder": folder,
        "page_tokens": page_key.tokens,
        "folder_tokens": folder_key.tokens,
        "page_slug": page_key.slug,
        "folder_slug": folder_key.slug,
        "token_similarity": score.token_similarity,
        "slug_bonus": score.slug_bonus,
        "score": score.total,
        "accepted": score.total >= config.matching.threshold,
    })
}

/// Match decision for `page` against the catalog at `root`, plus the `top`
/// best-ranked candidates. When nothing matches, the folder closest by
/// `metric` is suggested.
pub fn op_match(
    page: &str,
    root: &Path,
    top: usize,
    metric: &str,
    config: &GalleryConfig,
) -> Result<Value> {
    let metric = Metric::from_str(metric).ok_or_else(|| {
        GalleryError::Config(format!(
            "unknown metric '{metric}'. Use: {}",
            Metric::all_names().join(", ")
        ))
    })?;
    let catalog = Catalog::build(root, &config.catalog.extensions)?;
    let gallery = Gallery::new(config, catalog)?;
    let found = gallery
        .matcher()
        .best_match(page, gallery.catalog().folder_names());

    let candidates: Vec<Value> = gallery
        .matcher()
        .rank(page, gallery.catalog().folder_names())
        .into_iter()
        .take(top)
        .map(|(folder, score)| {
            json!({
                "folder": folder,
                "token_similarity": score.token_similarity,
                "slug_bonus": score.slug_bonus,
                "score": score.total,
            })
        })
        .collect();

    let (folder, source) = match &found {
        Some(Match::Override { folder }) => (Some(folder.as_str()), Some("override")),
        Some(Match::Heuristic { folder, .. }) => (Some(folder.as_str()), Some("heuristic")),
        None => (None, None),
    };
    let suggestion = match &found {
        Some(_) => Value::Null,
        None => serde_json::to_value(gallery.suggest(page, metric))?,
    };

    Ok(json!({
        "page": page,
        "folder": folder,
        "source": source,
        "threshold": config.matching.threshold,
        "candidates": candidates,
        "suggestion": suggestion,
    }))
}

/// Rewrite every product page of a site. Per-page failures are part of the
/// report; only catalog and configuration problems are returned as errors.
pub fn op_update(options: &RunOptions, config: &GalleryConfig) -> Result<Value> {
    let report = pipeline::run_update(config, options)?;
    Ok(serde_json::to_value(report)?)
}

/// Install the thumbnail click handler across a site.
pub fn op_install_script(options: &RunOptions, config: &GalleryConfig) -> Result<Value> {
    let reports = pipeline::run_install_script(config, options)?;
    Ok(serde_json::to_value(reports)?)
}

/// The effective configuration.
pub fn op_config(config: &GalleryConfig) -> Result<Value> {
    Ok(serde_json::to_value(config)?)
}
