//! Site-level runs: discover pages, plan each one, apply, report.
//!
//! Pages are processed one at a time. A failure on one page is recorded in
//! its report and the run moves on; only catalog or configuration problems
//! abort a run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::algo::asset_path::image_url;
use crate::algo::catalog::Catalog;
use crate::algo::matcher::{pick_images, FolderMatcher, Match};
use crate::algo::rewrite::{GalleryEdit, PageRewriter, RewriteOutcome, RewriteTarget};
use crate::algo::script::{ScriptInstaller, ScriptStatus};
use crate::algo::string_distance::{self, Metric};
use crate::config::GalleryConfig;
use crate::error::{GalleryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageStatus {
    Updated,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    #[serde(rename = "no-match")]
    NoMatch,
    #[serde(rename = "no-images")]
    NoImages,
    #[serde(rename = "no-picked")]
    NoPicked,
    #[serde(rename = "no-mainImage")]
    NoMainImage,
    #[serde(rename = "error")]
    Error,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoMatch => "no-match",
            Self::NoImages => "no-images",
            Self::NoPicked => "no-picked",
            Self::NoMainImage => "no-mainImage",
            Self::Error => "error",
        }
    }
}

/// Closest folder by edit distance, attached to `no-match` reports as a hint
/// for the override table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub folder: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub page: String,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gallery: Option<GalleryEdit>,
    pub preload: bool,
    /// False when the rewrite reproduced the page byte for byte, or on a dry run.
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PageReport {
    fn skipped(page: &str, reason: SkipReason) -> Self {
        Self {
            page: page.to_string(),
            status: PageStatus::Skipped,
            reason: Some(reason),
            folder: None,
            matched_by: None,
            images: None,
            gallery: None,
            preload: false,
            written: false,
            suggestion: None,
            message: None,
        }
    }

    fn failed(page: &str, err: &GalleryError) -> Self {
        Self {
            message: Some(err.to_string()),
            ..Self::skipped(page, SkipReason::Error)
        }
    }

    fn with_folder(mut self, folder: &Match) -> Self {
        self.folder = Some(folder.folder().to_string());
        self.matched_by = Some(match folder {
            Match::Override { .. } => "override",
            Match::Heuristic { .. } => "heuristic",
        });
        self
    }
}

/// `page: OK [folder] (n)` / `page: SKIP [folder] - reason`
impl fmt::Display for PageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            PageStatus::Updated => "OK",
            PageStatus::Skipped if self.reason == Some(SkipReason::Error) => "ERROR",
            PageStatus::Skipped => "SKIP",
        };
        write!(f, "{}: {status}", self.page)?;
        if let Some(folder) = &self.folder {
            write!(f, " [{folder}]")?;
        }
        if let Some(images) = &self.images {
            write!(f, " ({})", images.len())?;
        }
        if let Some(reason) = self.reason {
            write!(f, " - {}", reason.as_str())?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(s) = &self.suggestion {
            write!(f, " (closest: {} {:.2})", s.folder, s.similarity)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub updated: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn from_reports(reports: &[PageReport]) -> Self {
        reports.iter().fold(Self::default(), |mut acc, r| {
            match r.status {
                PageStatus::Updated => acc.updated += 1,
                PageStatus::Skipped => acc.skipped += 1,
            }
            acc
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Updated: {}, Skipped: {}", self.updated, self.skipped)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub catalog_root: PathBuf,
    pub folders: usize,
    pub pages: Vec<PageReport>,
    pub summary: Summary,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub site: PathBuf,
    /// Catalog root; defaults to the configured URL prefix under `site`.
    pub images: Option<PathBuf>,
    pub recursive: bool,
    pub dry_run: bool,
    pub backup: bool,
}

impl RunOptions {
    pub fn new(site: impl Into<PathBuf>) -> Self {
        Self {
            site: site.into(),
            ..Self::default()
        }
    }

    pub fn catalog_root(&self, config: &GalleryConfig) -> PathBuf {
        self.images
            .clone()
            .unwrap_or_else(|| config.catalog_dir(&self.site))
    }
}

/// What would be done to one page, before its markup is read.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Rewrite {
        found: Match,
        images: Vec<String>,
        target: RewriteTarget,
    },
    Skip {
        reason: SkipReason,
        found: Option<Match>,
    },
}

/// Matching, validated and compiled once per run.
pub struct Gallery<'a> {
    config: &'a GalleryConfig,
    catalog: Catalog,
    matcher: FolderMatcher<'a>,
    rewriter: PageRewriter,
}

impl<'a> Gallery<'a> {
    pub fn new(config: &'a GalleryConfig, catalog: Catalog) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            catalog,
            matcher: FolderMatcher::new(
                config.stop_word_set(),
                &config.matching,
                &config.overrides,
            ),
            rewriter: PageRewriter::new(&config.markup)?,
        })
    }

    /// Build the catalog from disk. Failure here is fatal for a run.
    pub fn open(config: &'a GalleryConfig, catalog_root: &Path) -> Result<Self> {
        let catalog = Catalog::build(catalog_root, &config.catalog.extensions)?;
        info!(
            root = %catalog_root.display(),
            folders = catalog.len(),
            "catalog built"
        );
        Self::new(config, catalog)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn matcher(&self) -> &FolderMatcher<'a> {
        &self.matcher
    }

    /// Decide folder and images for `page_file`. Pure: reads only the catalog.
    pub fn plan(&self, page_file: &str) -> Result<Plan> {
        let Some(found) = self
            .matcher
            .best_match(page_file, self.catalog.folder_names())
        else {
            return Ok(Plan::Skip {
                reason: SkipReason::NoMatch,
                found: None,
            });
        };

        let Some(all) = self.catalog.images(found.folder()) else {
            return Err(GalleryError::OverrideFolderMissing(found.folder().to_string()));
        };
        if all.is_empty() {
            return Ok(Plan::Skip {
                reason: SkipReason::NoImages,
                found: Some(found),
            });
        }

        let selection = &self.config.selection;
        let picked = pick_images(all, &selection.buckets, selection.take_remainder);
        if picked.is_empty() {
            return Ok(Plan::Skip {
                reason: SkipReason::NoPicked,
                found: Some(found),
            });
        }

        let urls = picked
            .iter()
            .map(|img| image_url(&self.config.assets.url_prefix, found.folder(), img))
            .collect();
        Ok(Plan::Rewrite {
            images: picked.to_vec(),
            target: RewriteTarget::new(urls),
            found,
        })
    }

    /// Nearest folder for an unmatched page, for the report only.
    pub fn suggest(&self, page_file: &str, metric: Metric) -> Option<Suggestion> {
        string_distance::closest(page_file, self.catalog.folder_names(), metric).map(
            |(folder, similarity)| Suggestion {
                folder: folder.to_string(),
                similarity,
            },
        )
    }

    /// Plan and rewrite one page's markup. Returns the report and, for an
    /// updated page, the new markup.
    pub fn process_markup(&self, page_file: &str, html: &str) -> Result<(PageReport, Option<String>)> {
        let (found, images, target) = match self.plan(page_file)? {
            Plan::Rewrite {
                found,
                images,
                target,
            } => (found, images, target),
            Plan::Skip { reason, found } => {
                let mut report = PageReport::skipped(page_file, reason);
                if let Some(found) = &found {
                    report = report.with_folder(found);
                }
                if reason == SkipReason::NoMatch {
                    report.suggestion = self.suggest(page_file, Metric::JaroWinkler);
                }
                return Ok((report, None));
            }
        };

        match self.rewriter.rewrite(html, &target)? {
            RewriteOutcome::MissingMainImage => Ok((
                PageReport::skipped(page_file, SkipReason::NoMainImage).with_folder(&found),
                None,
            )),
            RewriteOutcome::Rewritten(rewritten) => {
                let report = PageReport {
                    page: page_file.to_string(),
                    status: PageStatus::Updated,
                    reason: None,
                    folder: None,
                    matched_by: None,
                    images: Some(images),
                    gallery: Some(rewritten.gallery),
                    preload: rewritten.preload,
                    written: false,
                    suggestion: None,
                    message: None,
                }
                .with_folder(&found);
                Ok((report, Some(rewritten.html)))
            }
        }
    }

    /// Process one page file on disk.
    pub fn process_page(&self, path: &Path, options: &RunOptions) -> Result<PageReport> {
        let page_file = page_file_name(path);
        let html = fs::read_to_string(path).map_err(|e| GalleryError::io(path, e))?;
        let (mut report, rewritten) = self.process_markup(&page_file, &html)?;

        if let Some(new_html) = rewritten {
            if new_html != html && !options.dry_run {
                if options.backup {
                    backup_once(path)?;
                }
                write_atomic(path, &new_html)?;
                report.written = true;
            }
        }
        Ok(report)
    }

    /// Rewrite every product page under `options.site`.
    pub fn update_site(&self, options: &RunOptions) -> Result<Vec<PageReport>> {
        self.update_site_with(options, |_| {})
    }

    /// Like [`Gallery::update_site`], handing each report to `on_page` as
    /// soon as its page is done.
    pub fn update_site_with(
        &self,
        options: &RunOptions,
        mut on_page: impl FnMut(&PageReport),
    ) -> Result<Vec<PageReport>> {
        let mut reports = Vec::new();
        for path in discover_pages(&options.site, options.recursive, &self.config.pages.skip_dirs)? {
            let page_file = page_file_name(&path);
            let is_product = match fs::read_to_string(&path) {
                Ok(html) => self.rewriter.is_product_page(&html),
                Err(e) => {
                    let err = GalleryError::io(&path, e);
                    error!(page = %page_file, "{err}");
                    let report = PageReport::failed(&page_file, &err);
                    on_page(&report);
                    reports.push(report);
                    continue;
                }
            };
            if !is_product {
                debug!(page = %page_file, "not a product page");
                continue;
            }

            let report = match self.process_page(&path, options) {
                Ok(report) => report,
                Err(err) => {
                    error!(page = %page_file, "{err}");
                    PageReport::failed(&page_file, &err)
                }
            };
            log_report(&report);
            on_page(&report);
            reports.push(report);
        }
        Ok(reports)
    }
}

fn log_report(report: &PageReport) {
    match report.status {
        PageStatus::Updated => info!(
            page = %report.page,
            folder = report.folder.as_deref().unwrap_or_default(),
            written = report.written,
            "updated"
        ),
        PageStatus::Skipped => {
            if report.reason != Some(SkipReason::Error) {
                warn!(
                    page = %report.page,
                    reason = report.reason.map(|r| r.as_str()).unwrap_or_default(),
                    "skipped"
                );
            }
        }
    }
}

/// Build the catalog, then rewrite every product page under the site.
pub fn run_update(config: &GalleryConfig, options: &RunOptions) -> Result<RunReport> {
    run_update_with(config, options, |_| {})
}

/// [`run_update`] with a per-page callback, for front ends that print
/// progress while the run is going.
pub fn run_update_with(
    config: &GalleryConfig,
    options: &RunOptions,
    on_page: impl FnMut(&PageReport),
) -> Result<RunReport> {
    let catalog_root = options.catalog_root(config);
    let gallery = Gallery::open(config, &catalog_root)?;
    let pages = gallery.update_site_with(options, on_page)?;
    let summary = Summary::from_reports(&pages);
    info!(updated = summary.updated, skipped = summary.skipped, "run finished");
    Ok(RunReport {
        catalog_root,
        folders: gallery.catalog().len(),
        pages,
        summary,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptReport {
    pub page: String,
    pub status: ScriptStatus,
    pub written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Add the thumbnail click handler to every page that needs it.
pub fn run_install_script(config: &GalleryConfig, options: &RunOptions) -> Result<Vec<ScriptReport>> {
    let installer = ScriptInstaller::new(&config.markup)?;
    let mut reports = Vec::new();
    for path in discover_pages(&options.site, options.recursive, &config.pages.skip_dirs)? {
        let page = page_file_name(&path);
        let result = fs::read_to_string(&path)
            .map_err(|e| GalleryError::io(&path, e))
            .and_then(|html| {
                let (status, new_html) = installer.install(&html);
                let mut written = false;
                if let Some(new_html) = new_html {
                    if !options.dry_run {
                        if options.backup {
                            backup_once(&path)?;
                        }
                        write_atomic(&path, &new_html)?;
                        written = true;
                    }
                }
                Ok((status, written))
            });
        let report = match result {
            Ok((status, written)) => {
                debug!(page = %page, status = status.as_str(), "gallery script");
                ScriptReport {
                    page,
                    status,
                    written,
                    message: None,
                }
            }
            Err(err) => {
                error!(page = %page, "{err}");
                ScriptReport {
                    page,
                    status: ScriptStatus::Error,
                    written: false,
                    message: Some(err.to_string()),
                }
            }
        };
        reports.push(report);
    }
    Ok(reports)
}

/// `*.html` files under `site`, sorted. Without `recursive` only the top
/// level is listed. Hidden directories and `skip_dirs` are never entered.
pub fn discover_pages(site: &Path, recursive: bool, skip_dirs: &[String]) -> Result<Vec<PathBuf>> {
    if !site.is_dir() {
        return Err(GalleryError::NotADirectory(site.to_path_buf()));
    }
    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(site)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !skip_dirs.iter().any(|d| d.as_str() == name.as_ref())
        });

    let mut pages = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| site.to_path_buf());
            match e.into_io_error() {
                Some(io) => GalleryError::io(path, io),
                None => GalleryError::NotADirectory(path),
            }
        })?;
        let is_html = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
        if entry.file_type().is_file() && is_html {
            pages.push(entry.into_path());
        }
    }
    Ok(pages)
}

fn page_file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Copy `path` to `path.backup` unless a backup already exists.
fn backup_once(path: &Path) -> Result<()> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".backup");
    let backup = PathBuf::from(backup);
    if !backup.exists() {
        fs::copy(path, &backup).map_err(|e| GalleryError::io(&backup, e))?;
        info!(backup = %backup.display(), "created backup");
    }
    Ok(())
}

/// Write through a sibling temp file renamed over the target.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents).map_err(|e| GalleryError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        GalleryError::io(path, e)
    })
}
