use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use super::similarity::{score_keys, Key, Score};
use crate::config::Matching;

/// How a folder was chosen for a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum Match {
    /// Named by the override table; never scored.
    Override { folder: String },
    /// Best heuristic candidate at or above the threshold.
    Heuristic { folder: String, score: Score },
}

impl Match {
    pub fn folder(&self) -> &str {
        match self {
            Self::Override { folder } | Self::Heuristic { folder, .. } => folder,
        }
    }
}

/// Matching inputs that stay fixed for a whole run.
pub struct FolderMatcher<'a> {
    stop_words: BTreeSet<String>,
    matching: &'a Matching,
    overrides: &'a BTreeMap<String, String>,
}

impl<'a> FolderMatcher<'a> {
    pub fn new(
        stop_words: BTreeSet<String>,
        matching: &'a Matching,
        overrides: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            stop_words,
            matching,
            overrides,
        }
    }

    /// Choose a folder for the page file `page_file` (e.g. `mugs.html`).
    ///
    /// An override wins unconditionally. Otherwise the highest-scoring
    /// candidate wins, earlier candidates winning ties, and is accepted only
    /// at or above the threshold.
    pub fn best_match<'c, I>(&self, page_file: &str, candidates: I) -> Option<Match>
    where
        I: IntoIterator<Item = &'c str>,
    {
        if let Some(folder) = self.overrides.get(page_file) {
            debug!(page = page_file, folder = %folder, "override");
            return Some(Match::Override {
                folder: folder.clone(),
            });
        }

        let (folder, score) = self.best_candidate(page_file, candidates)?;
        if score.total >= self.matching.threshold {
            debug!(page = page_file, folder, score = score.total, "matched");
            Some(Match::Heuristic {
                folder: folder.to_string(),
                score,
            })
        } else {
            debug!(
                page = page_file,
                folder,
                score = score.total,
                threshold = self.matching.threshold,
                "best candidate below threshold"
            );
            None
        }
    }

    /// Highest-scoring candidate regardless of threshold.
    pub fn best_candidate<'c, I>(&self, page_file: &str, candidates: I) -> Option<(&'c str, Score)>
    where
        I: IntoIterator<Item = &'c str>,
    {
        let page = Key::new(page_file, &self.stop_words);
        let mut best: Option<(&'c str, Score)> = None;
        for folder in candidates {
            let score = score_keys(&page, &Key::new(folder, &self.stop_words), self.matching);
            if best.map_or(true, |(_, b)| score.total > b.total) {
                best = Some((folder, score));
            }
        }
        best
    }

    /// Every candidate with its score, best first. The sort is stable, so
    /// equal scores keep candidate order.
    pub fn rank<'c, I>(&self, page_file: &str, candidates: I) -> Vec<(&'c str, Score)>
    where
        I: IntoIterator<Item = &'c str>,
    {
        let page = Key::new(page_file, &self.stop_words);
        let mut ranked: Vec<(&'c str, Score)> = candidates
            .into_iter()
            .map(|folder| {
                let score = score_keys(&page, &Key::new(folder, &self.stop_words), self.matching);
                (folder, score)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total.total_cmp(&a.1.total));
        ranked
    }
}

/// Leading images to use from a folder: the first bucket the folder fills,
/// otherwise everything (or nothing when `take_remainder` is off).
pub fn pick_images<'i>(images: &'i [String], buckets: &[usize], take_remainder: bool) -> &'i [String] {
    let n = images.len();
    match buckets.iter().find(|&&b| n >= b) {
        Some(&b) => &images[..b],
        None if take_remainder => images,
        None => &[],
    }
}
