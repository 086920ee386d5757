use std::collections::BTreeSet;

use serde::Serialize;

use super::tokenizer;
use crate::config::Matching;

/// Jaccard index of two token sets. Two empty sets score 0, not 1.
pub fn token_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    inter as f64 / union as f64
}

/// Bonus for exact or substring slug relationships. An empty slug is a
/// substring of everything, so it never earns a bonus.
pub fn slug_bonus(page_slug: &str, folder_slug: &str, matching: &Matching) -> f64 {
    if page_slug.is_empty() || folder_slug.is_empty() {
        0.0
    } else if page_slug == folder_slug {
        matching.exact_slug_bonus
    } else if page_slug.contains(folder_slug) || folder_slug.contains(page_slug) {
        matching.partial_slug_bonus
    } else {
        0.0
    }
}

/// Pre-normalized side of a comparison, so one page can be scored against
/// many folders without re-tokenizing it.
#[derive(Debug, Clone)]
pub struct Key {
    pub tokens: BTreeSet<String>,
    pub slug: String,
}

impl Key {
    pub fn new(name: &str, stop_words: &BTreeSet<String>) -> Self {
        Self {
            tokens: tokenizer::tokens(name, stop_words),
            slug: tokenizer::slug(name),
        }
    }
}

/// Components of one page/folder score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Score {
    pub token_similarity: f64,
    pub slug_bonus: f64,
    pub total: f64,
}

/// `token_similarity + slug_bonus`. Unbounded above; only the ranking matters.
pub fn score_keys(page: &Key, folder: &Key, matching: &Matching) -> Score {
    let token_similarity = token_similarity(&page.tokens, &folder.tokens);
    let slug_bonus = slug_bonus(&page.slug, &folder.slug, matching);
    Score {
        token_similarity,
        slug_bonus,
        total: token_similarity + slug_bonus,
    }
}

pub fn score(page: &str, folder: &str, stop_words: &BTreeSet<String>, matching: &Matching) -> Score {
    score_keys(&Key::new(page, stop_words), &Key::new(folder, stop_words), matching)
}
