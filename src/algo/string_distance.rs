use strsim::{jaro_winkler, normalized_levenshtein};

use super::tokenizer::slug;

/// Edit-distance metrics used for "did you mean" suggestions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Levenshtein,
    JaroWinkler,
}

/// Compute string similarity (0.0 = no match, 1.0 = identical) using the specified metric.
pub fn similarity(a: &str, b: &str, metric: Metric) -> f64 {
    match metric {
        Metric::Levenshtein => normalized_levenshtein(a, b),
        Metric::JaroWinkler => jaro_winkler(a, b),
    }
}

/// Candidate whose slug is closest to `name`'s slug. Ties keep the first
/// candidate; an empty candidate list gives `None`.
pub fn closest<'a, I>(name: &str, candidates: I, metric: Metric) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let target = slug(name);
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let sim = similarity(&target, &slug(candidate), metric);
        if best.map_or(true, |(_, b)| sim > b) {
            best = Some((candidate, sim));
        }
    }
    best
}

impl Metric {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "levenshtein" | "lev" => Some(Self::Levenshtein),
            "jaro-winkler" | "jaro_winkler" | "jw" => Some(Self::JaroWinkler),
            _ => None,
        }
    }

    pub fn all_names() -> &'static [&'static str] {
        &["levenshtein", "jaro-winkler"]
    }
}
