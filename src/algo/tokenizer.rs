use std::collections::BTreeSet;

/// Drop a trailing `.html` (case-insensitive) from a page or folder name.
///
/// Only the page extension is stripped: folder names such as `i.d-card`
/// carry dots that are part of the name.
pub fn strip_html(name: &str) -> &str {
    let len = name.len();
    if len >= 5 && name.is_char_boundary(len - 5) && name[len - 5..].eq_ignore_ascii_case(".html")
    {
        &name[..len - 5]
    } else {
        name
    }
}

/// Lowercase words of `name`, split on every run of non-alphanumeric ASCII.
fn words(name: &str) -> impl Iterator<Item = String> + '_ {
    strip_html(name)
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
}

/// Normalized token set of a page or folder name, minus `stop_words`.
pub fn tokens(name: &str, stop_words: &BTreeSet<String>) -> BTreeSet<String> {
    words(name).filter(|w| !stop_words.contains(w)).collect()
}

/// Hyphenated slug: lowercase, alphanumeric runs joined by single hyphens.
pub fn slug(name: &str) -> String {
    words(name).collect::<Vec<_>>().join("-")
}
