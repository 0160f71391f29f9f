//! Text normalization for series names and free-text fields.

/// Trim and collapse internal whitespace. Returns `None` for blank input.
pub fn clean_text(raw: &str) -> Option<String> {
    let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Case- and punctuation-insensitive key a series id is derived from.
///
/// `"X-Men"`, `"X Men"` and `"x_men"` all map to `"x men"`.
pub fn series_key(name: &str) -> String {
    let lowered = name.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        lowered.trim().to_string()
    } else {
        words.join(" ")
    }
}

const ARTICLES: &[&str] = &["the", "a", "an"];

/// Sort name with a leading English article dropped, or `None` when the
/// name has no article.
pub fn sort_name(name: &str) -> Option<String> {
    let (first, rest) = name.split_once(' ')?;
    let rest = rest.trim_start();
    if rest.is_empty() || !ARTICLES.iter().any(|a| first.eq_ignore_ascii_case(a)) {
        return None;
    }
    Some(rest.to_string())
}
