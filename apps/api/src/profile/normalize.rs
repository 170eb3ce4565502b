use std::collections::BTreeMap;

/// Splits a free-text, comma-delimited skills string into an ordered list
/// of trimmed tokens. Empty tokens are dropped; order is preserved.
pub fn parse_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonicalizes a user-supplied URL to an absolute form: trims whitespace,
/// strips a trailing slash and prepends `https://` when no scheme is given.
/// Returns `None` for blank input.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    Some(with_scheme.trim_end_matches('/').to_string())
}

/// Normalizes every URL in a platform -> URL mapping, dropping entries
/// whose value is blank.
pub fn normalize_social(links: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    links
        .iter()
        .filter_map(|(platform, url)| {
            normalize_url(url).map(|normalized| (platform.clone(), normalized))
        })
        .collect()
}
