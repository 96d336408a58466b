//! Tag name normalization
//!
//! User-typed tag names are trimmed and each interior whitespace run becomes a
//! single underscore, so `" blue  sky "` is stored as `blue_sky`. Case is kept.

use std::collections::HashSet;

/// Normalize a single tag name. Returns `None` when nothing is left.
pub fn normalize_tag_name(raw: &str) -> Option<String> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join("_");
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// One tag per line, as accepted by batch tag creation. Blank lines are
/// skipped and repeats collapse to their first occurrence.
pub fn parse_tag_lines(input: &str) -> Vec<String> {
    dedup(input.lines().filter_map(normalize_tag_name))
}

/// Comma-separated tags, as accepted when attaching tags to an item.
pub fn parse_tag_list(input: &str) -> Vec<String> {
    dedup(input.split(',').filter_map(normalize_tag_name))
}

fn dedup(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names.filter(|name| seen.insert(name.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace_runs() {
        assert_eq!(normalize_tag_name("  blue  sky\t"), Some("blue_sky".to_string()));
        assert_eq!(normalize_tag_name("Cat"), Some("Cat".to_string()));
        assert_eq!(normalize_tag_name(" \n "), None);
    }

    #[test]
    fn test_parse_tag_lines() {
        let tags = parse_tag_lines("sunset\n\n  night sky \nsunset\r\nbeach");
        assert_eq!(tags, vec!["sunset", "night_sky", "beach"]);
    }

    #[test]
    fn test_parse_tag_list() {
        let tags = parse_tag_list("cat, black cat,,cat ,Cat");
        assert_eq!(tags, vec!["cat", "black_cat", "Cat"]);
    }
}
