//! crates/forum_core/src/text.rs
//!
//! Slug derivation and `@mention` extraction.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").unwrap());

/// Category slug: lowercase name with each non-alphanumeric run collapsed to `-`.
/// Leading and trailing separators are kept.
pub fn category_slug(name: &str) -> String {
    NON_ALNUM
        .replace_all(&name.to_lowercase(), "-")
        .into_owned()
}

/// URL-safe slug with no leading or trailing separators.
pub fn slugify(text: &str) -> String {
    category_slug(text).trim_matches('-').to_string()
}

/// Topic slug: `slugify(title)` suffixed with the creation time in epoch millis.
pub fn topic_slug(title: &str, created_at: DateTime<Utc>) -> String {
    let base = slugify(title);
    let millis = created_at.timestamp_millis();
    if base.is_empty() {
        format!("topic-{}", millis)
    } else {
        format!("{}-{}", base, millis)
    }
}

/// All `@username` mentions in `content`, deduplicated, in first-seen order.
pub fn extract_mentions(content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for capture in MENTION.captures_iter(content) {
        let name = capture[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Trims, lowercases and deduplicates tags, dropping empty ones.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn category_slug_keeps_edge_separators() {
        assert_eq!(category_slug("General"), "general");
        assert_eq!(category_slug("Q & A"), "q-a");
        assert_eq!(category_slug(" Off Topic!"), "-off-topic-");
    }

    #[test]
    fn topic_slug_has_millis_suffix() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(topic_slug("Hello, World!", at), "hello-world-1700000000123");
        assert_eq!(topic_slug("???", at), "topic-1700000000123");
    }

    #[test]
    fn mentions_are_unique_and_ordered() {
        let found = extract_mentions("Hi @alice and @bob_2, cc @alice. mail a@b");
        assert_eq!(found, vec!["alice", "bob_2", "b"]);
        assert!(extract_mentions("no mentions here").is_empty());
    }

    #[test]
    fn tags_are_normalized() {
        let tags = vec![" Rust ".to_string(), "rust".into(), "".into(), "Async".into()];
        assert_eq!(normalize_tags(&tags), vec!["rust", "async"]);
    }
}
