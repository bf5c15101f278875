// src/ingest/mod.rs
pub mod config;
pub mod fetch;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::types::DiscoveredItem;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::HashSet;

/// Title prefix length used as the fallback uniqueness key.
pub const TITLE_KEY_CHARS: usize = 80;
pub const SNIPPET_MAX_CHARS: usize = 500;

/// Normalize text: decode entities, strip tags, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize typographic quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (NBSP included)
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").expect("ws regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Keep at most `max` chars (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Trimmed URL, else the first [`TITLE_KEY_CHARS`] chars of the trimmed title.
/// Empty when both are blank.
pub fn uniqueness_key(url: &str, title: &str) -> String {
    let url = url.trim();
    if !url.is_empty() {
        return url.to_string();
    }
    truncate_chars(title.trim(), TITLE_KEY_CHARS)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DedupOutcome {
    pub kept: Vec<DiscoveredItem>,
    pub duplicates: usize,
    pub empty_keys: usize,
    pub truncated: usize,
}

/// At most one item per uniqueness key, first occurrence wins, capped at `max`.
pub fn dedupe(items: Vec<DiscoveredItem>, max: usize) -> DedupOutcome {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut out = DedupOutcome::default();

    for item in items {
        let key = item.uniqueness_key();
        if key.is_empty() {
            out.empty_keys += 1;
            continue;
        }
        if !seen.insert(key) {
            out.duplicates += 1;
            continue;
        }
        out.kept.push(item);
    }

    if out.kept.len() > max {
        out.truncated = out.kept.len() - max;
        out.kept.truncate(max);
    }
    out
}
