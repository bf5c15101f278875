// src/ingest/providers/page.rs
//! HTML link scraping for `page` and `news` sources.
//!
//! Explicit selectors are applied as-is. Without selectors (or for `news`
//! sources) a heuristic runs instead: anchors inside likely article
//! containers, falling back to every anchor, kept only when the link text or
//! URL mentions a job-related keyword.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

use crate::ingest::fetch::Fetch;
use crate::ingest::normalize_text;
use crate::ingest::types::{DiscoveredItem, Source, SourceAdapter, SourceKind};

const CONTAINER_SELECTORS: &str = "article a[href], main a[href], .content a[href], \
     .news a[href], .notice a[href], .notification a[href], .latest a[href], \
     .jobs a[href], #content a[href], table a[href]";

/// Lowercase needles matched against link text and URL.
pub const JOB_KEYWORDS: &[&str] = &[
    "job",
    "vacanc",
    "recruit",
    "notification",
    "career",
    "hiring",
    "apply",
    "walk-in",
    "walkin",
    "admit card",
    "bharti",
    "naukri",
    "भर्ती",
    "नौकरी",
    "रिक्ति",
    "अधिसूचना",
];

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("anchor selector"));
static CONTAINERS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(CONTAINER_SELECTORS).expect("container selectors"));

pub fn is_job_related(text: &str, url: &str) -> bool {
    let text = text.to_lowercase();
    let url = url.to_lowercase();
    JOB_KEYWORDS
        .iter()
        .any(|k| text.contains(k) || url.contains(k))
}

pub struct PageAdapter {
    fetch: Arc<dyn Fetch>,
    max_items: usize,
}

impl PageAdapter {
    pub fn new(fetch: Arc<dyn Fetch>, max_items: usize) -> Self {
        Self { fetch, max_items }
    }

    /// Extract links from an HTML document fetched from `source.url`.
    pub fn extract_links(
        html: &str,
        source: &Source,
        max_items: usize,
    ) -> Result<Vec<DiscoveredItem>> {
        let t0 = std::time::Instant::now();
        let base = Url::parse(&source.url)
            .with_context(|| format!("invalid page url {}", source.url))?;
        let document = Html::parse_document(html);

        let explicit = source.css_selectors();
        let heuristic = explicit.is_empty() || source.kind == SourceKind::News;

        let mut candidates: Vec<ElementRef<'_>> = Vec::new();
        if explicit.is_empty() {
            candidates.extend(document.select(&CONTAINERS));
            if candidates.is_empty() {
                candidates.extend(document.select(&ANCHOR));
            }
        } else {
            for raw in explicit {
                match Selector::parse(raw) {
                    Ok(sel) => candidates.extend(document.select(&sel)),
                    Err(e) => {
                        tracing::warn!(target: "ingest", source_id = %source.id, selector = raw, error = %e, "invalid css selector skipped")
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for el in candidates {
            if out.len() >= max_items {
                break;
            }
            let Some(anchor) = as_anchor(el) else {
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = resolve_href(&base, href) else {
                continue;
            };
            let title = normalize_text(&anchor.text().collect::<String>());
            let title = if title.is_empty() {
                anchor
                    .value()
                    .attr("title")
                    .map(normalize_text)
                    .unwrap_or_default()
            } else {
                title
            };
            if title.is_empty() {
                continue;
            }
            if heuristic && !is_job_related(&title, &url) {
                continue;
            }
            if !seen.insert(url.clone()) {
                continue;
            }
            out.push(DiscoveredItem::from_source(source, title, url, String::new()));
        }

        histogram!("ingest_parse_ms", "kind" => "page").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for PageAdapter {
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredItem>> {
        let html = self.fetch.text(&source.url).await.context("fetching page")?;
        Self::extract_links(&html, source, self.max_items)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Page
    }
}

/// The element itself when it is an anchor, else its first descendant anchor.
fn as_anchor(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if el.value().name() == "a" && el.value().attr("href").is_some() {
        return Some(el);
    }
    el.select(&ANCHOR).next()
}

fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    if href.is_empty()
        || href.starts_with('#')
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
    {
        return None;
    }
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}
