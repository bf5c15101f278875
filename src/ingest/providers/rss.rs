// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::sync::Arc;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::ingest::fetch::Fetch;
use crate::ingest::types::{DiscoveredItem, Source, SourceAdapter, SourceKind};
use crate::ingest::{normalize_text, truncate_chars, SNIPPET_MAX_CHARS};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<Text>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    title: Option<Text>,
    id: Option<String>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    summary: Option<Text>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Element text that may carry attributes (`<guid isPermaLink="false">`, `<title type="html">`).
#[derive(Debug, Default, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

fn rfc2822_to_rfc3339(ts: &str) -> Option<String> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

fn rfc3339_normalized(ts: &str) -> Option<String> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

/// RSS 2.0 and Atom feeds.
pub struct RssAdapter {
    fetch: Arc<dyn Fetch>,
}

impl RssAdapter {
    pub fn new(fetch: Arc<dyn Fetch>) -> Self {
        Self { fetch }
    }

    /// Parse a feed document into items attributed to `source`.
    pub fn parse_feed(body: &str, source: &Source) -> Result<Vec<DiscoveredItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(body);
        let out = if looks_like_atom(&xml_clean) {
            parse_atom(&xml_clean, source)?
        } else {
            parse_rss(&xml_clean, source)?
        };
        histogram!("ingest_parse_ms", "kind" => "rss").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredItem>> {
        let body = self.fetch.text(&source.url).await.context("fetching feed")?;
        Self::parse_feed(&body, source)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Rss
    }
}

fn looks_like_atom(xml: &str) -> bool {
    xml.contains("<feed") && !xml.contains("<rss")
}

fn parse_rss(xml: &str, source: &Source) -> Result<Vec<DiscoveredItem>> {
    let rss: Rss = from_str(xml).context("parsing rss xml")?;
    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let url = it
            .link
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .or_else(|| it.guid.map(|g| g.value.trim().to_string()))
            .unwrap_or_default();
        let title = normalize_text(it.title.as_deref().unwrap_or_default());
        let snippet = truncate_chars(
            &normalize_text(it.description.as_deref().unwrap_or_default()),
            SNIPPET_MAX_CHARS,
        );
        let mut item = DiscoveredItem::from_source(source, title, url, snippet);
        item.published = it.pub_date.as_deref().and_then(rfc2822_to_rfc3339);
        out.push(item);
    }
    Ok(out)
}

fn parse_atom(xml: &str, source: &Source) -> Result<Vec<DiscoveredItem>> {
    let feed: AtomFeed = from_str(xml).context("parsing atom xml")?;
    let mut out = Vec::with_capacity(feed.entry.len());
    for e in feed.entry {
        // rel="alternate" (or no rel) is the article link.
        let href = e
            .link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| e.link.first())
            .map(|l| l.href.trim().to_string())
            .filter(|h| !h.is_empty());
        let url = href
            .or_else(|| e.id.map(|id| id.trim().to_string()))
            .unwrap_or_default();
        let title = normalize_text(&e.title.unwrap_or_default().value);
        let snippet = truncate_chars(
            &normalize_text(&e.summary.unwrap_or_default().value),
            SNIPPET_MAX_CHARS,
        );
        let mut item = DiscoveredItem::from_source(source, title, url, snippet);
        item.published = e
            .published
            .or(e.updated)
            .as_deref()
            .and_then(rfc3339_normalized);
        out.push(item);
    }
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
