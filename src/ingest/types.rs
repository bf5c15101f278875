// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Kind of origin a [`Source`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[serde(alias = "feed", alias = "atom")]
    Rss,
    #[serde(alias = "html")]
    Page,
    News,
    Pdf,
    #[serde(alias = "json")]
    Api,
    /// Anything else in the catalog; yields no items.
    #[serde(other)]
    Unsupported,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Rss => "rss",
            SourceKind::Page => "page",
            SourceKind::News => "news",
            SourceKind::Pdf => "pdf",
            SourceKind::Api => "api",
            SourceKind::Unsupported => "unsupported",
        }
    }
}

/// One configured origin, as read from the sources catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<String>,
}

impl Source {
    pub fn new(id: &str, name: &str, kind: SourceKind, url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            url: url.to_string(),
            selector: None,
            selectors: Vec::new(),
        }
    }

    /// `selectors` followed by `selector`, blanks removed.
    pub fn css_selectors(&self) -> Vec<&str> {
        self.selectors
            .iter()
            .map(String::as_str)
            .chain(self.selector.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Name used for display and the model prompt; falls back to id, then url.
    pub fn display_name(&self) -> &str {
        [&self.name, &self.id, &self.url]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }
}

/// A candidate posting extracted from a source, held only for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_text: Option<String>,
    /// RFC 3339, when the source carried a parseable date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    pub source_name: String,
    pub source_id: String,
    /// URL of the source this item was discovered on.
    pub discovered_from: String,
}

impl DiscoveredItem {
    pub fn from_source(source: &Source, title: String, url: String, snippet: String) -> Self {
        Self {
            title,
            url,
            snippet,
            pdf_text: None,
            published: None,
            source_name: source.display_name().to_string(),
            source_id: source.id.clone(),
            discovered_from: source.url.clone(),
        }
    }

    /// Deduplication key: trimmed URL, else the first 80 chars of the title.
    pub fn uniqueness_key(&self) -> String {
        super::uniqueness_key(&self.url, &self.title)
    }
}

/// Per-kind extraction logic. Errors are caught by the caller and turned
/// into an empty contribution for that source.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredItem>>;
    fn kind(&self) -> SourceKind;
}
