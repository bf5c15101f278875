// src/ingest/providers/api.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::ingest::fetch::Fetch;
use crate::ingest::types::{DiscoveredItem, Source, SourceAdapter, SourceKind};
use crate::ingest::{normalize_text, truncate_chars, SNIPPET_MAX_CHARS};

/// JSON endpoints returning either `[...]` or `{"items": [...]}`.
pub struct ApiAdapter {
    fetch: Arc<dyn Fetch>,
}

impl ApiAdapter {
    pub fn new(fetch: Arc<dyn Fetch>) -> Self {
        Self { fetch }
    }

    pub fn parse_records(body: &str, source: &Source) -> Result<Vec<DiscoveredItem>> {
        let root: Value = serde_json::from_str(body).context("parsing api json")?;
        let records = match root {
            Value::Array(v) => v,
            Value::Object(mut map) => match map.remove("items") {
                Some(Value::Array(v)) => v,
                _ => return Err(anyhow!("api json has no `items` array")),
            },
            _ => return Err(anyhow!("api json is neither an array nor an object")),
        };

        let out = records
            .iter()
            .filter_map(Value::as_object)
            .map(|rec| {
                let title = normalize_text(first_str(rec, &["title", "name"]));
                let url = first_str(rec, &["url", "link"]).trim().to_string();
                let snippet = truncate_chars(
                    &normalize_text(first_str(rec, &["description", "summary", "snippet"])),
                    SNIPPET_MAX_CHARS,
                );
                DiscoveredItem::from_source(source, title, url, snippet)
            })
            .collect();
        Ok(out)
    }
}

fn first_str<'a>(rec: &'a serde_json::Map<String, Value>, keys: &[&str]) -> &'a str {
    keys.iter()
        .filter_map(|k| rec.get(*k).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default()
}

#[async_trait]
impl SourceAdapter for ApiAdapter {
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredItem>> {
        let body = self.fetch.text(&source.url).await.context("fetching api")?;
        Self::parse_records(&body, source)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> Source {
        Source::new("api", "Jobs API", SourceKind::Api, "https://api.test/jobs")
    }

    #[test]
    fn top_level_array_with_field_fallbacks() {
        let body = r#"[
            {"title":"Clerk","url":"https://api.test/1","description":"<b>10</b> posts"},
            {"name":"Driver","link":"https://api.test/2"},
            "not a record"
        ]"#;
        let items = ApiAdapter::parse_records(body, &src()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].snippet, "10 posts");
        assert_eq!(items[1].title, "Driver");
        assert_eq!(items[1].url, "https://api.test/2");
    }

    #[test]
    fn items_wrapper_is_accepted() {
        let body = r#"{"items":[{"title":"Nurse","url":"https://api.test/3"}],"total":1}"#;
        let items = ApiAdapter::parse_records(body, &src()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_id, "api");
    }

    #[test]
    fn unexpected_shapes_are_errors() {
        assert!(ApiAdapter::parse_records(r#"{"data":[]}"#, &src()).is_err());
        assert!(ApiAdapter::parse_records("42", &src()).is_err());
        assert!(ApiAdapter::parse_records("{", &src()).is_err());
    }
}
