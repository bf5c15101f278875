// src/ingest/providers/pdf.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::ingest::fetch::Fetch;
use crate::ingest::types::{DiscoveredItem, Source, SourceAdapter, SourceKind};
use crate::ingest::{normalize_text, truncate_chars};

pub const PDF_TEXT_MAX_CHARS: usize = 12_000;
const PDF_SNIPPET_CHARS: usize = 300;

/// One item per PDF source. Unreadable documents still produce an item, with empty text.
pub struct PdfAdapter {
    fetch: Arc<dyn Fetch>,
}

impl PdfAdapter {
    pub fn new(fetch: Arc<dyn Fetch>) -> Self {
        Self { fetch }
    }

    /// Text extraction is CPU-bound, so it runs on the blocking pool.
    /// Errors and panics inside the extractor both degrade to an empty string.
    pub async fn extract_text(bytes: Vec<u8>) -> String {
        let joined =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;
        match joined {
            Ok(Ok(text)) => normalize_text(&text),
            Ok(Err(e)) => {
                tracing::warn!(target: "ingest", error = %e, "pdf text extraction failed");
                String::new()
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "pdf extractor panicked");
                String::new()
            }
        }
    }

    pub fn item_from_text(source: &Source, text: &str) -> DiscoveredItem {
        let title = if source.name.is_empty() {
            file_name(&source.url)
        } else {
            source.name.clone()
        };
        let snippet = truncate_chars(text, PDF_SNIPPET_CHARS);
        let mut item = DiscoveredItem::from_source(source, title, source.url.clone(), snippet);
        item.pdf_text = Some(truncate_chars(text, PDF_TEXT_MAX_CHARS));
        item
    }
}

#[async_trait]
impl SourceAdapter for PdfAdapter {
    async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredItem>> {
        let bytes = self.fetch.bytes(&source.url).await.context("fetching pdf")?;
        let text = Self::extract_text(bytes).await;
        Ok(vec![Self::item_from_text(source, &text)])
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Pdf
    }
}

fn file_name(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}
