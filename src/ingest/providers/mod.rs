// src/ingest/providers/mod.rs
pub mod api;
pub mod page;
pub mod pdf;
pub mod rss;

use anyhow::Result;
use std::sync::Arc;

use crate::ingest::fetch::Fetch;
use crate::ingest::types::{DiscoveredItem, Source, SourceAdapter, SourceKind};

pub use api::ApiAdapter;
pub use page::PageAdapter;
pub use pdf::PdfAdapter;
pub use rss::RssAdapter;

/// All adapters behind one shared fetcher, dispatched by [`SourceKind`].
pub struct Adapters {
    rss: RssAdapter,
    page: PageAdapter,
    pdf: PdfAdapter,
    api: ApiAdapter,
}

impl Adapters {
    pub fn new(fetch: Arc<dyn Fetch>, max_items_per_source: usize) -> Self {
        Self {
            rss: RssAdapter::new(fetch.clone()),
            page: PageAdapter::new(fetch.clone(), max_items_per_source),
            pdf: PdfAdapter::new(fetch.clone()),
            api: ApiAdapter::new(fetch),
        }
    }

    fn adapter_for(&self, kind: SourceKind) -> Option<&dyn SourceAdapter> {
        match kind {
            SourceKind::Rss => Some(&self.rss),
            SourceKind::Page | SourceKind::News => Some(&self.page),
            SourceKind::Pdf => Some(&self.pdf),
            SourceKind::Api => Some(&self.api),
            SourceKind::Unsupported => None,
        }
    }

    /// Unsupported kinds yield nothing; adapter errors propagate to the caller.
    pub async fn discover(&self, source: &Source) -> Result<Vec<DiscoveredItem>> {
        match self.adapter_for(source.kind) {
            Some(adapter) => adapter.discover(source).await,
            None => {
                tracing::debug!(target: "ingest", source_id = %source.id, "unsupported source type, skipped");
                Ok(Vec::new())
            }
        }
    }
}
