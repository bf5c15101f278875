// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod format;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::format::{FormattedPost, Formatter};
pub use crate::ingest::types::{DiscoveredItem, Source, SourceKind};
pub use crate::pipeline::{Pipeline, RunReport, Trigger};
