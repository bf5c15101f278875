// src/pipeline.rs
//! Pipeline orchestrator: discover -> dedupe/filter -> format.
//!
//! Both fan-outs share one semaphore, also shared by every run of the same
//! [`Pipeline`]. Results are gathered with `join_all`, so discovered items keep
//! catalog order (then in-source order) no matter which source finished first.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::config::{AiConfig, AppConfig};
use crate::format::ai_adapter::build_chat_client;
use crate::format::{FormatError, FormattedPost, Formatter};
use crate::ingest::config::load_sources_or_empty;
use crate::ingest::dedupe;
use crate::ingest::fetch::HttpFetcher;
use crate::ingest::providers::Adapters;
use crate::ingest::types::{DiscoveredItem, Source};
use crate::store::RunStore;

/// Where the source list comes from; consulted once at the start of every run.
pub trait SourceCatalog: Send + Sync {
    fn load(&self) -> Vec<Source>;
}

/// Sources file on disk (JSON or TOML). Missing/broken files give an empty list.
pub struct FileCatalog {
    path: Option<PathBuf>,
}

impl FileCatalog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl SourceCatalog for FileCatalog {
    fn load(&self) -> Vec<Source> {
        load_sources_or_empty(self.path.as_deref())
    }
}

impl SourceCatalog for Vec<Source> {
    fn load(&self) -> Vec<Source> {
        self.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Http,
    Schedule,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Http => "http",
            Trigger::Schedule => "schedule",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("concurrency limiter closed")]
    LimiterClosed,
    #[error("pipeline run aborted: {0}")]
    Aborted(String),
}

/// What one source contributed to a run.
#[derive(Debug)]
pub enum SourceOutcome {
    Discovered(Vec<DiscoveredItem>),
    Failed(String),
}

/// What happened to one deduplicated item in the format phase.
#[derive(Debug)]
pub enum ItemOutcome {
    Formatted(FormattedPost),
    /// Another run is formatting the same key right now.
    InFlight,
    Failed(FormatError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    pub status: SourceStatus,
    pub items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: u64,
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceSummary>,
    pub discovered: usize,
    pub unique: usize,
    pub duplicates: usize,
    pub empty_keys: usize,
    pub truncated: usize,
    pub already_processed: usize,
    pub formatted: usize,
    /// Items not sent to the model: missing credential or reserved by another run.
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub jobs: Vec<FormattedPost>,
}

/// Per-run accumulator; never shared between runs.
struct RunContext {
    summary: RunSummary,
    jobs: Vec<FormattedPost>,
    clock: Instant,
}

impl RunContext {
    fn new(run_id: u64, trigger: Trigger) -> Self {
        let now = Utc::now();
        Self {
            summary: RunSummary {
                run_id,
                trigger,
                started_at: now,
                finished_at: now,
                sources: Vec::new(),
                discovered: 0,
                unique: 0,
                duplicates: 0,
                empty_keys: 0,
                truncated: 0,
                already_processed: 0,
                formatted: 0,
                skipped: 0,
                failures: Vec::new(),
            },
            jobs: Vec::new(),
            clock: Instant::now(),
        }
    }
}

pub struct Pipeline {
    catalog: Arc<dyn SourceCatalog>,
    adapters: Adapters,
    formatter: Formatter,
    store: Arc<RunStore>,
    limiter: Arc<Semaphore>,
    max_unique_items: usize,
}

impl Pipeline {
    pub fn new(
        catalog: Arc<dyn SourceCatalog>,
        adapters: Adapters,
        formatter: Formatter,
        store: Arc<RunStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            catalog,
            adapters,
            formatter,
            store,
            limiter: Arc::new(Semaphore::new(concurrency.max(1))),
            max_unique_items: crate::config::app::DEFAULT_MAX_UNIQUE_ITEMS,
        }
    }

    pub fn with_max_unique_items(mut self, max: usize) -> Self {
        self.max_unique_items = max.max(1);
        self
    }

    /// Production wiring: file catalog, reqwest fetcher, OpenAI-compatible client.
    pub fn from_config(app: &AppConfig, ai: &AiConfig) -> anyhow::Result<Self> {
        let fetch = Arc::new(HttpFetcher::new(app.http_timeout)?);
        let adapters = Adapters::new(fetch, app.max_items_per_source);
        let formatter = Formatter::new(build_chat_client(ai)?, ai.max_tokens);
        let catalog = Arc::new(FileCatalog::new(app.sources_path.clone()));
        Ok(Self::new(
            catalog,
            adapters,
            formatter,
            Arc::new(RunStore::new()),
            app.concurrency,
        )
        .with_max_unique_items(app.max_unique_items))
    }

    pub fn store(&self) -> &Arc<RunStore> {
        &self.store
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub async fn run(&self, trigger: Trigger) -> Result<RunReport, PipelineError> {
        let mut ctx = RunContext::new(self.store.next_run_id(), trigger);
        counter!("pipeline_runs_total", "trigger" => trigger.as_str()).increment(1);
        tracing::info!(target: "pipeline", run_id = ctx.summary.run_id, trigger = trigger.as_str(), "run started");

        // Phase 1: discover
        let sources = self.catalog.load();
        let discovered = self.discover(&sources, &mut ctx).await?;
        ctx.summary.discovered = discovered.len();
        if discovered.is_empty() {
            return Ok(self.finish(ctx));
        }

        // Phase 2: dedupe + drop already processed keys
        let deduped = dedupe(discovered, self.max_unique_items);
        ctx.summary.duplicates = deduped.duplicates;
        ctx.summary.empty_keys = deduped.empty_keys;
        ctx.summary.truncated = deduped.truncated;
        ctx.summary.unique = deduped.kept.len();
        counter!("dedup_duplicates_total").increment(deduped.duplicates as u64);

        let registry = &self.store.registry;
        let pending: Vec<DiscoveredItem> = deduped
            .kept
            .into_iter()
            .filter(|item| !registry.contains(&item.uniqueness_key()))
            .collect();
        ctx.summary.already_processed = ctx.summary.unique - pending.len();

        // Phase 3: format
        if !pending.is_empty() && !self.formatter.is_enabled() {
            tracing::warn!(target: "pipeline", items = pending.len(), "no language-model credential; items will be skipped");
        }
        self.format_all(pending, &mut ctx).await?;

        Ok(self.finish(ctx))
    }

    async fn discover(
        &self,
        sources: &[Source],
        ctx: &mut RunContext,
    ) -> Result<Vec<DiscoveredItem>, PipelineError> {
        let tasks = sources.iter().map(|source| async move {
            let _permit = self
                .limiter
                .acquire()
                .await
                .map_err(|_| PipelineError::LimiterClosed)?;
            Ok::<_, PipelineError>(self.discover_source(source).await)
        });
        let outcomes = join_all(tasks).await;

        let mut all = Vec::new();
        for (source, outcome) in sources.iter().zip(outcomes) {
            let (status, items, error) = match outcome? {
                SourceOutcome::Discovered(mut items) => {
                    let n = items.len();
                    all.append(&mut items);
                    (SourceStatus::Ok, n, None)
                }
                SourceOutcome::Failed(e) => (SourceStatus::Failed, 0, Some(e)),
            };
            ctx.summary.sources.push(SourceSummary {
                id: source.id.clone(),
                name: source.display_name().to_string(),
                kind: source.kind.as_str(),
                status,
                items,
                error,
            });
        }
        Ok(all)
    }

    /// Never fails: adapter errors are logged here and become [`SourceOutcome::Failed`].
    async fn discover_source(&self, source: &Source) -> SourceOutcome {
        match self.adapters.discover(source).await {
            Ok(items) => {
                counter!("ingest_items_total", "kind" => source.kind.as_str())
                    .increment(items.len() as u64);
                tracing::info!(target: "ingest", source_id = %source.id, kind = source.kind.as_str(), items = items.len(), "source discovered");
                SourceOutcome::Discovered(items)
            }
            Err(e) => {
                counter!("ingest_source_errors_total", "kind" => source.kind.as_str()).increment(1);
                tracing::warn!(target: "ingest", source_id = %source.id, url = %source.url, error = ?e, "source failed; contributing zero items");
                SourceOutcome::Failed(format!("{e:#}"))
            }
        }
    }

    async fn format_all(
        &self,
        pending: Vec<DiscoveredItem>,
        ctx: &mut RunContext,
    ) -> Result<(), PipelineError> {
        let tasks = pending.iter().map(|item| async move {
            let key = item.uniqueness_key();
            let _permit = self
                .limiter
                .acquire()
                .await
                .map_err(|_| PipelineError::LimiterClosed)?;
            Ok::<_, PipelineError>((key.clone(), self.format_item(&key, item).await))
        });

        for outcome in join_all(tasks).await {
            let (key, outcome) = outcome?;
            match outcome {
                ItemOutcome::Formatted(post) => {
                    counter!("format_success_total").increment(1);
                    ctx.summary.formatted += 1;
                    ctx.jobs.push(post);
                }
                ItemOutcome::InFlight => ctx.summary.skipped += 1,
                ItemOutcome::Failed(FormatError::MissingCredential) => ctx.summary.skipped += 1,
                ItemOutcome::Failed(e) => {
                    counter!("format_failures_total", "reason" => e.reason()).increment(1);
                    ctx.summary.failures.push(ItemFailure {
                        key,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    async fn format_item(&self, key: &str, item: &DiscoveredItem) -> ItemOutcome {
        let registry = &self.store.registry;
        if !registry.try_reserve(key) {
            tracing::debug!(target: "pipeline", %key, "key reserved or processed by another run");
            return ItemOutcome::InFlight;
        }
        match self.formatter.format(item).await {
            Ok(post) => {
                registry.commit(key);
                ItemOutcome::Formatted(post)
            }
            Err(e) => {
                registry.release(key);
                ItemOutcome::Failed(e)
            }
        }
    }

    fn finish(&self, mut ctx: RunContext) -> RunReport {
        let finished_at = Utc::now();
        ctx.summary.finished_at = finished_at;
        let run_id = ctx.summary.run_id;

        if !self
            .store
            .last_run
            .publish(run_id, finished_at, ctx.jobs.clone())
        {
            tracing::info!(target: "pipeline", run_id, "newer run already cached; result not cached");
        }

        histogram!("pipeline_run_ms").record(ctx.clock.elapsed().as_secs_f64() * 1_000.0);
        gauge!("pipeline_last_run_ts").set(finished_at.timestamp() as f64);
        tracing::info!(
            target: "pipeline",
            run_id,
            discovered = ctx.summary.discovered,
            unique = ctx.summary.unique,
            already_processed = ctx.summary.already_processed,
            formatted = ctx.summary.formatted,
            failed = ctx.summary.failures.len(),
            skipped = ctx.summary.skipped,
            "run finished"
        );

        RunReport {
            summary: ctx.summary,
            jobs: ctx.jobs,
        }
    }
}
