//! Job feed bridge — binary entrypoint.
//! Boots tracing, metrics, the pipeline, the optional cron trigger and the Axum server.

use std::net::SocketAddr;
use std::sync::Arc;

use job_feed_bridge::config::{AiConfig, AppConfig};
use job_feed_bridge::ingest::scheduler::start_scheduler;
use job_feed_bridge::metrics::Metrics;
use job_feed_bridge::{api, Pipeline};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_feed_bridge=info,tower_http=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let app_cfg = AppConfig::from_env();
    init_tracing(app_cfg.log_json);

    let ai_cfg = AiConfig::load()?;
    // Safe diagnostics: never the key itself.
    tracing::info!(
        model = %ai_cfg.model,
        endpoint = %ai_cfg.completions_url(),
        key_len = ai_cfg.api_key.len(),
        "language model configured"
    );
    if !ai_cfg.has_credential() {
        tracing::warn!("OPENAI_API_KEY not set; discovered items will not be formatted");
    }

    let metrics = Metrics::init()?;
    let pipeline = Arc::new(Pipeline::from_config(&app_cfg, &ai_cfg)?);

    // Keep the scheduler handle alive for the lifetime of the server.
    let _scheduler = match app_cfg.cron_schedule.as_deref() {
        Some(expr) => match start_scheduler(pipeline.clone(), expr).await {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::error!(error = %e, schedule = expr, "cron trigger not started");
                None
            }
        },
        None => None,
    };

    let state = api::AppState::new(pipeline, app_cfg.middleware_secret.clone());
    let app = api::router(state).merge(metrics.router());

    let addr = SocketAddr::from(([0, 0, 0, 0], app_cfg.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, auth = app_cfg.middleware_secret.is_some(), "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
