// src/config/app.rs
use std::path::PathBuf;
use std::time::Duration;

use super::{env_opt, env_parse};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_MAX_ITEMS_PER_SOURCE: usize = 50;
pub const DEFAULT_MAX_UNIQUE_ITEMS: usize = 200;

/// Everything the binary needs to boot, resolved once from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Explicit sources catalog path; `None` means "use the config/ fallbacks".
    pub sources_path: Option<PathBuf>,
    /// Shared secret for `/check-jobs`. `None` disables the check.
    pub middleware_secret: Option<String>,
    pub cron_schedule: Option<String>,
    pub concurrency: usize,
    pub http_timeout: Duration,
    pub max_items_per_source: usize,
    pub max_unique_items: usize,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            sources_path: None,
            middleware_secret: None,
            cron_schedule: None,
            concurrency: DEFAULT_CONCURRENCY,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_items_per_source: DEFAULT_MAX_ITEMS_PER_SOURCE,
            max_unique_items: DEFAULT_MAX_UNIQUE_ITEMS,
            log_json: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            sources_path: env_opt("SOURCES_PATH").map(PathBuf::from),
            middleware_secret: env_opt("MIDDLEWARE_SECRET"),
            cron_schedule: env_opt("CRON_SCHEDULE"),
            concurrency: env_parse("CONCURRENCY", DEFAULT_CONCURRENCY).max(1),
            http_timeout: Duration::from_secs(
                env_parse("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS).max(1),
            ),
            max_items_per_source: env_parse("MAX_ITEMS_PER_SOURCE", DEFAULT_MAX_ITEMS_PER_SOURCE)
                .max(1),
            max_unique_items: env_parse("MAX_UNIQUE_ITEMS", DEFAULT_MAX_UNIQUE_ITEMS).max(1),
            log_json: env_opt("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        }
    }
}
