//! Process configuration: HTTP/pipeline knobs and language-model settings.

pub mod ai;
pub mod app;

pub use ai::AiConfig;
pub use app::AppConfig;

use std::str::FromStr;

/// Read a numeric env var, falling back to `default` when unset or invalid.
pub(crate) fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(var = name, value = %raw, %default, "invalid value, using default");
                default
            }
        },
        _ => default,
    }
}

/// Read an optional string env var; empty values count as unset.
pub(crate) fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
